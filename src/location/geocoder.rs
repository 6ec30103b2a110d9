//! Geocoding providers: the `Geocoder` seam and its Nominatim implementation.

use super::types::{Coordinates, GeocodeError};
use serde::Deserialize;
use std::time::Duration;
use ureq::Agent;

pub const DEFAULT_NOMINATIM_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";
pub const DEFAULT_USER_AGENT: &str = "incident-geocoder/0.1";

/// Turns a free-text place query into coordinates.
///
/// `country` restricts the search to one ISO 3166-1 alpha-2 country
/// (e.g. `"us"`); `timeout` bounds a single request.
pub trait Geocoder {
    fn geocode(
        &self,
        query: &str,
        country: &str,
        timeout: Duration,
    ) -> Result<Coordinates, GeocodeError>;
}

impl<G: Geocoder + ?Sized> Geocoder for &G {
    fn geocode(
        &self,
        query: &str,
        country: &str,
        timeout: Duration,
    ) -> Result<Coordinates, GeocodeError> {
        (**self).geocode(query, country, timeout)
    }
}

// ─── Nominatim provider ─────────────────────────────────────────

#[derive(Deserialize, Debug, Clone)]
pub struct NominatimResult {
    pub lat: String,
    pub lon: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// OpenStreetMap Nominatim search API over a blocking `ureq` agent.
pub struct NominatimGeocoder {
    agent: Agent,
    endpoint: String,
    user_agent: String,
}

impl NominatimGeocoder {
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_NOMINATIM_ENDPOINT, DEFAULT_USER_AGENT)
    }

    /// Nominatim's usage policy requires an identifying User-Agent.
    pub fn with_endpoint(endpoint: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            agent: Agent::new(),
            endpoint: endpoint.into(),
            user_agent: user_agent.into(),
        }
    }
}

impl Default for NominatimGeocoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Geocoder for NominatimGeocoder {
    fn geocode(
        &self,
        query: &str,
        country: &str,
        timeout: Duration,
    ) -> Result<Coordinates, GeocodeError> {
        let response = self
            .agent
            .get(&self.endpoint)
            .set("User-Agent", &self.user_agent)
            .query("q", query)
            .query("format", "json")
            .query("limit", "1")
            .query("countrycodes", country)
            .timeout(timeout)
            .call()
            .map_err(|e| GeocodeError::Network(e.to_string()))?;

        let results: Vec<NominatimResult> = response
            .into_json()
            .map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;

        first_coordinates(query, &results)
    }
}

/// Picks the top search hit and parses its string coordinates.
pub fn first_coordinates(
    query: &str,
    results: &[NominatimResult],
) -> Result<Coordinates, GeocodeError> {
    let top = results
        .first()
        .ok_or_else(|| GeocodeError::NotFound(query.to_string()))?;

    let lat = parse_degrees(&top.lat)?;
    let lon = parse_degrees(&top.lon)?;
    log::debug!(
        "{} -> {} ({})",
        query,
        Coordinates::new(lat, lon),
        top.display_name.as_deref().unwrap_or("?")
    );
    Ok(Coordinates::new(lat, lon))
}

fn parse_degrees(raw: &str) -> Result<f64, GeocodeError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| GeocodeError::InvalidResponse(format!("bad coordinate '{}'", raw)))?;
    if !value.is_finite() {
        return Err(GeocodeError::InvalidResponse(format!("bad coordinate '{}'", raw)));
    }
    Ok(value)
}
