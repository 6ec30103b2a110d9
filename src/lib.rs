//! Incident Geocoder
//!
//! Adds latitude/longitude to incident records keyed by city and state,
//! patches the places the geocoder gets wrong, and persists the result.

pub mod config;
pub mod dataset;
pub mod location;
pub mod pipeline;
pub mod store;
