//! Coordinate resolver: one geocoding request per distinct city/state pair.
//!
//! Flow per key:  skip set → cache → geocoder (unresolved on any error) → delay
//! Then every record sharing a key receives that key's cached coordinates.

use super::cache::CoordinateCache;
use super::geocoder::Geocoder;
use super::types::{Coordinates, GeocodeError, LocationKey};
use crate::dataset::Dataset;
use std::collections::HashSet;
use std::thread;
use std::time::Duration;

/// Explicit settings for a resolver run.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// ISO 3166-1 alpha-2 code the search is restricted to.
    pub country: String,
    /// Per-request timeout handed to the geocoder.
    pub timeout: Duration,
    /// Blocking pause after each distinct key, to stay inside rate limits.
    pub request_delay: Duration,
    /// Skip the network entirely; every key ends unresolved.
    pub offline: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            country: "us".to_string(),
            timeout: Duration::from_secs(5),
            request_delay: Duration::from_secs(1),
            offline: false,
        }
    }
}

/// What a resolver run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveReport {
    pub resolved: usize,
    pub unresolved: Vec<LocationKey>,
    pub records_updated: usize,
}

/// The resolver with its per-run cache and skip set.
pub struct CoordinateResolver<G> {
    geocoder: G,
    options: ResolveOptions,
    cache: CoordinateCache,
    skip: HashSet<LocationKey>,
}

impl<G: Geocoder> CoordinateResolver<G> {
    pub fn new(geocoder: G, options: ResolveOptions) -> Self {
        Self {
            geocoder,
            options,
            cache: CoordinateCache::new(),
            skip: HashSet::new(),
        }
    }

    /// Keys known to fail; they are never sent to the geocoder.
    pub fn with_skip(mut self, keys: impl IntoIterator<Item = LocationKey>) -> Self {
        self.skip.extend(keys);
        self
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    pub fn cache(&self) -> &CoordinateCache {
        &self.cache
    }

    /// Geocode every distinct key in `dataset` and write the results back.
    pub fn resolve(&mut self, dataset: &mut Dataset) -> ResolveReport {
        let keys = dataset.location_keys();
        log::info!(
            "Resolving {} distinct city/state pairs for {} records",
            keys.len(),
            dataset.len()
        );

        for (i, key) in keys.iter().enumerate() {
            if self.skip.contains(key) {
                log::debug!("Skipping {}, it failed before", key);
                self.cache.put(key.clone(), None);
                continue;
            }
            if self.cache.contains(key) {
                continue;
            }
            let coords = match self.lookup(key) {
                Ok(c) => Some(c),
                Err(e) => {
                    log::warn!("Error {}: {}", key, e);
                    self.skip.insert(key.clone());
                    None
                }
            };
            self.cache.put(key.clone(), coords);
            log::debug!("[{}/{}] {} done", i + 1, keys.len(), key);

            if !self.options.offline && !self.options.request_delay.is_zero() {
                thread::sleep(self.options.request_delay);
            }
        }

        let mut report = ResolveReport::default();
        for key in &keys {
            let coords = self.cache.get(key).flatten();
            if coords.is_some() {
                report.resolved += 1;
            } else {
                report.unresolved.push(key.clone());
            }
            report.records_updated += dataset.assign(key, coords);
        }

        log::info!(
            "Resolved {} of {} pairs ({} unresolved)",
            report.resolved,
            keys.len(),
            report.unresolved.len()
        );
        report
    }

    fn lookup(&self, key: &LocationKey) -> Result<Coordinates, GeocodeError> {
        let query = key.to_string();
        if self.options.offline {
            return Err(GeocodeError::Offline(query));
        }
        self.geocoder
            .geocode(&query, &self.options.country, self.options.timeout)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::dataset::Record;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Answers from a fixed table and records every query it sees.
    #[derive(Default)]
    pub(crate) struct StubGeocoder {
        pub answers: HashMap<String, Coordinates>,
        pub calls: RefCell<Vec<(String, String, Duration)>>,
    }

    impl StubGeocoder {
        pub fn with(answers: &[(&str, f64, f64)]) -> Self {
            Self {
                answers: answers
                    .iter()
                    .map(|(q, lat, lon)| (q.to_string(), Coordinates::new(*lat, *lon)))
                    .collect(),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl Geocoder for StubGeocoder {
        fn geocode(
            &self,
            query: &str,
            country: &str,
            timeout: Duration,
        ) -> Result<Coordinates, GeocodeError> {
            self.calls
                .borrow_mut()
                .push((query.to_string(), country.to_string(), timeout));
            self.answers
                .get(query)
                .copied()
                .ok_or_else(|| GeocodeError::Network("connection refused".into()))
        }
    }

    pub(crate) fn fast_options() -> ResolveOptions {
        ResolveOptions {
            request_delay: Duration::ZERO,
            ..ResolveOptions::default()
        }
    }

    fn dataset() -> Dataset {
        Dataset::from_records(vec![
            Record::new("Springfield", "ZZ"),
            Record::new("Maricopa", "AZ"),
            Record::new("Springfield", "ZZ"),
            Record::new("", "ZZ"),
        ])
    }

    #[test]
    fn test_one_request_per_key() {
        let stub = StubGeocoder::with(&[("Springfield, ZZ", 1.0, 2.0)]);
        let mut resolver = CoordinateResolver::new(&stub, fast_options());
        let mut ds = dataset();
        resolver.resolve(&mut ds);

        let calls = stub.calls.borrow();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "Maricopa, AZ");
        assert_eq!(calls[1].0, "Springfield, ZZ");
        assert!(calls.iter().all(|(_, cc, t)| cc == "us" && *t == Duration::from_secs(5)));
    }

    #[test]
    fn test_resolved_written_to_all_matching_records() {
        let stub = StubGeocoder::with(&[("Springfield, ZZ", 1.0, 2.0)]);
        let mut resolver = CoordinateResolver::new(&stub, fast_options());
        let mut ds = dataset();
        let report = resolver.resolve(&mut ds);

        let records = ds.records();
        assert_eq!(records[0].coordinates(), Some(Coordinates::new(1.0, 2.0)));
        assert_eq!(records[2].coordinates(), Some(Coordinates::new(1.0, 2.0)));
        assert_eq!(report.resolved, 1);
        assert_eq!(report.records_updated, 3);
    }

    #[test]
    fn test_failure_degrades_to_unresolved() {
        let stub = StubGeocoder::with(&[("Springfield, ZZ", 1.0, 2.0)]);
        let mut resolver = CoordinateResolver::new(&stub, fast_options());
        let mut ds = dataset();
        ds.records_mut()[1].lat = Some(9.0);
        ds.records_mut()[1].lon = Some(9.0);
        let report = resolver.resolve(&mut ds);

        assert_eq!(report.unresolved, vec![LocationKey::new("Maricopa", "AZ")]);
        assert_eq!(ds.records()[1].lat, None);
        assert_eq!(ds.records()[1].lon, None);
        assert_eq!(resolver.cache().get(&LocationKey::new("Maricopa", "AZ")), Some(None));
    }

    #[test]
    fn test_blank_key_untouched() {
        let stub = StubGeocoder::default();
        let mut resolver = CoordinateResolver::new(&stub, fast_options());
        let mut ds = dataset();
        ds.records_mut()[3].lat = Some(3.0);
        ds.records_mut()[3].lon = Some(4.0);
        resolver.resolve(&mut ds);

        assert_eq!(ds.records()[3].coordinates(), Some(Coordinates::new(3.0, 4.0)));
    }

    #[test]
    fn test_cached_key_not_requested_again() {
        let stub = StubGeocoder::default();
        let mut resolver = CoordinateResolver::new(&stub, fast_options());
        let mut ds = dataset();
        resolver.resolve(&mut ds);
        resolver.resolve(&mut ds);

        assert_eq!(stub.calls.borrow().len(), 2);
    }

    #[test]
    fn test_skipped_key_never_requested() {
        let stub = StubGeocoder::with(&[
            ("Springfield, ZZ", 1.0, 2.0),
            ("Maricopa, AZ", 33.0, -112.0),
        ]);
        let mut resolver = CoordinateResolver::new(&stub, fast_options())
            .with_skip([LocationKey::new("Maricopa", "AZ")]);
        let mut ds = dataset();
        let report = resolver.resolve(&mut ds);

        let calls = stub.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "Springfield, ZZ");
        assert_eq!(report.unresolved, vec![LocationKey::new("Maricopa", "AZ")]);
        assert_eq!(ds.records()[1].coordinates(), None);
    }

    #[test]
    fn test_failed_key_skipped_even_if_cached() {
        let stub = StubGeocoder::default();
        let mut resolver = CoordinateResolver::new(&stub, fast_options());
        let mut ds = dataset();
        resolver.resolve(&mut ds);

        // a later successful entry does not lift the skip
        let key = LocationKey::new("Maricopa", "AZ");
        resolver.cache.put(key.clone(), Some(Coordinates::new(33.0, -112.0)));
        resolver.resolve(&mut ds);

        assert_eq!(resolver.cache().get(&key), Some(None));
        assert_eq!(ds.records()[1].coordinates(), None);
        assert_eq!(stub.calls.borrow().len(), 2);
    }

    #[test]
    fn test_offline_makes_no_calls() {
        let stub = StubGeocoder::with(&[("Springfield, ZZ", 1.0, 2.0)]);
        let options = ResolveOptions {
            offline: true,
            ..ResolveOptions::default()
        };
        let mut resolver = CoordinateResolver::new(&stub, options);
        let mut ds = dataset();
        let report = resolver.resolve(&mut ds);

        assert!(stub.calls.borrow().is_empty());
        assert_eq!(report.resolved, 0);
        assert_eq!(report.unresolved.len(), 2);
    }

    #[test]
    fn test_delay_is_per_key() {
        let stub = StubGeocoder::with(&[("Springfield, ZZ", 1.0, 2.0)]);
        let options = ResolveOptions {
            request_delay: Duration::from_millis(20),
            ..ResolveOptions::default()
        };
        let mut resolver = CoordinateResolver::new(&stub, options);
        let mut ds = dataset();
        let started = std::time::Instant::now();
        resolver.resolve(&mut ds);

        // two keys, three keyed records
        assert!(started.elapsed() >= Duration::from_millis(40));
    }
}
