//! Hand-verified coordinate corrections, applied after automated resolution.
//!
//! Two embedded tables: `FILL_OVERRIDES` for pairs Nominatim cannot place
//! and `FIX_OVERRIDES` for pairs it places wrongly. Patches overwrite
//! unconditionally; a key with no matching record is a no-op.

use super::types::{Coordinates, LocationKey};
use crate::dataset::Dataset;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// One embedded correction.
pub struct Override {
    pub city: &'static str,
    pub state: &'static str,
    pub lat: f64,
    pub lon: f64,
}

const fn ovr(city: &'static str, state: &'static str, lat: f64, lon: f64) -> Override {
    Override {
        city,
        state,
        lat,
        lon,
    }
}

/// Keys the geocoder cannot place at all.
pub const FILL_OVERRIDES: &[Override] = &[
    ovr("Maricopa", "AZ", 33.058106, -112.047642),
    ovr("Eaton Rapids Township", "MI", 42.568147, -84.752448),
    ovr("Green Bay", "WI", 44.513319, -88.013296),
    ovr("Roxand Township", "MI", 42.729993, -84.877639),
    ovr("San Antonio", "TX", 29.424122, -98.493628),
    ovr("Red Valley", "AZ", 36.603994, -109.060383),
    ovr("Straban Township", "PA", 39.871606, -77.173531),
    ovr("South El Monte", "CA", 34.051955, -118.046734),
    ovr("St. Petersburg", "FL", 27.767601, -82.640291),
    ovr("Watsonsville", "CA", 36.910231, -121.756895),
    ovr("Pinion Hills", "CA", 34.433237, -117.646792),
    ovr("Palm Beach Gardens", "FL", 26.823395, -80.138655),
    ovr("West Goshen", "CA", 36.351062, -119.420120),
    ovr("North Laredo", "TX", 27.530567, -99.480324),
    ovr("Mountain Pine", "AR", 34.572035, -93.173240),
    ovr("South Greensburg", "PA", 40.278403, -79.544762),
    ovr("Pueblo of Laguna", "NM", 35.035654, -107.386223),
    ovr("Benton", "IL", 37.996716, -88.920069),
    ovr("Fayetteville", "AR", 36.082156, -94.171854),
    ovr("El Paso", "TX", 31.761878, -106.485022),
    ovr("St. Martin", "MS", 30.437976, -88.868085),
    ovr("Jacksonville", "FL", 30.332184, -81.655651),
    ovr("Lake Asbury", "FL", 30.049129, -81.821487),
    ovr("Lake City", "SC", 33.870996, -79.755345),
    ovr("McKinneyville", "CA", 40.946515, -124.100620),
    ovr("East Hollywood", "CA", 34.091341, -118.293589),
    ovr("Weeki Wachi", "FL", 28.515551, -82.572877),
    ovr("Logan Canyon", "UT", 41.740209, -111.793831),
    ovr("Springdale", "AR", 36.186744, -94.128814),
    ovr("Muckleshoot Indian Reservation", "WA", 47.251720, -122.115322),
    ovr("North St. Louis", "MO", 38.606842, -90.250129),
    ovr("Simpsonsville", "KY", 38.222570, -85.355235),
    ovr("Forks Township", "PA", 40.734543, -75.212900),
    ovr("Lancaster City", "PA", 40.037875, -76.305514),
    ovr("Golden Shores", "AZ", 34.786283, -114.474120),
    ovr("Grand Prarie", "TX", 32.745964, -96.997785),
    ovr("Corning", "WI", 45.261851, -89.962337),
    ovr("Barona Indian Reservation", "CA", 32.946258, -116.861586),
    ovr("Lower Mount Bethel", "PA", 40.807747, -75.166212),
    ovr("Franklin", "TN", 35.925064, -86.868890),
    ovr("Crescent City", "FL", 29.430251, -81.510629),
    ovr("North Branch", "MN", 45.510213, -92.993105),
    ovr("Saginaw", "MI", 43.419470, -83.950807),
    ovr("Blue Summit", "MO", 39.088673, -94.481243),
    ovr("Frederickstown", "WA", 39.365658, -75.882690),
    ovr("Watagua", "TX", 32.857906, -97.254737),
    ovr("Columbua", "IN", 39.201440, -85.921380),
    ovr("Canton Township", "PA", 40.218128, -80.310168),
    ovr("Fort Smith", "OK", 35.385924, -94.398548),
    ovr("Standing Rock Reservation", "ND", 45.750275, -101.200415),
    ovr("Rudioso", "NM", 33.367252, -105.658848),
    ovr("300 block of State Line Road", "TN", 36.502580, -88.743449),
    ovr("Blackman Township", "MI", 42.279917, -84.459270),
    ovr("Lone Rock", "AR", 36.180625, -92.344602),
    ovr("Lower Macungie Township", "PA", 40.540989, -75.562604),
    ovr("Hackett", "AR", 35.190373, -94.411049),
    ovr("Cottonwood", "AZ", 34.739188, -112.009879),
    ovr("Tiverton", "RI", 41.625921, -71.213423),
    ovr("Poway", "CA", 32.962823, -117.035865),
    ovr("Kenner", "LA", 29.994092, -90.241743),
    ovr("Okmulgee County", "OK", 35.679587, -95.983258),
    ovr("Homestead", "FL", 25.468722, -80.477557),
    ovr("Antioch", "TN", 36.059718, -86.671595),
    ovr("Naples", "FL", 26.142036, -81.794810),
    ovr("Knox", "IN", 41.295875, -86.625014),
    ovr("Monroe", "NC", 34.985428, -80.549511),
    ovr("North Shore", "HI", 21.561657, -158.071598),
];

/// Keys the geocoder places, but in the wrong spot.
pub const FIX_OVERRIDES: &[Override] = &[
    ovr("South Gate", "CA", 33.954737, -118.212016),
    ovr("Westminister", "CO", 39.836653, -105.037205),
    ovr("Sylvania Township", "OH", 41.689896, -83.741163),
    ovr("Colebrook Township", "OH", 41.535773, -80.762615),
    ovr("Nevada", "MO", 37.839205, -94.354672),
    ovr("Big Bear", "MO", 36.556754, -93.271757),
    ovr("Buffalo", "MO", 37.643929, -93.092409),
    ovr("Aurora", "MO", 36.970891, -93.717979),
    ovr("Lebanon", "MO", 37.680597, -92.663787),
    ovr("Vancouver", "WA", 45.635515, -122.557830),
    ovr("Ridgefield", "WA", 45.815695, -122.702895),
    ovr("Des Moines", "WA", 47.401766, -122.324290),
    ovr("Rochester", "WA", 46.828064, -123.075530),
    ovr("Beaver", "WA", 48.057425, -124.347757),
    ovr("Frederickson", "WA", 47.096211, -122.358731),
    ovr("West Knox", "TN", 35.970360, -83.955185),
    ovr("Washington Park", "IL", 38.635050, -90.092885),
    ovr("Forest Park", "IL", 41.879476, -87.813670),
    ovr("Stockton", "IL", 42.349736, -90.006792),
    ovr("Lawndale", "IL", 40.218097, -89.282592),
    ovr("Harvey", "IL", 41.610034, -87.646713),
    ovr("Hurst", "IL", 37.833106, -89.142857),
    ovr("Dalton", "IL", 41.638924, -87.607268),
    ovr("Nokomis", "IL", 39.301157, -89.285085),
    ovr("Joilet", "IL", 41.525031, -88.081725),
    ovr("Lansing", "IL", 41.564757, -87.538931),
    ovr("Arcola", "IL", 39.684755, -88.306437),
    ovr("Homer", "LA", 32.791813, -93.055718),
    ovr("Converse", "LA", 31.781558, -93.693794),
    ovr("Crowley", "LA", 30.214093, -92.374576),
    ovr("Harvey", "LA", 29.903539, -90.077294),
    ovr("Cade", "LA", 30.088707, -91.906276),
    ovr("Bernice", "LA", 32.822088, -92.657930),
    ovr("Monroe", "LA", 32.509311, -92.119301),
    ovr("Franklin", "LA", 29.796040, -91.501500),
    ovr("Pride", "LA", 30.693796, -90.978159),
    ovr("Gibson", "LA", 29.686876, -90.990653),
    ovr("Covington", "LA", 30.475470, -90.100911),
    ovr("Raceland", "LA", 29.727433, -90.598976),
    ovr("Slidell", "LA", 30.275195, -89.781175),
    ovr("Alexandria", "LA", 31.311294, -92.445137),
    ovr("Lakes Charles", "LA", 30.226595, -93.217376),
    ovr("Gretna", "LA", 29.914649, -90.053960),
    ovr("Winnsboro", "LA", 32.163208, -91.720681),
    ovr("Killeen", "AL", 34.862864, -87.537525),
    ovr("Boonville", "IN", 38.049213, -87.274172),
    ovr("Geneva", "WI", 42.638605, -88.459767),
    ovr("Algoma Township", "MI", 43.149293, -85.622930),
    ovr("Cato Township", "MI", 43.443107, -85.251548),
    ovr("Columbia Township", "MI", 42.114211, -84.291076),
    ovr("Union Township", "MI", 43.587807, -84.825510),
    ovr("Holland Township", "MI", 42.812810, -86.088390),
    ovr("Manila", "AR", 35.880073, -90.167039),
    ovr("Sims", "AR", 34.659264, -93.691029),
    ovr("Little Rock", "AR", 34.746481, -92.289595),
    ovr("Sheridan", "AR", 34.307041, -92.401265),
    ovr("Benton", "AR", 34.564537, -92.586828),
    ovr("Farmington", "AR", 36.042025, -94.247151),
    ovr("Austin", "AR", 34.998421, -91.983755),
    ovr("Romance", "AR", 35.240713, -92.051904),
    ovr("Marion", "AR", 35.214534, -90.196483),
    ovr("Clarksville", "AR", 35.471472, -93.466573),
    ovr("Ozark", "AR", 35.487029, -93.827697),
    ovr("Pine Bluff", "AR", 34.228431, -92.003196),
    ovr("Mulberry", "AR", 35.500642, -94.051592),
    ovr("Cabot", "AR", 34.974532, -92.016534),
    ovr("Jonesboro", "AR", 35.842297, -90.704279),
    ovr("Perryville", "AR", 35.004810, -92.802667),
    ovr("Dover", "AR", 35.401471, -93.114341),
    ovr("Mena", "AR", 34.586217, -94.239655),
    ovr("Russellville", "AR", 35.278417, -93.133786),
];

#[derive(Debug, Error)]
pub enum OverrideError {
    #[error("Cannot read override table {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Invalid override table {path}: {source}")]
    Format {
        path: String,
        source: serde_json::Error,
    },
}

/// Entry of a user-supplied JSON override file.
#[derive(Deserialize)]
struct RawOverride {
    city: String,
    state: String,
    lat: f64,
    lon: f64,
}

/// An ordered list of corrections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideTable {
    entries: Vec<(LocationKey, Coordinates)>,
}

impl OverrideTable {
    pub fn from_entries(entries: Vec<(LocationKey, Coordinates)>) -> Self {
        Self { entries }
    }

    fn from_static(table: &[Override]) -> Self {
        Self::from_entries(
            table
                .iter()
                .map(|o| (LocationKey::new(o.city, o.state), Coordinates::new(o.lat, o.lon)))
                .collect(),
        )
    }

    /// Corrections for pairs the geocoder could not resolve.
    pub fn fill() -> Self {
        Self::from_static(FILL_OVERRIDES)
    }

    /// Corrections for pairs the geocoder resolved to the wrong place.
    pub fn fix() -> Self {
        Self::from_static(FIX_OVERRIDES)
    }

    /// Load extra corrections from a JSON array of `{city, state, lat, lon}`.
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self, OverrideError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| OverrideError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let raw: Vec<RawOverride> =
            serde_json::from_str(&data).map_err(|source| OverrideError::Format {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Self::from_entries(
            raw.into_iter()
                .map(|r| (LocationKey::new(r.city, r.state), Coordinates::new(r.lat, r.lon)))
                .collect(),
        ))
    }

    /// Last entry wins when a key is listed twice.
    pub fn get(&self, key: &LocationKey) -> Option<Coordinates> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, c)| *c)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overwrite the coordinates of every record whose key is in the table.
    /// Returns the number of records patched.
    pub fn apply(&self, dataset: &mut Dataset) -> usize {
        let lookup: HashMap<&LocationKey, Coordinates> =
            self.entries.iter().map(|(k, c)| (k, *c)).collect();

        let mut patched = 0;
        for record in dataset.records_mut() {
            let Some(key) = record.location_key() else {
                continue;
            };
            if let Some(coords) = lookup.get(&key) {
                record.set_coordinates(Some(*coords));
                patched += 1;
            }
        }
        patched
    }
}

/// Fill pass, then fix pass, then any user-supplied table.
pub fn apply_overrides(dataset: &mut Dataset, extra: Option<&OverrideTable>) -> usize {
    let filled = OverrideTable::fill().apply(dataset);
    let fixed = OverrideTable::fix().apply(dataset);
    let custom = extra.map_or(0, |table| table.apply(dataset));
    log::info!(
        "Patched {} records from fill table, {} from fix table, {} from extra table",
        filled,
        fixed,
        custom
    );
    filled + fixed + custom
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Record;
    use std::collections::HashSet;
    use tempfile::TempDir;

    #[test]
    fn test_tables_have_no_duplicate_keys() {
        for table in [OverrideTable::fill(), OverrideTable::fix()] {
            let keys: HashSet<&LocationKey> = table.entries.iter().map(|(k, _)| k).collect();
            assert_eq!(keys.len(), table.len());
        }
    }

    #[test]
    fn test_tables_do_not_overlap() {
        let fill = OverrideTable::fill();
        let fix = OverrideTable::fix();
        for (key, _) in &fix.entries {
            assert!(fill.get(key).is_none(), "{} in both tables", key);
        }
    }

    #[test]
    fn test_table_sizes() {
        assert_eq!(FILL_OVERRIDES.len(), 67);
        assert_eq!(FIX_OVERRIDES.len(), 71);
    }

    #[test]
    fn test_known_values_exact() {
        let fill = OverrideTable::fill();
        assert_eq!(
            fill.get(&LocationKey::new("Maricopa", "AZ")),
            Some(Coordinates::new(33.058106, -112.047642))
        );
        assert_eq!(
            fill.get(&LocationKey::new("300 block of State Line Road", "TN")),
            Some(Coordinates::new(36.502580, -88.743449))
        );
        let fix = OverrideTable::fix();
        assert_eq!(
            fix.get(&LocationKey::new("Harvey", "LA")),
            Some(Coordinates::new(29.903539, -90.077294))
        );
        assert_eq!(
            fix.get(&LocationKey::new("Harvey", "IL")),
            Some(Coordinates::new(41.610034, -87.646713))
        );
    }

    #[test]
    fn test_apply_overwrites_unconditionally() {
        let mut ds = Dataset::from_records(vec![
            Record::new("Maricopa", "AZ"),
            Record::new("Maricopa", "AZ"),
            Record::new("Maricopa", "CA"),
        ]);
        ds.records_mut()[0].lat = Some(1.0);
        ds.records_mut()[0].lon = Some(1.0);

        let patched = OverrideTable::fill().apply(&mut ds);

        assert_eq!(patched, 2);
        let expected = Some(Coordinates::new(33.058106, -112.047642));
        assert_eq!(ds.records()[0].coordinates(), expected);
        assert_eq!(ds.records()[1].coordinates(), expected);
        assert_eq!(ds.records()[2].coordinates(), None);
    }

    #[test]
    fn test_apply_no_match_is_noop() {
        let mut ds = Dataset::from_records(vec![Record::new("Nowhere", "ZZ")]);
        let before = ds.clone();
        assert_eq!(OverrideTable::fix().apply(&mut ds), 0);
        assert_eq!(ds, before);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut ds = Dataset::from_records(vec![
            Record::new("Vancouver", "WA"),
            Record::new("Green Bay", "WI"),
        ]);
        apply_overrides(&mut ds, None);
        let once = ds.clone();
        apply_overrides(&mut ds, None);
        assert_eq!(ds, once);
    }

    #[test]
    fn test_later_duplicate_wins() {
        let key = LocationKey::new("Dover", "AR");
        let table = OverrideTable::from_entries(vec![
            (key.clone(), Coordinates::new(1.0, 1.0)),
            (key.clone(), Coordinates::new(2.0, 2.0)),
        ]);
        assert_eq!(table.get(&key), Some(Coordinates::new(2.0, 2.0)));

        let mut ds = Dataset::from_records(vec![Record::new("Dover", "AR")]);
        table.apply(&mut ds);
        assert_eq!(ds.records()[0].coordinates(), Some(Coordinates::new(2.0, 2.0)));
    }

    #[test]
    fn test_extra_table_runs_last() {
        let extra = OverrideTable::from_entries(vec![(
            LocationKey::new("Vancouver", "WA"),
            Coordinates::new(45.6, -122.6),
        )]);
        let mut ds = Dataset::from_records(vec![Record::new("Vancouver", "WA")]);
        apply_overrides(&mut ds, Some(&extra));
        assert_eq!(ds.records()[0].coordinates(), Some(Coordinates::new(45.6, -122.6)));
    }

    #[test]
    fn test_from_json_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("extra.json");
        fs::write(
            &path,
            r#"[{"city": "Shelton", "state": "WA", "lat": 47.215094, "lon": -123.100707}]"#,
        )
        .unwrap();

        let table = OverrideTable::from_json_path(&path).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.get(&LocationKey::new("Shelton", "WA")),
            Some(Coordinates::new(47.215094, -123.100707))
        );
    }

    #[test]
    fn test_from_json_path_errors() {
        let dir = TempDir::new().unwrap();
        let missing = OverrideTable::from_json_path(dir.path().join("nope.json"));
        assert!(matches!(missing, Err(OverrideError::Io { .. })));

        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            OverrideTable::from_json_path(&path),
            Err(OverrideError::Format { .. })
        ));
    }
}
