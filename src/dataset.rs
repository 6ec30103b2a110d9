//! Tabular incident records.
//!
//! A `Dataset` keeps every input column verbatim and lifts `city`, `state`
//! and the coordinate columns into typed fields. The unresolved marker is
//! `None`, never NaN, so it survives serialization unchanged.

use crate::location::{Coordinates, LocationKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;

pub const CITY_COLUMN: &str = "city";
pub const STATE_COLUMN: &str = "state";
pub const LAT_COLUMN: &str = "lat";
pub const LON_COLUMN: &str = "lon";

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error("Column '{0}' appears more than once")]
    DuplicateColumn(&'static str),
    #[error("Row {row}: invalid {column} value '{value}'")]
    BadCoordinate {
        row: usize,
        column: &'static str,
        value: String,
    },
}

/// One incident row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub city: String,
    pub state: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Remaining cells, in the order of the dataset's non-city/state columns.
    #[serde(default)]
    pub extra: Vec<String>,
}

impl Record {
    pub fn new(city: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            state: state.into(),
            lat: None,
            lon: None,
            extra: Vec::new(),
        }
    }

    /// Rows with a blank city or state have no key and are never geocoded.
    pub fn location_key(&self) -> Option<LocationKey> {
        if self.city.is_empty() || self.state.is_empty() {
            return None;
        }
        Some(LocationKey::new(self.city.clone(), self.state.clone()))
    }

    pub fn matches(&self, key: &LocationKey) -> bool {
        self.city == key.city && self.state == key.state
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        Some(Coordinates::new(self.lat?, self.lon?))
    }

    pub fn set_coordinates(&mut self, coords: Option<Coordinates>) {
        self.lat = coords.map(|c| c.lat);
        self.lon = coords.map(|c| c.lon);
    }
}

/// An ordered collection of records plus the input header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Input header minus any `lat`/`lon` columns; includes `city` and `state`.
    columns: Vec<String>,
    records: Vec<Record>,
}

impl Dataset {
    /// A dataset with only the `city` and `state` columns.
    pub fn from_records(records: Vec<Record>) -> Self {
        Self {
            columns: vec![CITY_COLUMN.to_string(), STATE_COLUMN.to_string()],
            records,
        }
    }

    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let file = File::open(path.as_ref())?;
        Self::from_csv_reader(file)
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers = rdr.headers()?.clone();

        for name in [CITY_COLUMN, STATE_COLUMN, LAT_COLUMN, LON_COLUMN] {
            if headers.iter().filter(|h| *h == name).count() > 1 {
                return Err(DatasetError::DuplicateColumn(name));
            }
        }
        let position = |name: &str| headers.iter().position(|h| h == name);
        let city_idx = position(CITY_COLUMN).ok_or(DatasetError::MissingColumn(CITY_COLUMN))?;
        let state_idx = position(STATE_COLUMN).ok_or(DatasetError::MissingColumn(STATE_COLUMN))?;
        let lat_idx = position(LAT_COLUMN);
        let lon_idx = position(LON_COLUMN);
        let is_coord = |i: usize| Some(i) == lat_idx || Some(i) == lon_idx;

        let columns: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| !is_coord(*i))
            .map(|(_, h)| h.to_string())
            .collect();

        let mut records = Vec::new();
        for (n, row) in rdr.records().enumerate() {
            let row = row?;
            // 1-based, counting the header line
            let line = n + 2;
            let cell = |i: usize| row.get(i).unwrap_or_default();

            let lat = match lat_idx {
                Some(i) => parse_coordinate(line, LAT_COLUMN, cell(i))?,
                None => None,
            };
            let lon = match lon_idx {
                Some(i) => parse_coordinate(line, LON_COLUMN, cell(i))?,
                None => None,
            };

            let extra = row
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != city_idx && *i != state_idx && !is_coord(*i))
                .map(|(_, v)| v.to_string())
                .collect();

            records.push(Record {
                city: cell(city_idx).to_string(),
                state: cell(state_idx).to_string(),
                lat,
                lon,
                extra,
            });
        }

        log::debug!("Loaded {} records with {} columns", records.len(), columns.len());
        Ok(Self { columns, records })
    }

    /// Writes the original columns in their original order, then `lat`, `lon`.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), DatasetError> {
        let mut wtr = csv::Writer::from_writer(writer);

        let mut header: Vec<&str> = self.columns.iter().map(String::as_str).collect();
        header.push(LAT_COLUMN);
        header.push(LON_COLUMN);
        wtr.write_record(&header)?;

        for record in &self.records {
            let mut extra = record.extra.iter();
            let mut row: Vec<String> = Vec::with_capacity(header.len());
            for column in &self.columns {
                let cell = match column.as_str() {
                    CITY_COLUMN => record.city.clone(),
                    STATE_COLUMN => record.state.clone(),
                    _ => extra.next().cloned().unwrap_or_default(),
                };
                row.push(cell);
            }
            row.push(format_coordinate(record.lat));
            row.push(format_coordinate(record.lon));
            wtr.write_record(&row)?;
        }

        wtr.flush()?;
        Ok(())
    }

    pub fn to_csv_path(&self, path: impl AsRef<Path>) -> Result<(), DatasetError> {
        let file = File::create(path.as_ref())?;
        self.write_csv(file)
    }

    /// Distinct keys in sorted order.
    pub fn location_keys(&self) -> Vec<LocationKey> {
        let keys: BTreeSet<LocationKey> =
            self.records.iter().filter_map(Record::location_key).collect();
        keys.into_iter().collect()
    }

    /// Sets the coordinates of every record with `key`; returns how many matched.
    pub fn assign(&mut self, key: &LocationKey, coords: Option<Coordinates>) -> usize {
        let mut touched = 0;
        for record in self.records.iter_mut().filter(|r| r.matches(key)) {
            record.set_coordinates(coords);
            touched += 1;
        }
        touched
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn summary(&self) -> Summary {
        let resolved = self
            .records
            .iter()
            .filter(|r| r.coordinates().is_some())
            .count();
        Summary {
            records: self.records.len(),
            keys: self.location_keys().len(),
            resolved,
            unresolved: self.records.len() - resolved,
        }
    }
}

fn parse_coordinate(
    row: usize,
    column: &'static str,
    raw: &str,
) -> Result<Option<f64>, DatasetError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let value: f64 = raw.parse().map_err(|_| DatasetError::BadCoordinate {
        row,
        column,
        value: raw.to_string(),
    })?;
    Ok(value.is_finite().then_some(value))
}

fn format_coordinate(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Record counts for a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub records: usize,
    pub keys: usize,
    pub resolved: usize,
    pub unresolved: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records, {} distinct city/state pairs, {} with coordinates, {} without",
            self.records, self.keys, self.resolved, self.unresolved
        )
    }
}
