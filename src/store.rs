//! Fixed-path blob store for an enriched dataset.
//!
//! JSON on disk. serde_json is built with `float_roundtrip`, so every f64
//! reloads bit-for-bit; unresolved coordinates are stored as `null`.

use crate::dataset::{Dataset, LAT_COLUMN, LON_COLUMN};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_BLOB_PATH: &str = "fatal-police-shootings-data-coordinates.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cannot decode {path}: {source}")]
    Format {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Cannot save {path}: record {record} has non-finite {column}")]
    NonFinite {
        path: PathBuf,
        record: usize,
        column: &'static str,
    },
}

/// Reads and writes one serialized dataset at a fixed path.
#[derive(Debug, Clone)]
pub struct BlobStore {
    path: PathBuf,
}

impl BlobStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fails without writing if any coordinate is NaN or infinite, since JSON
    /// would turn it into `null` and the reload would differ.
    pub fn save(&self, dataset: &Dataset) -> Result<(), StoreError> {
        self.check_finite(dataset)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| self.io(source))?;
        }
        let json = serde_json::to_vec(dataset).map_err(|source| self.format(source))?;
        fs::write(&self.path, json).map_err(|source| self.io(source))?;
        log::info!("Saved {} records to {}", dataset.len(), self.path.display());
        Ok(())
    }

    pub fn load(&self) -> Result<Dataset, StoreError> {
        let data = fs::read(&self.path).map_err(|source| self.io(source))?;
        let dataset: Dataset =
            serde_json::from_slice(&data).map_err(|source| self.format(source))?;
        log::debug!("Loaded {} records from {}", dataset.len(), self.path.display());
        Ok(dataset)
    }

    fn check_finite(&self, dataset: &Dataset) -> Result<(), StoreError> {
        for (record, r) in dataset.records().iter().enumerate() {
            for (column, value) in [(LAT_COLUMN, r.lat), (LON_COLUMN, r.lon)] {
                if value.is_some_and(|v| !v.is_finite()) {
                    return Err(StoreError::NonFinite {
                        path: self.path.clone(),
                        record,
                        column,
                    });
                }
            }
        }
        Ok(())
    }

    fn io(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn format(&self, source: serde_json::Error) -> StoreError {
        StoreError::Format {
            path: self.path.clone(),
            source,
        }
    }
}

impl Default for BlobStore {
    fn default() -> Self {
        Self::new(DEFAULT_BLOB_PATH)
    }
}
