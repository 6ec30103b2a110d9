//! Run configuration, optionally read from a TOML file.
//!
//! ```toml
//! [geocoding]
//! endpoint = "https://nominatim.openstreetmap.org/search"
//! user-agent = "incident-geocoder/0.1"
//! country = "us"
//! timeout-secs = 5
//! request-delay-ms = 1000
//!
//! [storage]
//! blob-path = "fatal-police-shootings-data-coordinates.json"
//!
//! [overrides]
//! extra-path = "my-corrections.json"
//! ```

use crate::location::geocoder::{DEFAULT_NOMINATIM_ENDPOINT, DEFAULT_USER_AGENT};
use crate::location::ResolveOptions;
use crate::store::DEFAULT_BLOB_PATH;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE_NAME: &str = "incident-geocoder.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub geocoding: Geocoding,
    pub blob_path: PathBuf,
    pub extra_overrides: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Geocoding {
    pub endpoint: String,
    pub user_agent: String,
    pub country: String,
    pub timeout: Duration,
    pub request_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            geocoding: Geocoding {
                endpoint: DEFAULT_NOMINATIM_ENDPOINT.to_string(),
                user_agent: DEFAULT_USER_AGENT.to_string(),
                country: "us".to_string(),
                timeout: Duration::from_secs(5),
                request_delay: Duration::from_millis(1000),
            },
            blob_path: PathBuf::from(DEFAULT_BLOB_PATH),
            extra_overrides: None,
        }
    }
}

impl Config {
    /// Load `file_path`, or the default file name if none is given.
    /// A missing default file yields the built-in defaults; a missing
    /// explicitly named file is an error.
    pub fn try_load_from_file_or_default(file_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match file_path {
            Some(p) => (p, true),
            None => (Path::new(DEFAULT_CONFIG_FILE_NAME), false),
        };

        match fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text).map_err(|e| match e {
                ConfigError::Parse { source, .. } => ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                },
                other => other,
            }),
            Err(err) if err.kind() == ErrorKind::NotFound && !explicit => {
                log::info!("{DEFAULT_CONFIG_FILE_NAME} not found => load default configuration.");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let raw: raw::Config = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        Self::try_from(raw)
    }

    pub fn resolve_options(&self, offline: bool) -> ResolveOptions {
        ResolveOptions {
            country: self.geocoding.country.clone(),
            timeout: self.geocoding.timeout,
            request_delay: self.geocoding.request_delay,
            offline,
        }
    }
}

impl TryFrom<raw::Config> for Config {
    type Error = ConfigError;

    fn try_from(from: raw::Config) -> Result<Self, Self::Error> {
        let defaults = Self::default();
        let raw::Config {
            geocoding,
            storage,
            overrides,
        } = from;

        let raw::Geocoding {
            endpoint,
            user_agent,
            country,
            timeout_secs,
            request_delay_ms,
        } = geocoding.unwrap_or_default();

        let country = country.unwrap_or(defaults.geocoding.country);
        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::Invalid(format!(
                "country must be a two-letter ISO code, got '{country}'"
            )));
        }
        if timeout_secs == Some(0) {
            return Err(ConfigError::Invalid("timeout-secs must be positive".into()));
        }

        let geocoding = Geocoding {
            endpoint: endpoint.unwrap_or(defaults.geocoding.endpoint),
            user_agent: user_agent.unwrap_or(defaults.geocoding.user_agent),
            country: country.to_lowercase(),
            timeout: timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.geocoding.timeout),
            request_delay: request_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.geocoding.request_delay),
        };

        Ok(Self {
            geocoding,
            blob_path: storage
                .and_then(|s| s.blob_path)
                .unwrap_or(defaults.blob_path),
            extra_overrides: overrides.and_then(|o| o.extra_path),
        })
    }
}

mod raw {
    use serde::Deserialize;
    use std::path::PathBuf;

    #[derive(Deserialize, Default)]
    #[serde(rename_all = "kebab-case", deny_unknown_fields)]
    pub struct Config {
        pub geocoding: Option<Geocoding>,
        pub storage: Option<Storage>,
        pub overrides: Option<Overrides>,
    }

    #[derive(Deserialize, Default)]
    #[serde(rename_all = "kebab-case", deny_unknown_fields)]
    pub struct Geocoding {
        pub endpoint: Option<String>,
        pub user_agent: Option<String>,
        pub country: Option<String>,
        pub timeout_secs: Option<u64>,
        pub request_delay_ms: Option<u64>,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "kebab-case", deny_unknown_fields)]
    pub struct Storage {
        pub blob_path: Option<PathBuf>,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "kebab-case", deny_unknown_fields)]
    pub struct Overrides {
        pub extra_path: Option<PathBuf>,
    }
}
