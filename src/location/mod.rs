//! Location subsystem for the incident geocoder.
//!
//! Provides Nominatim lookup behind a swappable trait, a per-run coordinate
//! cache, the resolver loop and the embedded correction tables.

pub mod cache;
pub mod geocoder;
pub mod overrides;
pub mod resolver;
pub mod types;

pub use cache::CoordinateCache;
pub use geocoder::{Geocoder, NominatimGeocoder};
pub use overrides::{apply_overrides, OverrideTable};
pub use resolver::{CoordinateResolver, ResolveOptions, ResolveReport};
pub use types::{Coordinates, GeocodeError, LocationKey};
