//! The enrichment pipeline: resolve, then patch.

use crate::dataset::Dataset;
use crate::location::{apply_overrides, CoordinateResolver, Geocoder, OverrideTable, ResolveReport};

/// Geocode `dataset` in place and apply the fill, fix and extra correction tables.
pub fn enrich<G: Geocoder>(
    dataset: &mut Dataset,
    resolver: &mut CoordinateResolver<G>,
    extra: Option<&OverrideTable>,
) -> ResolveReport {
    let report = resolver.resolve(dataset);
    apply_overrides(dataset, extra);

    let still_missing: Vec<String> = report
        .unresolved
        .iter()
        .filter(|key| {
            dataset
                .records()
                .iter()
                .any(|r| r.matches(key) && r.coordinates().is_none())
        })
        .map(ToString::to_string)
        .collect();
    if !still_missing.is_empty() {
        log::warn!(
            "{} pairs still lack coordinates: {}",
            still_missing.len(),
            still_missing.join("; ")
        );
    }
    report
}
