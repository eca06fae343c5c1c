//! Facet counting and section ordering.

use std::collections::HashMap;
use std::time::Instant;

use rustc_hash::FxHashMap;
use serde::Serialize;
use sieve_core::{Extractor, FilterKey, FilterValue};
use smallvec::SmallVec;
use tracing::trace;

/// Per-key value counts. Keys with no usable values are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetTable {
    facets: FxHashMap<FilterKey, FxHashMap<FilterValue, usize>>,
}

impl FacetTable {
    pub fn get(&self, key: &str) -> Option<&FxHashMap<FilterValue, usize>> { self.facets.get(key) }

    pub fn count(&self, key: &str, value: &FilterValue) -> usize {
        self.facets.get(key).and_then(|m| m.get(value)).copied().unwrap_or(0)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> { self.facets.keys().map(String::as_str) }
    pub fn len(&self) -> usize { self.facets.len() }
    pub fn is_empty(&self) -> bool { self.facets.is_empty() }
}

/// A titled block of `(value, count)` pairs, values ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub key: FilterKey,
    pub title: Option<String>,
    pub values: Vec<(FilterValue, usize)>,
}

/// Count, per key, how many items carry each usable value.
///
/// A value listed twice by the same item still counts that item once.
pub fn compute_facets<I, E>(items: &[I], keys: &[FilterKey], extractor: &E) -> FacetTable
where
    E: Extractor<I> + ?Sized,
{
    let started = Instant::now();
    let facets = items.iter().fold(FxHashMap::default(), |mut acc: FxHashMap<FilterKey, FxHashMap<FilterValue, usize>>, item| {
        for key in keys.iter() {
            let mut values: SmallVec<[FilterValue; 4]> = extractor.extract(item, key).into_values();
            if values.is_empty() { continue; }
            values.sort();
            values.dedup();
            let counts = acc.entry(key.clone()).or_default();
            for v in values { *counts.entry(v).or_insert(0) += 1; }
        }
        acc
    });
    let elapsed = started.elapsed();
    trace!(items = items.len(), keys = keys.len(), facets = facets.len(), "facets computed");
    metrics::gauge!("facet_items", items.len() as f64);
    metrics::histogram!("facet_build_ms", elapsed.as_secs_f64() * 1_000.0);
    FacetTable { facets }
}

/// Lay facets out in `key_order`, skipping keys without values.
pub fn order_sections(facets: &FacetTable, key_order: &[FilterKey], names: &HashMap<FilterKey, String>) -> Vec<Section> {
    key_order
        .iter()
        .filter_map(|key| {
            let values = facets.get(key).filter(|m| !m.is_empty())?;
            let mut values: Vec<(FilterValue, usize)> = values.iter().map(|(v, c)| (v.clone(), *c)).collect();
            values.sort_by(|a, b| a.0.cmp(&b.0));
            Some(Section { key: key.clone(), title: names.get(key).cloned(), values })
        })
        .collect()
}
