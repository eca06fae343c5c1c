//! Sieve core types: filter values, extracted attribute shapes, filter targets.

#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

pub mod attributes;
pub mod config;

/// Name of a filterable attribute, usually a model field.
pub type FilterKey = String;

/// Facet key whose values are workload annotation names rather than plain values.
pub const WORKLOAD_FACET_KEY: &str = "workload_annotations";

/// Prefix of the synthetic filter key built from a workload annotation name.
pub const WORKLOAD_FILTER_PREFIX: &str = "workload-";

/// A scalar an item attribute can take.
///
/// Ordering is total: booleans first, then integers, then text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl FilterValue {
    /// Only empty text counts as "no value"; `0` and `false` are kept.
    pub fn is_absent(&self) -> bool {
        matches!(self, FilterValue::Text(s) if s.is_empty())
    }

    /// Defensive conversion of a JSON scalar. Objects, arrays and nulls yield `None`.
    pub fn from_json(v: &serde_json::Value) -> Option<Self> {
        match v {
            serde_json::Value::Bool(b) => Some(FilterValue::Bool(*b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Some(FilterValue::Int(i)),
                None => Some(FilterValue::Text(n.to_string())),
            },
            serde_json::Value::String(s) => Some(FilterValue::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Bool(b) => write!(f, "{}", b),
            FilterValue::Int(i) => write!(f, "{}", i),
            FilterValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self { FilterValue::Text(s.to_string()) }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self { FilterValue::Text(s) }
}

impl From<i64> for FilterValue {
    fn from(i: i64) -> Self { FilterValue::Int(i) }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self { FilterValue::Bool(b) }
}

/// Shape of an attribute as returned by an extractor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Extracted {
    #[default]
    Missing,
    One(FilterValue),
    Many(Vec<FilterValue>),
}

impl Extracted {
    /// Normalize into the usable values: scalars become one-element sequences,
    /// absent entries are dropped.
    pub fn into_values(self) -> SmallVec<[FilterValue; 4]> {
        match self {
            Extracted::Missing => SmallVec::new(),
            Extracted::One(v) => {
                let mut out = SmallVec::new();
                if !v.is_absent() { out.push(v); }
                out
            }
            Extracted::Many(vs) => vs.into_iter().filter(|v| !v.is_absent()).collect(),
        }
    }

    /// Lenient conversion from whatever JSON an attribute path resolved to.
    /// Anything that is not a scalar or an array of scalars is `Missing`;
    /// non-scalar array entries are skipped.
    pub fn from_json(v: Option<&serde_json::Value>) -> Self {
        match v {
            None | Some(serde_json::Value::Null) => Extracted::Missing,
            Some(serde_json::Value::Array(arr)) => {
                let vals: Vec<FilterValue> = arr.iter().filter_map(FilterValue::from_json).collect();
                if vals.is_empty() { Extracted::Missing } else { Extracted::Many(vals) }
            }
            Some(other) => FilterValue::from_json(other).map(Extracted::One).unwrap_or_default(),
        }
    }
}

impl From<Option<FilterValue>> for Extracted {
    fn from(v: Option<FilterValue>) -> Self { v.map(Extracted::One).unwrap_or_default() }
}

impl From<Vec<FilterValue>> for Extracted {
    fn from(v: Vec<FilterValue>) -> Self { Extracted::Many(v) }
}

/// Reads filterable attributes out of opaque items.
pub trait Extractor<I: ?Sized>: Send + Sync {
    fn extract(&self, item: &I, key: &str) -> Extracted;

    /// Haystack for free-text terms. Items without one never match free text.
    fn text(&self, _item: &I) -> Option<String> { None }

    /// Whether the item carries `key` at all. Backs existence filters.
    fn has(&self, item: &I, key: &str) -> bool { !self.extract(item, key).into_values().is_empty() }
}

impl<I: ?Sized, F> Extractor<I> for F
where
    F: Fn(&I, &str) -> Extracted + Send + Sync,
{
    fn extract(&self, item: &I, key: &str) -> Extracted { self(item, key) }
}

/// Where a toggle lands: a plain attribute key or a workload annotation whose
/// key is synthesized from its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterTarget {
    Static(FilterKey),
    WorkloadAnnotation(String),
}

impl FilterTarget {
    /// Target for a clicked facet value.
    pub fn for_facet(key: &str, value: &FilterValue) -> Self {
        if key == WORKLOAD_FACET_KEY {
            FilterTarget::WorkloadAnnotation(value.to_string())
        } else {
            FilterTarget::Static(key.to_string())
        }
    }

    /// Classify a key found in a parsed filter string.
    pub fn from_key(key: &str) -> Self {
        match key.strip_prefix(WORKLOAD_FILTER_PREFIX) {
            Some(name) if !name.is_empty() => FilterTarget::WorkloadAnnotation(name.to_string()),
            _ => FilterTarget::Static(key.to_string()),
        }
    }

    pub fn key(&self) -> FilterKey {
        match self {
            FilterTarget::Static(k) => k.clone(),
            FilterTarget::WorkloadAnnotation(name) => format!("{}{}", WORKLOAD_FILTER_PREFIX, name),
        }
    }
}
