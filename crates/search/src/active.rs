//! The active filter set: selected terms per key plus free-text terms.

use std::fmt;

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use sieve_core::FilterKey;
use smallvec::SmallVec;

pub type Terms = SmallVec<[FilterTerm; 4]>;

/// One selected value in its textual form.
///
/// `exact` terms are written `=value`, negated ones `!value` (`!=value` when both).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterTerm {
    pub value: String,
    pub exact: bool,
    pub negated: bool,
}

impl FilterTerm {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into(), exact: false, negated: false }
    }

    pub fn exact(value: impl Into<String>) -> Self {
        Self { value: value.into(), exact: true, negated: false }
    }

    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    /// The "annotation exists" term used by workload filters.
    pub fn sentinel() -> Self { Self::new("") }

    /// Empty non-exact terms test existence; negated, they test absence.
    /// An exact empty term is an ordinary value.
    pub fn is_sentinel(&self) -> bool { self.value.is_empty() && !self.exact }

    /// Same flags and same text ignoring ASCII case.
    pub fn same_as(&self, other: &FilterTerm) -> bool {
        self.exact == other.exact && self.negated == other.negated && self.value.eq_ignore_ascii_case(&other.value)
    }
}

impl fmt::Display for FilterTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated { f.write_str("!")?; }
        if self.exact { f.write_str("=")?; }
        f.write_str(&self.value)
    }
}

impl Serialize for FilterTerm {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> { s.collect_str(self) }
}

/// Insertion-ordered mapping from key to selected terms, plus free-text terms.
///
/// Every public operation returns a new set; the crate mutates only sets it
/// has just cloned or built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveFilterSet {
    entries: Vec<(FilterKey, Terms)>,
    free_text: Vec<String>,
}

impl ActiveFilterSet {
    pub fn new() -> Self { Self::default() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() && self.free_text.is_empty() }

    /// Number of keys with at least one term.
    pub fn len(&self) -> usize { self.entries.len() }

    pub fn contains_key(&self, key: &str) -> bool { self.entries.iter().any(|(k, _)| k == key) }

    pub fn get(&self, key: &str) -> Option<&[FilterTerm]> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, t)| t.as_slice())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> { self.entries.iter().map(|(k, _)| k.as_str()) }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FilterTerm])> {
        self.entries.iter().map(|(k, t)| (k.as_str(), t.as_slice()))
    }

    pub fn free_text(&self) -> &[String] { &self.free_text }

    pub fn with_term(mut self, key: &str, term: FilterTerm) -> Self {
        self.push_term(key, term);
        self
    }

    pub fn with_free_text(mut self, text: &str) -> Self {
        self.push_free_text(text);
        self
    }

    /// Copy of this set without `key`.
    pub fn without_key(&self, key: &str) -> Self {
        let mut next = self.clone();
        next.entries.retain(|(k, _)| k != key);
        next
    }

    /// Order-insensitive comparison: same keys, same term sets (ignoring ASCII
    /// case), same free text.
    pub fn is_equivalent(&self, other: &ActiveFilterSet) -> bool {
        if self.entries.len() != other.entries.len() { return false; }
        let terms_match = self.entries.iter().all(|(k, terms)| match other.get(k) {
            Some(theirs) => terms.len() == theirs.len() && terms.iter().all(|t| theirs.iter().any(|o| o.same_as(t))),
            None => false,
        });
        let mut a = self.free_text.clone();
        let mut b = other.free_text.clone();
        a.sort();
        b.sort();
        terms_match && a == b
    }

    /// Append a term, creating the key on first use. Duplicates (ignoring
    /// ASCII case) are skipped.
    pub(crate) fn push_term(&mut self, key: &str, term: FilterTerm) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, terms)) => {
                if !terms.iter().any(|t| t.same_as(&term)) { terms.push(term); }
            }
            None => {
                let mut terms = Terms::new();
                terms.push(term);
                self.entries.push((key.to_string(), terms));
            }
        }
    }

    /// Remove the first term matching `pred`; drop the key once it is empty.
    pub(crate) fn remove_term(&mut self, key: &str, pred: impl Fn(&FilterTerm) -> bool) -> bool {
        let Some(pos) = self.entries.iter().position(|(k, _)| k == key) else { return false };
        let terms = &mut self.entries[pos].1;
        let Some(i) = terms.iter().position(|t| pred(t)) else { return false };
        terms.remove(i);
        if terms.is_empty() { self.entries.remove(pos); }
        true
    }

    pub(crate) fn push_free_text(&mut self, text: &str) {
        if !text.is_empty() && !self.free_text.iter().any(|t| t == text) {
            self.free_text.push(text.to_string());
        }
    }
}

struct OrderedEntries<'a>(&'a [(FilterKey, Terms)]);

impl Serialize for OrderedEntries<'_> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(Some(self.0.len()))?;
        for (k, terms) in self.0.iter() { map.serialize_entry(k, terms.as_slice())?; }
        map.end()
    }
}

impl Serialize for ActiveFilterSet {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let mut st = s.serialize_struct("ActiveFilterSet", 2)?;
        st.serialize_field("filters", &OrderedEntries(&self.entries))?;
        st.serialize_field("free_text", &self.free_text)?;
        st.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_dedupes_ignoring_case_and_keeps_order() {
        let s = ActiveFilterSet::new()
            .with_term("os", FilterTerm::exact("Ubuntu"))
            .with_term("zone", FilterTerm::new("z1"))
            .with_term("os", FilterTerm::exact("ubuntu"))
            .with_term("os", FilterTerm::new("ubuntu"));
        assert_eq!(s.keys().collect::<Vec<_>>(), vec!["os", "zone"]);
        assert_eq!(s.get("os").map(|t| t.len()), Some(2));
        assert_eq!(s.get("os").map(|t| t[0].value.as_str()), Some("Ubuntu"));
    }

    #[test]
    fn removing_last_term_drops_key() {
        let mut s = ActiveFilterSet::new().with_term("os", FilterTerm::new("a"));
        assert!(s.remove_term("os", |t| t.value == "a"));
        assert!(!s.contains_key("os"));
        assert!(!s.remove_term("os", |_| true));
        assert!(s.is_empty());
    }

    #[test]
    fn equivalence_ignores_order() {
        let a = ActiveFilterSet::new()
            .with_term("os", FilterTerm::new("a"))
            .with_term("os", FilterTerm::new("b"))
            .with_term("zone", FilterTerm::new("z"));
        let b = ActiveFilterSet::new()
            .with_term("zone", FilterTerm::new("z"))
            .with_term("os", FilterTerm::new("b"))
            .with_term("os", FilterTerm::new("a"));
        assert_ne!(a, b);
        assert!(a.is_equivalent(&b));
        assert!(!a.is_equivalent(&b.without_key("zone")));
    }

    #[test]
    fn terms_render_with_prefixes() {
        assert_eq!(FilterTerm::exact("x").negate().to_string(), "!=x");
        assert_eq!(FilterTerm::new("x").to_string(), "x");
        let s = ActiveFilterSet::new().with_term("os", FilterTerm::exact("x")).with_free_text("web");
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v, serde_json::json!({"filters": {"os": ["=x"]}, "free_text": ["web"]}));
    }
}
