//! Apply an active filter set to items.

use std::time::Instant;

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use sieve_core::Extractor;
use smallvec::SmallVec;
use tracing::debug;

use crate::active::{ActiveFilterSet, FilterTerm};

/// Evaluates one active filter set against many items.
///
/// Keys are AND-ed. Within a key an item must hit no negated term and, if the
/// key has positive terms, at least one of them. Exact terms compare whole
/// values, loose terms look for a substring; both ignore ASCII case. The
/// empty sentinel matches any item with a usable value for the key.
pub struct FilterMatcher<'a> {
    active: &'a ActiveFilterSet,
    fuzzy: SkimMatcherV2,
    free_q: String,
}

impl<'a> FilterMatcher<'a> {
    pub fn new(active: &'a ActiveFilterSet) -> Self {
        Self { active, fuzzy: SkimMatcherV2::default(), free_q: active.free_text().join(" ") }
    }

    pub fn matches<I, E>(&self, item: &I, extractor: &E) -> bool
    where
        E: Extractor<I> + ?Sized,
    {
        for (key, terms) in self.active.iter() {
            let rendered: SmallVec<[String; 4]> =
                extractor.extract(item, key).into_values().iter().map(|v| v.to_string()).collect();
            let present = if terms.iter().any(FilterTerm::is_sentinel) {
                extractor.has(item, key)
            } else {
                !rendered.is_empty()
            };
            if !key_matches(&rendered, present, terms) { return false; }
        }
        if self.free_q.is_empty() { return true; }
        match extractor.text(item) {
            Some(text) => self.fuzzy.fuzzy_match(&text, &self.free_q).is_some(),
            None => false,
        }
    }
}

fn term_hits(term: &FilterTerm, rendered: &[String], present: bool) -> bool {
    if term.is_sentinel() { return present; }
    if term.exact {
        rendered.iter().any(|v| v.eq_ignore_ascii_case(&term.value))
    } else {
        let needle = term.value.to_ascii_lowercase();
        rendered.iter().any(|v| v.to_ascii_lowercase().contains(&needle))
    }
}

fn key_matches(rendered: &[String], present: bool, terms: &[FilterTerm]) -> bool {
    let mut has_positive = false;
    let mut positive_hit = false;
    for t in terms {
        let hit = term_hits(t, rendered, present);
        if t.negated {
            if hit { return false; }
        } else {
            has_positive = true;
            positive_hit |= hit;
        }
    }
    !has_positive || positive_hit
}

/// Whether a single item passes `active`.
pub fn matches<I, E>(item: &I, active: &ActiveFilterSet, extractor: &E) -> bool
where
    E: Extractor<I> + ?Sized,
{
    FilterMatcher::new(active).matches(item, extractor)
}

/// Items passing `active`, in input order.
pub fn filter_items<'i, I, E>(items: &'i [I], active: &ActiveFilterSet, extractor: &E) -> Vec<&'i I>
where
    E: Extractor<I> + ?Sized,
{
    let started = Instant::now();
    let matcher = FilterMatcher::new(active);
    let out: Vec<&I> = items.iter().filter(|it| matcher.matches(*it, extractor)).collect();
    debug!(total = items.len(), matched = out.len(), keys = active.len(), "filter evaluated");
    metrics::histogram!("filter_eval_ms", started.elapsed().as_secs_f64() * 1_000.0);
    out
}
