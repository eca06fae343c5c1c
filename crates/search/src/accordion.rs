//! Filter sidebar state: facet sections with active flags, and the filter
//! string that results from clicking a value.

use std::collections::HashMap;

use serde::Serialize;
use sieve_core::config::ResolvedKind;
use sieve_core::{Extractor, FilterKey, FilterTarget, FilterValue};
use tracing::debug;

use crate::active::ActiveFilterSet;
use crate::codec::{parse, serialize};
use crate::facets::{compute_facets, order_sections};
use crate::toggle::{is_target_active, toggle_target};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccordionEntry {
    pub value: FilterValue,
    pub count: usize,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccordionSection {
    pub key: FilterKey,
    pub title: Option<String>,
    pub entries: Vec<AccordionEntry>,
}

#[derive(Debug, Clone)]
pub struct FilterAccordion {
    filter_order: Vec<FilterKey>,
    filter_names: HashMap<FilterKey, String>,
    current: ActiveFilterSet,
}

impl FilterAccordion {
    pub fn new(filter_order: Vec<FilterKey>, filter_names: HashMap<FilterKey, String>, filter_string: Option<&str>) -> Self {
        Self { filter_order, filter_names, current: parse(filter_string) }
    }

    pub fn for_kind(kind: &ResolvedKind, filter_string: Option<&str>) -> Self {
        Self::new(kind.filter_order.clone(), kind.filter_names.clone(), filter_string)
    }

    pub fn current_filters(&self) -> &ActiveFilterSet { &self.current }

    pub fn filter_order(&self) -> &[FilterKey] { &self.filter_order }

    /// Exact-mode membership, or key presence for workload facets.
    pub fn is_active(&self, key: &str, value: &FilterValue) -> bool {
        is_target_active(&self.current, &FilterTarget::for_facet(key, value), value, true)
    }

    pub fn sections<I, E>(&self, items: &[I], extractor: &E) -> Vec<AccordionSection>
    where
        E: Extractor<I> + ?Sized,
    {
        let facets = compute_facets(items, &self.filter_order, extractor);
        order_sections(&facets, &self.filter_order, &self.filter_names)
            .into_iter()
            .map(|s| {
                let entries = s
                    .values
                    .into_iter()
                    .map(|(value, count)| {
                        let active = self.is_active(&s.key, &value);
                        AccordionEntry { value, count, active }
                    })
                    .collect();
                AccordionSection { key: s.key, title: s.title, entries }
            })
            .collect()
    }

    /// Filter string after clicking `value` in the `key` section.
    pub fn next_filter_string(&self, key: &str, value: &FilterValue) -> String {
        let target = FilterTarget::for_facet(key, value);
        let next = toggle_target(&self.current, &target, value, true);
        let out = serialize(&next);
        debug!(key = %key, value = %value, filter = %out, "filter toggled");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sieve_core::attributes::JsonExtractor;
    use sieve_core::config::SieveConfig;

    fn items() -> Vec<serde_json::Value> {
        vec![
            json!({"status": "Deployed", "tags": ["gpu"], "workload_annotations": {"team": "ml"}}),
            json!({"status": "Deployed", "tags": ["gpu", "virtual"]}),
            json!({"status": "Ready", "workload_annotations": {"team": "ops", "env": "prod"}}),
        ]
    }

    #[test]
    fn sections_mark_active_values() {
        let kind = SieveConfig::default().resolve("machines").unwrap();
        let acc = FilterAccordion::for_kind(&kind, Some("status:(=Deployed) workload-env:()"));
        let sections = acc.sections(&items(), &kind.extractor);
        let keys: Vec<&str> = sections.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["status", "tags", "workload_annotations"]);

        let status = &sections[0];
        assert_eq!(status.title.as_deref(), Some("Status"));
        assert_eq!(
            status.entries,
            vec![
                AccordionEntry { value: "Deployed".into(), count: 2, active: true },
                AccordionEntry { value: "Ready".into(), count: 1, active: false },
            ]
        );
        let workload: Vec<(String, usize, bool)> =
            sections[2].entries.iter().map(|e| (e.value.to_string(), e.count, e.active)).collect();
        assert_eq!(workload, vec![("env".into(), 1, true), ("team".into(), 2, false)]);
    }

    #[test]
    fn clicking_values_updates_the_filter_string() {
        let acc = FilterAccordion::new(vec!["status".into()], HashMap::new(), Some("status:(=Deployed)"));
        assert_eq!(acc.next_filter_string("status", &"Ready".into()), "status:(=Deployed,=Ready)");
        assert_eq!(acc.next_filter_string("status", &"deployed".into()), "");
        assert_eq!(acc.next_filter_string("workload_annotations", &"gpu".into()), "status:(=Deployed) workload-gpu:()");
    }

    #[test]
    fn clicking_a_workload_twice_clears_it() {
        let acc = FilterAccordion::new(Vec::new(), HashMap::new(), None);
        let on = acc.next_filter_string("workload_annotations", &"gpu".into());
        assert_eq!(on, "workload-gpu:()");
        let acc = FilterAccordion::new(Vec::new(), HashMap::new(), Some(&on));
        assert_eq!(acc.next_filter_string("workload_annotations", &"gpu".into()), "");
    }

    #[test]
    fn workload_click_matches_what_the_facet_counted() {
        let kind = SieveConfig::default().resolve("machines").unwrap();
        let items = vec![
            json!({"hostname": "a", "workload_annotations": {"gpu": ""}}),
            json!({"hostname": "b", "workload_annotations": {"gpu": "a100"}}),
            json!({"hostname": "c"}),
        ];
        let acc = FilterAccordion::for_kind(&kind, None);
        let sections = acc.sections(&items, &kind.extractor);
        let gpu = sections
            .iter()
            .find(|s| s.key == "workload_annotations")
            .and_then(|s| s.entries.iter().find(|e| e.value == FilterValue::from("gpu")))
            .map(|e| e.count);
        assert_eq!(gpu, Some(2));

        let next = acc.next_filter_string("workload_annotations", &"gpu".into());
        let shown = crate::filter_items(&items, &crate::parse(Some(&next)), &kind.extractor);
        assert_eq!(shown.len(), 2);
    }

    #[test]
    fn no_items_no_sections() {
        let acc = FilterAccordion::new(vec!["status".into()], HashMap::new(), None);
        let empty: Vec<serde_json::Value> = Vec::new();
        assert!(acc.sections(&empty, &JsonExtractor::default()).is_empty());
    }
}
