//! Membership tests and toggles over an [`ActiveFilterSet`].

use sieve_core::{FilterTarget, FilterValue};

use crate::active::{ActiveFilterSet, FilterTerm};

fn selects(term: &FilterTerm, needle: &str, exact: bool) -> bool {
    !term.negated && term.exact == exact && term.value.eq_ignore_ascii_case(needle)
}

/// True when `key` holds a non-negated term for `value` written in the given
/// mode (`=value` for exact, plain `value` otherwise). Text is compared
/// ignoring ASCII case.
pub fn is_filter_active(active: &ActiveFilterSet, key: &str, value: &FilterValue, exact: bool) -> bool {
    let needle = value.to_string();
    active.get(key).map(|terms| terms.iter().any(|t| selects(t, &needle, exact))).unwrap_or(false)
}

/// Remove `(key, value)` when active, add it otherwise. Returns a new set.
/// A re-added term takes the casing of `value`.
pub fn toggle_filter(active: &ActiveFilterSet, key: &str, value: &FilterValue, exact: bool) -> ActiveFilterSet {
    let needle = value.to_string();
    let mut next = active.clone();
    if !next.remove_term(key, |t| selects(t, &needle, exact)) {
        let term = FilterTerm { value: needle, exact, negated: false };
        next.push_term(key, term);
    }
    next
}

/// Like [`is_filter_active`], but workload targets only check key presence.
pub fn is_target_active(active: &ActiveFilterSet, target: &FilterTarget, value: &FilterValue, exact: bool) -> bool {
    match target {
        FilterTarget::Static(key) => is_filter_active(active, key, value, exact),
        FilterTarget::WorkloadAnnotation(_) => active.contains_key(&target.key()),
    }
}

/// Toggle a target. Static targets behave like [`toggle_filter`].
///
/// Workload targets ignore `value` and `exact`: a present `workload-<name>`
/// key is removed whatever it holds, an absent one is added with the
/// empty-string sentinel, meaning "any item carrying this annotation".
pub fn toggle_target(active: &ActiveFilterSet, target: &FilterTarget, value: &FilterValue, exact: bool) -> ActiveFilterSet {
    match target {
        FilterTarget::Static(key) => toggle_filter(active, key, value, exact),
        FilterTarget::WorkloadAnnotation(_) => {
            let key = target.key();
            if active.contains_key(&key) {
                active.without_key(&key)
            } else {
                let mut next = active.clone();
                next.push_term(&key, FilterTerm::sentinel());
                next
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{parse, serialize};

    fn v(s: &str) -> FilterValue { FilterValue::from(s) }

    #[test]
    fn exact_and_loose_modes_are_distinct() {
        let s = parse(Some("os:(=ubuntu,cent)"));
        assert!(is_filter_active(&s, "os", &v("ubuntu"), true));
        assert!(is_filter_active(&s, "os", &v("UBUNTU"), true));
        assert!(!is_filter_active(&s, "os", &v("ubuntu"), false));
        assert!(is_filter_active(&s, "os", &v("cent"), false));
        assert!(!is_filter_active(&s, "os", &v("cent"), true));
        assert!(!is_filter_active(&s, "zone", &v("ubuntu"), true));
    }

    #[test]
    fn negated_terms_are_not_active() {
        let s = parse(Some("os:(!=ubuntu)"));
        assert!(!is_filter_active(&s, "os", &v("ubuntu"), true));
        let next = toggle_filter(&s, "os", &v("ubuntu"), true);
        assert_eq!(serialize(&next), "os:(!=ubuntu,=ubuntu)");
    }

    #[test]
    fn toggle_adds_then_removes() {
        let empty = ActiveFilterSet::new();
        let on = toggle_filter(&empty, "os", &v("ubuntu"), true);
        assert_eq!(serialize(&on), "os:(=ubuntu)");
        assert!(empty.is_empty(), "input is untouched");
        let off = toggle_filter(&on, "os", &v("ubuntu"), true);
        assert!(off.is_empty(), "emptied key is dropped");
    }

    #[test]
    fn toggle_is_self_inverse() {
        let base = parse(Some("os:(=a,=b) zone:(=z1) web"));
        for (key, value) in [("os", "a"), ("os", "b"), ("os", "c"), ("zone", "z1"), ("pool", "p")] {
            let twice = toggle_filter(&toggle_filter(&base, key, &v(value), true), key, &v(value), true);
            assert!(twice.is_equivalent(&base), "{}={}", key, value);
        }
        // Adding then removing restores the exact sequence.
        let twice = toggle_filter(&toggle_filter(&base, "os", &v("c"), true), "os", &v("c"), true);
        assert_eq!(twice, base);
    }

    #[test]
    fn non_text_values_use_display_form() {
        let s = toggle_filter(&ActiveFilterSet::new(), "numa_nodes_count", &FilterValue::Int(0), true);
        assert_eq!(serialize(&s), "numa_nodes_count:(=0)");
        assert!(is_filter_active(&s, "numa_nodes_count", &FilterValue::Int(0), true));
        let s = toggle_filter(&s, "sriov_support", &FilterValue::Bool(false), true);
        assert_eq!(serialize(&s), "numa_nodes_count:(=0) sriov_support:(=false)");
    }

    #[test]
    fn workload_toggle_adds_sentinel_and_removes_whole_key() {
        let gpu = FilterTarget::WorkloadAnnotation("gpu".into());
        let on = toggle_target(&ActiveFilterSet::new(), &gpu, &v("gpu"), true);
        assert_eq!(on.get("workload-gpu").unwrap(), &[FilterTerm::sentinel()]);
        assert_eq!(serialize(&on), "workload-gpu:()");
        assert!(is_target_active(&on, &gpu, &v("gpu"), true));

        let off = toggle_target(&on, &gpu, &v("gpu"), true);
        assert!(off.is_empty());

        let specific = parse(Some("workload-gpu:(a100,h100) os:(=x)"));
        let off = toggle_target(&specific, &gpu, &v("gpu"), true);
        assert_eq!(serialize(&off), "os:(=x)");
    }

    #[test]
    fn exact_empty_toggle_survives_the_codec() {
        let on = toggle_filter(&ActiveFilterSet::new(), "owner", &v(""), true);
        assert_eq!(serialize(&on), "owner:(=)");
        assert_eq!(parse(Some(&serialize(&on))), on);
        assert!(is_filter_active(&parse(Some("owner:(=)")), "owner", &v(""), true));
    }

    #[test]
    fn case_change_on_re_add_is_still_equivalent() {
        let base = parse(Some("status:(=Deployed)"));
        let off = toggle_filter(&base, "status", &v("deployed"), true);
        assert!(off.is_empty());
        let twice = toggle_filter(&off, "status", &v("deployed"), true);
        assert_eq!(serialize(&twice), "status:(=deployed)");
        assert!(twice.is_equivalent(&base));
        assert!(!twice.is_equivalent(&parse(Some("status:(deployed)"))));
    }

    #[test]
    fn static_target_delegates() {
        let t = FilterTarget::Static("os".into());
        let on = toggle_target(&ActiveFilterSet::new(), &t, &v("x"), true);
        assert!(is_target_active(&on, &t, &v("x"), true));
        assert_eq!(on, toggle_filter(&ActiveFilterSet::new(), "os", &v("x"), true));
    }
}
