use serde_json::json;
use sieve_core::config::SieveConfig;
use sieve_core::FilterValue;
use sieve_search::{filter_items, parse, FilterAccordion};

fn machines() -> Vec<serde_json::Value> {
    vec![
        json!({"hostname": "a1", "status": "Deployed", "zone": {"name": "east"}, "numa_nodes_count": 0, "workload_annotations": {"gpu": "a100"}}),
        json!({"hostname": "a2", "status": "Deployed", "zone": {"name": "west"}, "numa_nodes_count": 2}),
        json!({"hostname": "b1", "status": "Ready", "zone": {"name": "east"}, "numa_nodes_count": 2, "workload_annotations": {"gpu": "h100"}}),
        json!({"hostname": "b2", "status": "New", "zone": {"name": "west"}}),
    ]
}

fn hostnames(items: &[&serde_json::Value]) -> Vec<String> {
    items.iter().filter_map(|v| v["hostname"].as_str().map(str::to_string)).collect()
}

#[test]
fn clicking_through_the_sidebar_narrows_the_list() {
    let kind = SieveConfig::default().resolve("machines").unwrap();
    let items = machines();

    // Click "east" in the zone section.
    let acc = FilterAccordion::for_kind(&kind, None);
    let filter = acc.next_filter_string("zone", &"east".into());
    assert_eq!(filter, "zone:(=east)");
    let shown = filter_items(&items, &parse(Some(&filter)), &kind.extractor);
    assert_eq!(hostnames(&shown), vec!["a1", "b1"]);

    // Then the gpu workload annotation.
    let acc = FilterAccordion::for_kind(&kind, Some(&filter));
    let filter = acc.next_filter_string("workload_annotations", &"gpu".into());
    assert_eq!(filter, "zone:(=east) workload-gpu:()");
    let shown = filter_items(&items, &parse(Some(&filter)), &kind.extractor);
    assert_eq!(hostnames(&shown), vec!["a1", "b1"]);

    // Then NUMA node count zero, a valid value.
    let acc = FilterAccordion::for_kind(&kind, Some(&filter));
    let filter = acc.next_filter_string("numa_nodes_count", &FilterValue::Int(0));
    let shown = filter_items(&items, &parse(Some(&filter)), &kind.extractor);
    assert_eq!(hostnames(&shown), vec!["a1"]);

    // The sidebar reflects every active choice.
    let acc = FilterAccordion::for_kind(&kind, Some(&filter));
    let sections = acc.sections(&items, &kind.extractor);
    let active: Vec<(String, String)> = sections
        .iter()
        .flat_map(|s| s.entries.iter().filter(|e| e.active).map(move |e| (s.key.clone(), e.value.to_string())))
        .collect();
    assert_eq!(
        active,
        vec![
            ("zone".to_string(), "east".to_string()),
            ("numa_nodes_count".to_string(), "0".to_string()),
            ("workload_annotations".to_string(), "gpu".to_string()),
        ]
    );

    // Unclicking zone keeps the rest.
    let filter = acc.next_filter_string("zone", &"east".into());
    assert_eq!(filter, "workload-gpu:() numa_nodes_count:(=0)");
}

#[test]
fn hand_edited_filter_with_typos_still_renders() {
    let kind = SieveConfig::default().resolve("machines").unwrap();
    let acc = FilterAccordion::for_kind(&kind, Some("status:(=Deployed zone:(=east"));
    assert!(acc.current_filters().is_empty());
    let sections = acc.sections(&machines(), &kind.extractor);
    assert!(sections.iter().flat_map(|s| s.entries.iter()).all(|e| !e.active));
    assert_eq!(sections[0].key, "status");
}
