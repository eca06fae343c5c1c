//! Built-in filter attributes and a JSON extractor for inventory records.
//!
//! This module provides:
//! - Stable filter keys + display titles, in sidebar order, per record kind
//! - A JSON extractor that resolves those keys through JSON pointers

use std::collections::HashMap;

use crate::{Extracted, Extractor, FilterKey, FilterValue, WORKLOAD_FACET_KEY, WORKLOAD_FILTER_PREFIX};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeSpec {
    pub key: &'static str,
    pub title: &'static str,
    /// JSON pointer into the record.
    pub pointer: &'static str,
}

fn attr(key: &'static str, title: &'static str, pointer: &'static str) -> AttributeSpec {
    AttributeSpec { key, title, pointer }
}

/// Record kinds with an opinionated attribute set.
pub const BUILTIN_KINDS: &[&str] = &["machines", "controllers", "devices"];

/// Return the filter attributes for a built-in kind, in display order.
/// Unknown kinds get an empty set.
pub fn builtin_attributes_for(kind: &str) -> Vec<AttributeSpec> {
    match kind {
        "machines" => vec![
            attr("status", "Status", "/status"),
            attr("owner", "Owner", "/owner"),
            attr("pool", "Resource pool", "/pool/name"),
            attr("architecture", "Architecture", "/architecture"),
            attr("release", "OS/Release", "/osystem"),
            attr("tags", "Tags", "/tags"),
            attr("storage_tags", "Storage tags", "/storage_tags"),
            attr("pod", "KVM", "/pod/name"),
            attr("subnets", "Subnet", "/subnets"),
            attr("fabrics", "Fabric", "/fabrics"),
            attr("zone", "Zone", "/zone/name"),
            attr("numa_nodes_count", "NUMA nodes", "/numa_nodes_count"),
            attr("sriov_support", "SR-IOV support", "/sriov_support"),
            attr("link_speeds", "Link speed", "/link_speeds"),
            attr(WORKLOAD_FACET_KEY, "Workload", "/workload_annotations"),
        ],
        "controllers" => vec![
            attr("node_type_display", "Type", "/node_type_display"),
            attr("version", "Version", "/version"),
            attr("status", "Status", "/status"),
            attr("zone", "Zone", "/zone/name"),
            attr("tags", "Tags", "/tags"),
        ],
        "devices" => vec![
            attr("owner", "Owner", "/owner"),
            attr("zone", "Zone", "/zone/name"),
            attr("domain", "Domain", "/domain/name"),
            attr("ip_assignment", "IP assignment", "/ip_assignment"),
            attr("tags", "Tags", "/tags"),
        ],
        _ => Vec::new(),
    }
}

/// Default free-text fields per kind.
pub fn builtin_text_fields_for(kind: &str) -> Vec<&'static str> {
    match kind {
        "machines" | "controllers" | "devices" => vec!["/hostname", "/fqdn", "/system_id"],
        _ => vec!["/hostname"],
    }
}

/// Extractor for `serde_json::Value` records driven by JSON pointers.
///
/// Keys without a configured pointer fall back to `/<key>`. Workload keys
/// (`workload-<name>`) resolve below the workload annotations object.
#[derive(Debug, Clone, Default)]
pub struct JsonExtractor {
    pointers: HashMap<FilterKey, String>,
    text_fields: Vec<String>,
}

impl JsonExtractor {
    pub fn new(pointers: HashMap<FilterKey, String>, text_fields: Vec<String>) -> Self {
        Self { pointers, text_fields }
    }

    pub fn builtin(kind: &str) -> Self {
        let pointers = builtin_attributes_for(kind)
            .into_iter()
            .map(|a| (a.key.to_string(), a.pointer.to_string()))
            .collect();
        let text_fields = builtin_text_fields_for(kind).into_iter().map(str::to_string).collect();
        Self { pointers, text_fields }
    }

    pub fn pointer_for(&self, key: &str) -> String {
        if let Some(p) = self.pointers.get(key) { return p.clone(); }
        if let Some(name) = key.strip_prefix(WORKLOAD_FILTER_PREFIX) {
            let base = self.pointers.get(WORKLOAD_FACET_KEY).map(String::as_str).unwrap_or("/workload_annotations");
            return format!("{}/{}", base, escape_pointer_token(name));
        }
        format!("/{}", escape_pointer_token(key))
    }
}

fn escape_pointer_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}

impl Extractor<serde_json::Value> for JsonExtractor {
    fn extract(&self, item: &serde_json::Value, key: &str) -> Extracted {
        let ptr = self.pointer_for(key);
        let raw = item.pointer(&ptr);
        // The workload facet lists annotation names, which are object keys.
        if key == WORKLOAD_FACET_KEY {
            if let Some(obj) = raw.and_then(|v| v.as_object()) {
                let names: Vec<FilterValue> = obj.keys().map(|k| FilterValue::Text(k.clone())).collect();
                return if names.is_empty() { Extracted::Missing } else { Extracted::Many(names) };
            }
        }
        Extracted::from_json(raw)
    }

    /// Workload annotations exist as soon as their name is present, whatever the value.
    fn has(&self, item: &serde_json::Value, key: &str) -> bool {
        let is_workload = key.starts_with(WORKLOAD_FILTER_PREFIX) && !self.pointers.contains_key(key);
        if is_workload {
            return item.pointer(&self.pointer_for(key)).is_some();
        }
        !self.extract(item, key).into_values().is_empty()
    }

    fn text(&self, item: &serde_json::Value) -> Option<String> {
        let parts: Vec<String> = self
            .text_fields
            .iter()
            .filter_map(|p| item.pointer(p))
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect();
        if parts.is_empty() { None } else { Some(parts.join(" ")) }
    }
}
