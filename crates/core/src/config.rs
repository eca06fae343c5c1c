//! Per-kind filter configuration: order, titles, JSON pointers, text fields.
//! Built-in presets apply unless a config file overrides them.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::attributes::{builtin_attributes_for, builtin_text_fields_for, JsonExtractor, BUILTIN_KINDS};
use crate::FilterKey;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error("parsing yaml config {path}: {source}")]
    Yaml { path: String, #[source] source: serde_yaml::Error },
    #[error("parsing json config {path}: {source}")]
    Json { path: String, #[source] source: serde_json::Error },
    #[error("unknown kind: {0} (known: {1})")]
    UnknownKind(String, String),
}

/// Overrides for one record kind. Unset fields keep the built-in preset.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct KindConfig {
    pub order: Option<Vec<FilterKey>>,
    pub names: HashMap<FilterKey, String>,
    pub paths: HashMap<FilterKey, String>,
    pub text: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SieveConfig {
    pub kinds: HashMap<String, KindConfig>,
}

/// Effective settings for one kind after merging overrides onto presets.
#[derive(Debug, Clone)]
pub struct ResolvedKind {
    pub kind: String,
    pub filter_order: Vec<FilterKey>,
    pub filter_names: HashMap<FilterKey, String>,
    pub extractor: JsonExtractor,
}

impl SieveConfig {
    /// Load from YAML, or JSON when the file ends in `.json`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let shown = path.display().to_string();
        let body = std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: shown.clone(), source })?;
        let is_json = path.extension().map(|e| e.eq_ignore_ascii_case("json")).unwrap_or(false);
        if is_json {
            serde_json::from_str(&body).map_err(|source| ConfigError::Json { path: shown, source })
        } else {
            serde_yaml::from_str(&body).map_err(|source| ConfigError::Yaml { path: shown, source })
        }
    }

    /// Load from `SIEVE_CONFIG` when set, otherwise the empty config.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os("SIEVE_CONFIG") {
            Some(p) => Self::load(Path::new(&p)),
            None => Ok(Self::default()),
        }
    }

    pub fn resolve(&self, kind: &str) -> Result<ResolvedKind, ConfigError> {
        let over = self.kinds.get(kind);
        let builtin = builtin_attributes_for(kind);
        if builtin.is_empty() && over.is_none() {
            let mut known: Vec<&str> = BUILTIN_KINDS.to_vec();
            known.extend(self.kinds.keys().map(String::as_str));
            return Err(ConfigError::UnknownKind(kind.to_string(), known.join(", ")));
        }

        let mut filter_order: Vec<FilterKey> = builtin.iter().map(|a| a.key.to_string()).collect();
        let mut filter_names: HashMap<FilterKey, String> =
            builtin.iter().map(|a| (a.key.to_string(), a.title.to_string())).collect();
        let mut pointers: HashMap<FilterKey, String> =
            builtin.iter().map(|a| (a.key.to_string(), a.pointer.to_string())).collect();
        let mut text: Vec<String> = builtin_text_fields_for(kind).into_iter().map(str::to_string).collect();

        if let Some(o) = over {
            if let Some(order) = &o.order { filter_order = order.clone(); }
            filter_names.extend(o.names.iter().map(|(k, v)| (k.clone(), v.clone())));
            pointers.extend(o.paths.iter().map(|(k, v)| (k.clone(), v.clone())));
            if let Some(t) = &o.text { text = t.clone(); }
        }

        Ok(ResolvedKind {
            kind: kind.to_string(),
            filter_order,
            filter_names,
            extractor: JsonExtractor::new(pointers, text),
        })
    }
}
