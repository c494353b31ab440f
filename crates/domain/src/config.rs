use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The top-level provider-config YAML document (spec §4.1, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersDocument {
    pub providers: HashMap<String, ProviderRecord>,
}

/// One `providers[name]` record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRecord {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub token_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_config_path: Option<String>,
}

/// The search-mode configuration document: a separate YAML from the
/// provider config, resolved via `ProviderRecord::search_config_path`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfigDocument {
    pub search_modes: Vec<SearchModeConfig>,
    pub search: SearchSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    pub default_mode: String,
    #[serde(default)]
    pub hybrid_weights: HashMap<String, f64>,
}

/// One `search_modes[]` entry. `similarity_threshold` here is the
/// mode-record value; `options.similarity_threshold` is the nested,
/// advisory duplicate — the mode-record value always wins (spec §9,
/// open question 3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchModeConfig {
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_threshold: Option<f64>,
    #[serde(default)]
    pub options: ModeOptions,
}

fn default_enabled() -> bool {
    true
}

fn default_weight() -> f64 {
    1.0
}

/// Mode-specific options. Regex and semantic modes each read only the
/// fields relevant to them; both live in one flat struct because the
/// YAML shape is per-entry, not per-type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModeOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_case: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dot_all: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unicode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pattern_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_metric: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_threshold: Option<f64>,
}

impl SearchModeConfig {
    /// Resolves the similarity-threshold precedence rule: the
    /// mode-record field wins over the nested `options` duplicate;
    /// falls back to a conservative default if neither is set.
    pub fn effective_similarity_threshold(&self) -> f64 {
        self.similarity_threshold
            .or(self.options.similarity_threshold)
            .unwrap_or(0.6)
    }
}

impl SearchConfigDocument {
    pub fn mode(&self, name: &str) -> Option<&SearchModeConfig> {
        self.search_modes.iter().find(|m| m.name == name)
    }

    pub fn is_mode_enabled(&self, name: &str) -> bool {
        self.mode(name).map(|m| m.enabled).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_record_threshold_wins_over_nested_options() {
        let m = SearchModeConfig {
            name: "semantic".into(),
            enabled: true,
            weight: 1.0,
            similarity_threshold: Some(0.6),
            options: ModeOptions {
                similarity_threshold: Some(0.9),
                ..Default::default()
            },
        };
        assert_eq!(m.effective_similarity_threshold(), 0.6);
    }

    #[test]
    fn falls_back_to_nested_options_when_mode_record_unset() {
        let m = SearchModeConfig {
            name: "semantic".into(),
            enabled: true,
            weight: 1.0,
            similarity_threshold: None,
            options: ModeOptions {
                similarity_threshold: Some(0.75),
                ..Default::default()
            },
        };
        assert_eq!(m.effective_similarity_threshold(), 0.75);
    }

    #[test]
    fn parses_full_search_config_document() {
        let yaml = r#"
search_modes:
  - name: exact
    enabled: true
    weight: 1.0
  - name: semantic
    enabled: true
    weight: 1.2
    similarity_threshold: 0.6
    options:
      model_name: all-MiniLM-L6-v2
      cache_size: 1000
      similarity_metric: cosine
search:
  default_mode: regex
  hybrid_weights:
    exact: 0.3
    regex: 0.3
    semantic: 0.4
"#;
        let doc: SearchConfigDocument = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(doc.search.default_mode, "regex");
        assert!(doc.is_mode_enabled("semantic"));
        assert_eq!(doc.mode("semantic").unwrap().effective_similarity_threshold(), 0.6);
    }
}
