use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool's declared parameter: name, type, optionality, default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Describes one registered tool: its name, owning provider, and
/// parameter schema. The callable itself is held separately by
/// `chatgate-registry` (a descriptor is metadata, not an invocation
/// handle) — spec §3 ToolDescriptor / §4.8.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub provider: String,
    pub params: Vec<ParamSpec>,
}

impl ToolDescriptor {
    pub fn new(provider: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provider: provider.into(),
            params: Vec::new(),
        }
    }

    /// The central registry's composite key, `"{provider}.{name}"`.
    pub fn composite_key(&self) -> String {
        format!("{}.{}", self.provider, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_key_joins_provider_and_name() {
        let d = ToolDescriptor::new("google_chat", "search_messages");
        assert_eq!(d.composite_key(), "google_chat.search_messages");
    }
}
