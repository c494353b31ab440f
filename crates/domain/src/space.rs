use serde::{Deserialize, Serialize};

/// A chat container: a room or a direct/group conversation. Read-only
/// for the core — spaces are listed, never created or mutated here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Space {
    pub name: String,
    #[serde(rename = "type", default)]
    pub space_type: SpaceType,
    #[serde(default, rename = "displayName")]
    pub display_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpaceType {
    #[default]
    Room,
    Dm,
    GroupDm,
}

/// Enrichment attached to a `Message` identifying the space it came from,
/// stamped in by multi-space collection (spec §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Space {
    /// Bare id or fully qualified `spaces/{id}` — tools accept either and
    /// normalize (spec §6); message-scoped tools do not get this leniency.
    pub fn normalize_ref(raw: &str) -> String {
        if raw.starts_with("spaces/") {
            raw.to_string()
        } else {
            format!("spaces/{raw}")
        }
    }
}
