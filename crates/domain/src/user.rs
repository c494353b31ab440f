use serde::{Deserialize, Serialize};

/// A profile snapshot for a user reference. All fields are optional —
/// the backend may not be able to resolve every attribute, and
/// best-effort lookups synthesize a stub with only `display_name` set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl UserProfile {
    /// The best-effort stub attached when profile resolution fails —
    /// never fails the enclosing call (spec §4.5).
    pub fn stub(raw_user_ref: &str) -> Self {
        let id = raw_user_ref.rsplit('/').next().unwrap_or(raw_user_ref);
        Self {
            id: id.to_string(),
            display_name: Some(format!("User {id}")),
            ..Default::default()
        }
    }
}

/// Normalizes one of the three equivalent user-reference forms
/// (`users/{U}`, `people/{U}`, raw `{U}`) to the canonical `users/{U}`
/// form used for lookup.
pub fn normalize_user_ref(raw: &str) -> String {
    if let Some(id) = raw.strip_prefix("users/") {
        format!("users/{id}")
    } else if let Some(id) = raw.strip_prefix("people/") {
        format!("users/{id}")
    } else {
        format!("users/{raw}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_all_three_equivalent_forms() {
        assert_eq!(normalize_user_ref("users/123"), "users/123");
        assert_eq!(normalize_user_ref("people/123"), "users/123");
        assert_eq!(normalize_user_ref("123"), "users/123");
    }

    #[test]
    fn stub_synthesizes_display_name_from_trailing_id() {
        let p = UserProfile::stub("users/42");
        assert_eq!(p.id, "42");
        assert_eq!(p.display_name.as_deref(), Some("User 42"));
    }
}
