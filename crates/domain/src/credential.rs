use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An opaque OAuth token bundle. Never exposed outside the owning
/// process — `Debug` redacts both tokens so a stray `{:?}` in a log
/// line can't leak a secret (spec §3 Credential).
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expiry: DateTime<Utc>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl Credential {
    /// `expiry` in the future AND the access token is non-empty.
    pub fn is_valid(&self) -> bool {
        !self.access_token.is_empty() && self.expiry > Utc::now()
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &self.refresh_token.as_deref().map(redact))
            .field("expiry", &self.expiry)
            .field("scopes", &self.scopes)
            .finish()
    }
}

fn redact(secret: &str) -> String {
    if secret.len() <= 8 {
        "***".to_string()
    } else {
        format!("{}...{}", &secret[..4], &secret[secret.len() - 4..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn valid_when_future_expiry_and_nonempty_token() {
        let c = Credential {
            access_token: "tok".into(),
            refresh_token: Some("rtok".into()),
            expiry: Utc::now() + Duration::hours(1),
            scopes: vec![],
        };
        assert!(c.is_valid());
    }

    #[test]
    fn invalid_when_expired() {
        let c = Credential {
            access_token: "tok".into(),
            refresh_token: None,
            expiry: Utc::now() - Duration::hours(1),
            scopes: vec![],
        };
        assert!(!c.is_valid());
    }

    #[test]
    fn debug_output_never_contains_raw_secret() {
        let c = Credential {
            access_token: "super-secret-access-token".into(),
            refresh_token: Some("super-secret-refresh-token".into()),
            expiry: Utc::now(),
            scopes: vec![],
        };
        let out = format!("{c:?}");
        assert!(!out.contains("super-secret-access-token"));
        assert!(!out.contains("super-secret-refresh-token"));
    }
}
