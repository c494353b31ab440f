//! Process-wide OAuth credential cache with file persistence (spec §4.2,
//! C2). Holds a single credential slot; all three public operations are
//! serialized through one async mutex, matching the teacher's
//! `OAuthTokenStore`'s file-locking discipline but adapted to a single
//! in-memory slot instead of a multi-profile map, since this gateway
//! authenticates one provider identity per process.

use std::path::{Path, PathBuf};

use chatgate_domain::credential::Credential;
use chatgate_domain::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Token-endpoint parameters needed to refresh a credential. Values come
/// from the provider's OAuth client registration, not from `chatgate.yaml`
/// (spec §4.1 does not list them among the provider record fields).
#[derive(Debug, Clone)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub token_endpoint: String,
}

#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
}

/// On-disk shape of the token file (spec §6 "Token file").
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredCredential {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expiry: DateTime<Utc>,
    #[serde(default)]
    scopes: Vec<String>,
}

impl From<&Credential> for StoredCredential {
    fn from(c: &Credential) -> Self {
        Self {
            access_token: c.access_token.clone(),
            refresh_token: c.refresh_token.clone(),
            expiry: c.expiry,
            scopes: c.scopes.clone(),
        }
    }
}

impl From<StoredCredential> for Credential {
    fn from(s: StoredCredential) -> Self {
        Credential {
            access_token: s.access_token,
            refresh_token: s.refresh_token,
            expiry: s.expiry,
            scopes: s.scopes,
        }
    }
}

pub struct TokenStore {
    path: PathBuf,
    client: OAuthClient,
    http: reqwest::Client,
    mem: Mutex<Slot>,
}

#[derive(Default)]
struct Slot {
    credential: Option<Credential>,
    last_refresh: Option<DateTime<Utc>>,
    loaded_from_disk: bool,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>, client: OAuthClient) -> Self {
        Self {
            path: path.into(),
            client,
            http: reqwest::Client::new(),
            mem: Mutex::new(Slot::default()),
        }
    }

    /// Returns a currently-valid credential, refreshing transparently if
    /// the in-memory credential is expired AND carries a refresh token.
    /// Returns `None` if neither memory nor disk has a credential, or if
    /// refresh fails (the stale credential is discarded in that case).
    pub async fn get_credential(&self) -> Option<Credential> {
        let mut slot = self.mem.lock().await;
        self.ensure_loaded(&mut slot);

        let Some(current) = slot.credential.clone() else {
            return None;
        };
        if current.is_valid() {
            return Some(current);
        }
        if !current.has_refresh_token() {
            slot.credential = None;
            return None;
        }
        match self.do_refresh(&current).await {
            Ok(refreshed) => {
                slot.credential = Some(refreshed.clone());
                slot.last_refresh = Some(Utc::now());
                if let Err(e) = self.persist(&refreshed) {
                    tracing::warn!(error = %e, "failed to persist refreshed credential");
                }
                Some(refreshed)
            }
            Err(e) => {
                tracing::warn!(error = %e, "credential refresh failed, discarding stale credential");
                slot.credential = None;
                None
            }
        }
    }

    /// Atomically writes the credential to the token path, then updates
    /// the in-memory slot and `last_refresh` timestamp.
    pub async fn save_credential(&self, credential: Credential) -> Result<()> {
        self.persist(&credential)?;
        let mut slot = self.mem.lock().await;
        slot.credential = Some(credential);
        slot.last_refresh = Some(Utc::now());
        slot.loaded_from_disk = true;
        Ok(())
    }

    /// Forces a refresh; fails if no refresh token is present.
    pub async fn refresh(&self) -> Result<Credential> {
        let mut slot = self.mem.lock().await;
        self.ensure_loaded(&mut slot);
        let current = slot
            .credential
            .clone()
            .ok_or_else(|| Error::AuthMissing("no credential to refresh".into()))?;
        if !current.has_refresh_token() {
            return Err(Error::AuthRefreshFailed("no refresh token available".into()));
        }
        let refreshed = self.do_refresh(&current).await?;
        slot.credential = Some(refreshed.clone());
        slot.last_refresh = Some(Utc::now());
        self.persist(&refreshed)?;
        Ok(refreshed)
    }

    pub async fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.mem.lock().await.last_refresh
    }

    fn ensure_loaded(&self, slot: &mut Slot) {
        if slot.loaded_from_disk {
            return;
        }
        slot.loaded_from_disk = true;
        match self.load_from_disk() {
            Ok(cred) => slot.credential = cred,
            Err(e) => tracing::warn!(error = %e, "failed to load token store from disk"),
        }
    }

    fn load_from_disk(&self) -> Result<Option<Credential>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let file = std::fs::File::open(&self.path)?;
        fs2::FileExt::lock_shared(&file).map_err(|e| Error::AuthMissing(format!("token store lock: {e}")))?;
        let raw = std::io::read_to_string(&file)?;
        fs2::FileExt::unlock(&file).map_err(|e| Error::AuthMissing(format!("token store unlock: {e}")))?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        let stored: StoredCredential =
            serde_json::from_str(&raw).map_err(|e| Error::AuthMissing(format!("corrupt token file: {e}")))?;
        Ok(Some(stored.into()))
    }

    /// Write-temp-then-rename so concurrent readers never observe a
    /// partially written token file (spec §4.2).
    fn persist(&self, credential: &Credential) -> Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;
        let stored = StoredCredential::from(credential);
        let json = serde_json::to_string_pretty(&stored)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file().set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }
        use std::io::Write;
        tmp.write_all(json.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    async fn do_refresh(&self, current: &Credential) -> Result<Credential> {
        let refresh_token = current
            .refresh_token
            .clone()
            .ok_or_else(|| Error::AuthRefreshFailed("no refresh token available".into()))?;

        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", self.client.client_id.as_str()),
        ];
        if let Some(secret) = &self.client.client_secret {
            form.push(("client_secret", secret.as_str()));
        }

        let resp = self
            .http
            .post(&self.client.token_endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::AuthRefreshFailed(format!("refresh request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::AuthRefreshFailed(format!("reading refresh response: {e}")))?;

        if !status.is_success() {
            return Err(Error::AuthRefreshFailed(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let parsed: TokenEndpointResponse =
            serde_json::from_str(&body).map_err(|e| Error::AuthRefreshFailed(format!("parsing refresh response: {e}")))?;

        let expiry = Utc::now() + chrono::Duration::seconds(parsed.expires_in.unwrap_or(3600));
        Ok(Credential {
            access_token: parsed.access_token,
            refresh_token: parsed.refresh_token.or(Some(refresh_token)),
            expiry,
            scopes: parsed
                .scope
                .map(|s| s.split_whitespace().map(str::to_string).collect())
                .unwrap_or_else(|| current.scopes.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OAuthClient {
        OAuthClient {
            client_id: "test-client".into(),
            client_secret: None,
            token_endpoint: "https://example.invalid/token".into(),
        }
    }

    fn valid_credential() -> Credential {
        Credential {
            access_token: "tok".into(),
            refresh_token: Some("rtok".into()),
            expiry: Utc::now() + chrono::Duration::hours(1),
            scopes: vec!["chat".into()],
        }
    }

    #[tokio::test]
    async fn save_then_get_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"), client());
        store.save_credential(valid_credential()).await.unwrap();

        let fresh = TokenStore::new(dir.path().join("token.json"), client());
        let cred = fresh.get_credential().await.unwrap();
        assert_eq!(cred.access_token, "tok");
    }

    #[tokio::test]
    async fn missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("nope.json"), client());
        assert!(store.get_credential().await.is_none());
    }

    #[tokio::test]
    async fn expired_credential_without_refresh_token_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"), client());
        let expired = Credential {
            access_token: "stale".into(),
            refresh_token: None,
            expiry: Utc::now() - chrono::Duration::hours(1),
            scopes: vec![],
        };
        store.save_credential(expired).await.unwrap();
        assert!(store.get_credential().await.is_none());
    }

    #[tokio::test]
    async fn refresh_without_refresh_token_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"), client());
        let no_refresh = Credential {
            access_token: "a".into(),
            refresh_token: None,
            expiry: Utc::now() + chrono::Duration::hours(1),
            scopes: vec![],
        };
        store.save_credential(no_refresh).await.unwrap();
        let err = store.refresh().await.unwrap_err();
        assert!(matches!(err, Error::AuthRefreshFailed(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn persisted_file_has_0600_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        let store = TokenStore::new(&path, client());
        store.save_credential(valid_credential()).await.unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}
