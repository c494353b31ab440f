use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chatgate_domain::config::{ProviderRecord, ProvidersDocument, SearchConfigDocument};
use chatgate_domain::error::{Error, Result};
use parking_lot::RwLock;

/// Resolves the provider-config path by the same precedence the
/// orchestrator uses for startup: an explicit env override, a config
/// file in the working directory, then a per-user fallback.
pub fn resolve_config_path() -> PathBuf {
    if let Ok(p) = std::env::var("CHATGATE_CONFIG") {
        return PathBuf::from(p);
    }
    let cwd_candidate = PathBuf::from("chatgate.yaml");
    if cwd_candidate.exists() {
        return cwd_candidate;
    }
    dirs::home_dir()
        .map(|h| h.join(".chatgate").join("config.yaml"))
        .unwrap_or_else(|| PathBuf::from(".chatgate/config.yaml"))
}

/// Loads and caches the provider-config YAML document, and memoizes
/// each per-provider record (with paths resolved to absolute) behind a
/// lock guarding the first-load race (spec §4.1, §5).
pub struct ConfigStore {
    config_path: PathBuf,
    base_dir: PathBuf,
    document: RwLock<Option<Arc<ProvidersDocument>>>,
    resolved: RwLock<HashMap<String, ProviderRecord>>,
}

impl ConfigStore {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        let config_path = config_path.into();
        let base_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            config_path,
            base_dir,
            document: RwLock::new(None),
            resolved: RwLock::new(HashMap::new()),
        }
    }

    fn load_document(&self) -> Result<Arc<ProvidersDocument>> {
        if let Some(doc) = self.document.read().as_ref() {
            return Ok(doc.clone());
        }
        let mut guard = self.document.write();
        if let Some(doc) = guard.as_ref() {
            return Ok(doc.clone());
        }
        let text = fs::read_to_string(&self.config_path)
            .map_err(|e| Error::ConfigNotFound(format!("{}: {e}", self.config_path.display())))?;
        let doc: ProvidersDocument =
            serde_yaml::from_str(&text).map_err(|e| Error::ConfigParseError(e.to_string()))?;
        let arc = Arc::new(doc);
        *guard = Some(arc.clone());
        Ok(arc)
    }

    fn resolve_relative(&self, raw: &str) -> String {
        let p = Path::new(raw);
        if p.is_absolute() {
            raw.to_string()
        } else {
            self.base_dir.join(p).to_string_lossy().into_owned()
        }
    }

    /// Returns the provider's record with `token_path` and
    /// `search_config_path` resolved to absolute paths, caching the
    /// result so resolution happens exactly once per provider.
    pub fn get_provider_config(&self, name: &str) -> Result<ProviderRecord> {
        if let Some(record) = self.resolved.read().get(name) {
            return Ok(record.clone());
        }
        let doc = self.load_document()?;
        let mut record = doc
            .providers
            .get(name)
            .cloned()
            .ok_or_else(|| Error::ConfigNotFound(name.to_string()))?;
        record.token_path = self.resolve_relative(&record.token_path);
        if let Some(search_path) = &record.search_config_path {
            record.search_config_path = Some(self.resolve_relative(search_path));
        }
        self.resolved.write().insert(name.to_string(), record.clone());
        Ok(record)
    }

    pub fn get_value(&self, name: &str, key: &str) -> Result<String> {
        let record = self.get_provider_config(name)?;
        let missing = || Error::ConfigKeyMissing(name.to_string(), key.to_string());
        match key {
            "name" => Ok(record.name),
            "description" => Ok(record.description),
            "token_path" => Ok(record.token_path),
            "callback_url" => record.callback_url.ok_or_else(missing),
            "port" => record.port.map(|p| p.to_string()).ok_or_else(missing),
            "search_config_path" => record.search_config_path.ok_or_else(missing),
            _ => Err(missing()),
        }
    }

    pub fn list_providers(&self) -> Result<Vec<(String, String)>> {
        let doc = self.load_document()?;
        let mut out: Vec<(String, String)> = doc
            .providers
            .values()
            .map(|r| (r.name.clone(), r.description.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }

    /// Loads the search-mode config document for `name`, following
    /// `search_config_path` eagerly rather than re-resolving it lazily
    /// on every search call (spec §9 "Cyclic configuration").
    pub fn load_search_config(&self, name: &str) -> Result<SearchConfigDocument> {
        let record = self.get_provider_config(name)?;
        let path = record
            .search_config_path
            .ok_or_else(|| Error::ConfigKeyMissing(name.to_string(), "search_config_path".to_string()))?;
        let text = fs::read_to_string(&path).map_err(|e| Error::ConfigNotFound(format!("{path}: {e}")))?;
        serde_yaml::from_str(&text).map_err(|e| Error::ConfigParseError(e.to_string()))
    }
}
