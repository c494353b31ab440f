//! The Provider Loader (spec §4.10, C10): resolves a provider's
//! configuration, builds the runtime objects it needs (token store,
//! backend, search service), and registers its tools — all cached
//! behind one lock so a provider is only ever constructed once per
//! process. Grounded in
//! `original_source/src/mcp_core/engine/provider_loader.py`
//! (`load_provider_config`/`_load_full_config`'s `threading.RLock`
//! cache, reimagined here as `parking_lot::RwLock` over a loaded-object
//! cache instead of a raw dict) and `src/server.py`'s startup sequence
//! (`initialize_provider_config` then `load_provider_modules`).

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use chatgate_auth::{OAuthClient, TokenStore};
use chatgate_backend::{ChatBackend, GoogleChatBackend};
use chatgate_config::ConfigStore;
use chatgate_domain::config::ProviderRecord;
use chatgate_domain::error::{Error, Result};
use chatgate_embed::EmbeddingProvider;
use chatgate_registry::ToolRegistry;
use chatgate_search::{SearchEngine, SearchService};

const GOOGLE_AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_EMBEDDING_CACHE_CAPACITY: usize = 1000;

/// Everything built for one provider: its resolved config plus the
/// runtime handles the rest of the gateway (tools, CLI) dispatches
/// against.
pub struct LoadedProvider {
    pub record: ProviderRecord,
    pub token_store: Arc<TokenStore>,
    pub backend: Arc<dyn ChatBackend>,
    pub search_service: Option<Arc<SearchService>>,
}

pub struct ProviderLoader {
    config_store: Arc<ConfigStore>,
    registry: Arc<ToolRegistry>,
    loaded: RwLock<HashMap<String, Arc<LoadedProvider>>>,
}

impl ProviderLoader {
    pub fn new(config_store: Arc<ConfigStore>, registry: Arc<ToolRegistry>) -> Self {
        Self { config_store, registry, loaded: RwLock::new(HashMap::new()) }
    }

    /// Mirrors `get_available_providers`: every provider the config
    /// document declares, name plus description, sorted.
    pub fn get_available_providers(&self) -> Result<Vec<(String, String)>> {
        self.config_store.list_providers()
    }

    /// Mirrors `initialize_provider_config`: loads (and caches, via
    /// `ConfigStore`) a provider's record, logging intent the way the
    /// original logs "Initializing configuration for provider: …".
    pub fn initialize_provider_config(&self, provider_name: &str) -> Result<ProviderRecord> {
        tracing::info!(provider = %provider_name, "initializing provider configuration");
        self.config_store.get_provider_config(provider_name)
    }

    pub fn get_provider_config_value(&self, provider_name: &str, key: &str) -> Result<String> {
        self.config_store.get_value(provider_name, key)
    }

    /// True once the provider's token file exists on disk — the gate
    /// `src/server.py` checks before entering tool-serving mode (spec
    /// §4.10 "Token readiness").
    pub fn token_path_exists(&self, provider_name: &str) -> Result<bool> {
        let record = self.config_store.get_provider_config(provider_name)?;
        Ok(Path::new(&record.token_path).exists())
    }

    /// Loads (constructing on first call, returning the cached instance
    /// thereafter) every runtime object a provider needs, and registers
    /// its tools into the shared registry — the Rust analog of
    /// `load_provider_modules`'s dynamic import plus tool-module
    /// side-effect registration, minus the dynamic-import mechanism
    /// itself (there is nothing to dynamically import in a statically
    /// linked binary; the equivalent unit of work is constructing the
    /// provider's object graph once).
    pub fn load_provider(&self, provider_name: &str) -> Result<Arc<LoadedProvider>> {
        if let Some(loaded) = self.loaded.read().get(provider_name) {
            return Ok(loaded.clone());
        }

        let mut guard = self.loaded.write();
        if let Some(loaded) = guard.get(provider_name) {
            return Ok(loaded.clone());
        }

        let record = self.config_store.get_provider_config(provider_name)?;

        let oauth_client = oauth_client_from_env(provider_name, &record);
        let token_store = Arc::new(TokenStore::new(record.token_path.clone(), oauth_client));
        let backend: Arc<dyn ChatBackend> = Arc::new(GoogleChatBackend::new(token_store.clone()));

        let search_service = match &record.search_config_path {
            Some(_) => {
                let search_config = self.config_store.load_search_config(provider_name)?;
                let embedder = Arc::new(EmbeddingProvider::new("all-MiniLM-L6-v2", DEFAULT_EMBEDDING_CACHE_CAPACITY));
                let engine = SearchEngine::new(search_config, Some(embedder));
                Some(Arc::new(SearchService::new(backend.clone(), engine)))
            }
            None => None,
        };

        let loaded = Arc::new(LoadedProvider { record, token_store, backend, search_service: search_service.clone() });

        register_provider_tools(&self.registry, provider_name, &loaded);

        guard.insert(provider_name.to_string(), loaded.clone());
        tracing::info!(provider = %provider_name, "provider loaded and tools registered");
        Ok(loaded)
    }
}

/// Resolves OAuth client credentials from `{PROVIDER}_CLIENT_ID` /
/// `{PROVIDER}_CLIENT_SECRET` env vars — these identify the registered
/// OAuth application, not the per-provider record, and are never stored
/// in `chatgate.yaml` (spec §4.1 omits them from `ProviderRecord`).
fn oauth_client_from_env(provider_name: &str, _record: &ProviderRecord) -> OAuthClient {
    let prefix = provider_name.to_ascii_uppercase();
    let client_id = std::env::var(format!("{prefix}_CLIENT_ID")).unwrap_or_default();
    let client_secret = std::env::var(format!("{prefix}_CLIENT_SECRET")).ok();
    if client_id.is_empty() {
        tracing::warn!(provider = %provider_name, "no {}_CLIENT_ID set; authorization-code flow will fail until configured", prefix);
    }
    OAuthClient {
        client_id,
        client_secret,
        token_endpoint: GOOGLE_TOKEN_ENDPOINT.to_string(),
    }
}

/// Builds the authorize-URL endpoint a CLI or Auth Server needs,
/// alongside the token endpoint already baked into `OAuthClient` — kept
/// as a free function since it is config, not state.
pub fn google_auth_endpoint() -> &'static str {
    GOOGLE_AUTH_ENDPOINT
}

pub fn google_token_endpoint() -> &'static str {
    GOOGLE_TOKEN_ENDPOINT
}

/// Public entry point for callers (the orchestrator's `-local-auth`
/// branch) that need the same OAuth client credentials `load_provider`
/// resolves internally, without constructing a full `LoadedProvider`.
pub fn resolve_oauth_client(provider_name: &str, record: &ProviderRecord) -> OAuthClient {
    oauth_client_from_env(provider_name, record)
}

/// Registers the provider's tool surface into both registry indices.
/// Concrete tool bodies are out of scope (spec §1 Non-goals); this
/// registers thin wrappers around the Search Core and space-listing
/// operation that exist today, which is enough to exercise the
/// registration/dispatch mechanism end to end.
fn register_provider_tools(registry: &ToolRegistry, provider_name: &str, loaded: &Arc<LoadedProvider>) {
    use chatgate_domain::tool::{ParamSpec, ToolDescriptor};
    use chatgate_domain::search::{SearchMode, SearchQuery};

    {
        let backend = loaded.backend.clone();
        let descriptor = ToolDescriptor {
            name: "list_spaces".to_string(),
            provider: provider_name.to_string(),
            params: Vec::new(),
        };
        chatgate_registry::register_with_registry(
            registry,
            descriptor,
            Arc::new(move |_params| {
                let backend = backend.clone();
                Box::pin(async move {
                    let spaces = backend.list_spaces().await?;
                    serde_json::to_value(spaces).map_err(Error::from)
                })
            }),
        );
    }

    if let Some(search_service) = loaded.search_service.clone() {
        let descriptor = ToolDescriptor {
            name: "search_messages".to_string(),
            provider: provider_name.to_string(),
            params: vec![
                ParamSpec { name: "query".into(), param_type: "string".into(), optional: false, default: None },
                ParamSpec { name: "mode".into(), param_type: "string".into(), optional: true, default: None },
                ParamSpec { name: "max_results".into(), param_type: "integer".into(), optional: true, default: Some(serde_json::json!(50)) },
            ],
        };
        chatgate_registry::register_with_registry(
            registry,
            descriptor,
            Arc::new(move |params| {
                let search_service = search_service.clone();
                Box::pin(async move {
                    let query_text = params.get("query").and_then(|v| v.as_str()).unwrap_or_default().to_string();
                    let mut query = SearchQuery::new(query_text);
                    if let Some(mode) = params.get("mode").and_then(|v| v.as_str()) {
                        query.mode = SearchMode::parse(Some(mode));
                    }
                    if let Some(max_results) = params.get("max_results").and_then(|v| v.as_u64()) {
                        query.max_results = max_results as usize;
                    }
                    let response = search_service.search(&query).await;
                    serde_json::to_value(response).map_err(Error::from)
                })
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(dir: &Path, search_yaml: Option<&str>) -> std::path::PathBuf {
        let token_path = dir.join("token.json");
        std::fs::File::create(&token_path).unwrap().write_all(b"{}").unwrap();

        let mut providers_yaml = format!(
            "providers:\n  google_chat:\n    name: google_chat\n    description: Google Chat\n    token_path: {}\n    scopes: []\n",
            token_path.display()
        );
        if let Some(search_yaml) = search_yaml {
            let search_path = dir.join("search_config.yaml");
            std::fs::write(&search_path, search_yaml).unwrap();
            providers_yaml.push_str(&format!("    search_config_path: {}\n", search_path.display()));
        }

        let config_path = dir.join("chatgate.yaml");
        std::fs::write(&config_path, providers_yaml).unwrap();
        config_path
    }

    fn search_yaml() -> &'static str {
        "search_modes:\n  - name: exact\n    enabled: true\n    weight: 1.0\nsearch:\n  default_mode: exact\n"
    }

    #[test]
    fn load_provider_is_cached_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = write_config(dir.path(), None);
        let loader = ProviderLoader::new(Arc::new(ConfigStore::new(config_path)), Arc::new(ToolRegistry::new()));

        let first = loader.load_provider("google_chat").unwrap();
        let second = loader.load_provider("google_chat").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn loading_registers_list_spaces_tool() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = write_config(dir.path(), None);
        let registry = Arc::new(ToolRegistry::new());
        let loader = ProviderLoader::new(Arc::new(ConfigStore::new(config_path)), registry.clone());

        loader.load_provider("google_chat").unwrap();
        assert!(registry.get_tool("google_chat.list_spaces").is_some());
        assert!(registry.get_tool("google_chat.search_messages").is_none());
    }

    #[test]
    fn search_config_path_registers_search_messages_tool() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = write_config(dir.path(), Some(search_yaml()));
        let registry = Arc::new(ToolRegistry::new());
        let loader = ProviderLoader::new(Arc::new(ConfigStore::new(config_path)), registry.clone());

        let loaded = loader.load_provider("google_chat").unwrap();
        assert!(loaded.search_service.is_some());
        assert!(registry.get_tool("google_chat.search_messages").is_some());
    }

    #[test]
    fn token_path_exists_reflects_the_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = write_config(dir.path(), None);
        let loader = ProviderLoader::new(Arc::new(ConfigStore::new(config_path)), Arc::new(ToolRegistry::new()));
        assert!(loader.token_path_exists("google_chat").unwrap());
        assert!(loader.token_path_exists("nonexistent_provider").is_err());
    }

    #[test]
    fn unknown_provider_is_config_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = write_config(dir.path(), None);
        let loader = ProviderLoader::new(Arc::new(ConfigStore::new(config_path)), Arc::new(ToolRegistry::new()));
        let err = loader.load_provider("nope").unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound(_)));
    }
}
