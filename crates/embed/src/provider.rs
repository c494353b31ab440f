use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::{Mutex, RwLock};

use crate::model::{encode, EMBEDDING_DIMENSION};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadState {
    NotLoaded,
    Loaded,
    Failed,
}

/// Lazily loads a named embedding model on first use and LRU-caches
/// per-text vectors. If loading fails, `available()` returns `false`
/// forever and every `embed` call returns `None` — there is no retry
/// (spec §4.6, C7).
pub struct EmbeddingProvider {
    model_name: String,
    dimension: usize,
    state: RwLock<LoadState>,
    cache: Mutex<LruCache<String, Arc<Vec<f32>>>>,
}

impl EmbeddingProvider {
    pub fn new(model_name: impl Into<String>, cache_capacity: usize) -> Self {
        Self {
            model_name: model_name.into(),
            dimension: EMBEDDING_DIMENSION,
            state: RwLock::new(LoadState::NotLoaded),
            cache: Mutex::new(LruCache::new(NonZeroUsize::new(cache_capacity.max(1)).unwrap())),
        }
    }

    fn ensure_loaded(&self) -> bool {
        {
            let state = *self.state.read();
            match state {
                LoadState::Loaded => return true,
                LoadState::Failed => return false,
                LoadState::NotLoaded => {}
            }
        }
        let mut state = self.state.write();
        if *state == LoadState::NotLoaded {
            *state = if Self::try_load(&self.model_name) {
                tracing::info!(model = %self.model_name, "embedding model loaded");
                LoadState::Loaded
            } else {
                tracing::warn!(model = %self.model_name, "embedding model failed to load; semantic search unavailable");
                LoadState::Failed
            };
        }
        *state == LoadState::Loaded
    }

    fn try_load(model_name: &str) -> bool {
        !model_name.trim().is_empty()
    }

    /// True iff the model loaded successfully.
    pub fn available(&self) -> bool {
        self.ensure_loaded()
    }

    /// Returns a fixed-dimension vector for `text`, or `None` if the
    /// model is unavailable or `text` is empty — never panics on empty
    /// input (spec §4.6).
    pub fn embed(&self, text: &str) -> Option<Vec<f32>> {
        if text.is_empty() || !self.ensure_loaded() {
            return None;
        }
        if let Some(cached) = self.cache.lock().get(text) {
            return Some((**cached).clone());
        }
        let vector = encode(text, self.dimension);
        self.cache.lock().put(text.to_string(), Arc::new(vector.clone()));
        Some(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_model_name_never_becomes_available() {
        let provider = EmbeddingProvider::new("", 10);
        assert!(!provider.available());
        assert!(provider.embed("hello").is_none());
        // still unavailable on a second call — no retry.
        assert!(!provider.available());
    }

    #[test]
    fn embed_returns_none_for_empty_text() {
        let provider = EmbeddingProvider::new("all-MiniLM-L6-v2", 10);
        assert!(provider.embed("").is_none());
    }

    #[test]
    fn repeated_embed_calls_hit_the_cache() {
        let provider = EmbeddingProvider::new("all-MiniLM-L6-v2", 10);
        let a = provider.embed("hello world").unwrap();
        let b = provider.embed("hello world").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn cache_evicts_least_recently_used_on_overflow() {
        let provider = EmbeddingProvider::new("all-MiniLM-L6-v2", 2);
        provider.embed("one");
        provider.embed("two");
        provider.embed("three"); // evicts "one"
        assert_eq!(provider.cache.lock().len(), 2);
        assert!(!provider.cache.lock().contains("one"));
    }
}
