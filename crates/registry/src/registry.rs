//! The Tool Registry (spec §4.8, C9): a single registration call
//! populates two views of the same tool — a central composite-key
//! (`"{provider}.{name}"`) map used for cross-provider introspection,
//! and a per-provider bare-name map used for in-process dispatch.
//! Grounded in `original_source/src/mcp_core/tools/registry.py`
//! (`ToolRegistry`) and `tool_decorator.py` (`register_with_registry`).

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use parking_lot::RwLock;

use chatgate_domain::error::{Error, Result};
use chatgate_domain::tool::ToolDescriptor;

/// A tool's callable: JSON params in, an owned async result out. Every
/// real tool body does network I/O (fetching messages, posting a reply),
/// so the handler is async rather than a plain closure — this is the
/// thinnest handler shape that still exercises registration and dispatch;
/// full tool wrapper bodies (the concrete `search_messages`,
/// `send_message`, etc. implementations) are out of scope (spec §1
/// Non-goals).
pub type ToolHandler = Arc<dyn Fn(serde_json::Value) -> BoxFuture<'static, Result<serde_json::Value>> + Send + Sync>;

#[derive(Clone)]
pub struct RegisteredTool {
    pub descriptor: ToolDescriptor,
    pub handler: ToolHandler,
}

/// Holds every registered tool in two indices that are always kept in
/// sync: `central` keyed by composite key, and `by_provider` keyed by
/// provider then bare tool name (spec §8.7 "registry duality" —
/// looking a tool up either way must agree).
#[derive(Default)]
pub struct ToolRegistry {
    central: RwLock<HashMap<String, RegisteredTool>>,
    by_provider: RwLock<HashMap<String, HashMap<String, RegisteredTool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `descriptor`/`handler` under both indices. A duplicate
    /// composite key is allowed and overwrites the previous registration
    /// — logged at `warn`, never an error — mirroring the Python
    /// registry's `register_tool` (it warns and overwrites rather than
    /// rejecting redefinition, since tool modules may be reloaded).
    pub fn register(&self, descriptor: ToolDescriptor, handler: ToolHandler) {
        let key = descriptor.composite_key();
        let entry = RegisteredTool { descriptor: descriptor.clone(), handler };

        if self.central.read().contains_key(&key) {
            tracing::warn!(tool = %key, "overwriting existing tool registration");
        }
        self.central.write().insert(key, entry.clone());
        self.by_provider
            .write()
            .entry(descriptor.provider.clone())
            .or_default()
            .insert(descriptor.name.clone(), entry);
    }

    /// Looks a tool up by its composite key (`"{provider}.{name}"`).
    pub fn get_tool(&self, composite_key: &str) -> Option<RegisteredTool> {
        self.central.read().get(composite_key).cloned()
    }

    /// Looks a tool up by provider and bare name — the surface a
    /// provider's own dispatch loop uses, distinct from the central
    /// composite-key lookup (spec §4.8).
    pub fn get_provider_tool(&self, provider: &str, name: &str) -> Option<RegisteredTool> {
        self.by_provider.read().get(provider)?.get(name).cloned()
    }

    /// All registered tool descriptors, central view.
    pub fn get_all_tools(&self) -> Vec<ToolDescriptor> {
        self.central.read().values().map(|t| t.descriptor.clone()).collect()
    }

    /// All tool descriptors registered under one provider, bare-name view.
    pub fn get_provider_tools(&self, provider: &str) -> Vec<ToolDescriptor> {
        self.by_provider
            .read()
            .get(provider)
            .map(|tools| tools.values().map(|t| t.descriptor.clone()).collect())
            .unwrap_or_default()
    }

    /// Removes a tool from both indices. Returns an error if it was not
    /// registered under `composite_key` (the original raises a `KeyError`
    /// equivalent — `pop` on a missing key).
    pub fn unregister_tool(&self, composite_key: &str) -> Result<()> {
        let removed = self.central.write().remove(composite_key);
        let Some(tool) = removed else {
            return Err(Error::InvalidArgument(format!("no such tool registered: {composite_key}")));
        };
        if let Some(provider_tools) = self.by_provider.write().get_mut(&tool.descriptor.provider) {
            provider_tools.remove(&tool.descriptor.name);
        }
        Ok(())
    }

    /// Empties both indices.
    pub fn clear(&self) {
        self.central.write().clear();
        self.by_provider.write().clear();
    }

    pub fn len(&self) -> usize {
        self.central.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.central.read().is_empty()
    }
}

/// Mirrors `tool_decorator_factory`'s role: builds a descriptor from a
/// provider/name/params triple and registers it under both indices in
/// one call, so callers never populate the two maps separately.
pub fn register_with_registry(registry: &ToolRegistry, descriptor: ToolDescriptor, handler: ToolHandler) {
    registry.register(descriptor, handler);
}
