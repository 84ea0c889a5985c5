//! Registry storage

use super::{BuiltinProvider, PluginProvider};
use crate::{CheckPlugin, Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Protocol-keyed plugin lookup.
pub struct CheckRegistry {
    plugins: HashMap<String, Arc<dyn CheckPlugin>>,
    aliases: HashMap<String, String>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
            aliases: HashMap::new(),
        }
    }

    /// Registry holding only the built-in protocols.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for plugin in super::builtin_plugins() {
            // Built-in keys are disjoint, checked by the builtins tests.
            let _ = registry.register(plugin);
        }
        registry
    }

    /// Build a registry from built-ins plus `providers`, in order.
    ///
    /// A provider may not claim a key already taken.
    pub fn from_providers(providers: &[&dyn PluginProvider]) -> Result<Self> {
        let mut registry = Self::new();
        let mut owners: HashMap<String, String> = HashMap::new();
        let builtin: &dyn PluginProvider = &BuiltinProvider;
        for provider in std::iter::once(builtin).chain(providers.iter().copied()) {
            let name = provider.name();
            for plugin in provider.plugins()? {
                for key in keys_of(plugin.as_ref()) {
                    if let Some(first) = owners.get(&key) {
                        return Err(Error::DuplicateProtocol {
                            protocol: key,
                            first: first.clone(),
                            second: name.clone(),
                        });
                    }
                    owners.insert(key, name.clone());
                }
                tracing::debug!(protocol = plugin.protocol(), provider = %name, "registered check plugin");
                registry.register(plugin)?;
            }
        }
        Ok(registry)
    }

    /// Register a plugin under its protocol and aliases.
    pub fn register(&mut self, plugin: Arc<dyn CheckPlugin>) -> Result<()> {
        let protocol = plugin.protocol().to_lowercase();
        for key in keys_of(plugin.as_ref()) {
            if self.plugins.contains_key(&key) || self.aliases.contains_key(&key) {
                return Err(Error::DuplicateProtocol {
                    protocol: key,
                    first: "registry".to_string(),
                    second: plugin.origin(),
                });
            }
        }
        for alias in plugin.aliases() {
            self.aliases.insert(alias.to_lowercase(), protocol.clone());
        }
        self.plugins.insert(protocol, plugin);
        Ok(())
    }

    /// Look up a plugin by protocol or alias, ignoring case and whitespace.
    pub fn get(&self, key: &str) -> Option<&Arc<dyn CheckPlugin>> {
        let key = key.trim().to_lowercase();
        let protocol = self.aliases.get(&key).unwrap_or(&key);
        self.plugins.get(protocol)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Primary protocol keys, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut keys: Vec<_> = self.plugins.keys().map(String::as_str).collect();
        keys.sort();
        keys
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn CheckPlugin>> {
        self.plugins.values()
    }
}

impl Default for CheckRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn keys_of(plugin: &dyn CheckPlugin) -> Vec<String> {
    std::iter::once(plugin.protocol())
        .chain(plugin.aliases())
        .map(str::to_lowercase)
        .collect()
}
