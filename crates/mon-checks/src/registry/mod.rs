//! Check plugin registry
//!
//! Populated once at startup from an explicit list of providers and only
//! read afterwards. Lookups are case-insensitive and resolve aliases.

mod builtins;
mod store;

pub use builtins::{BUILTIN_COUNT, BuiltinProvider, builtin_plugins};
pub use store::CheckRegistry;

use crate::{CheckPlugin, Result};
use std::sync::Arc;

/// A source of check plugins.
pub trait PluginProvider {
    /// Name shown when a provider's plugin collides with another.
    fn name(&self) -> String;

    fn plugins(&self) -> Result<Vec<Arc<dyn CheckPlugin>>>;
}
