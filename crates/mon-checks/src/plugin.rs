//! The check plugin capability contract

use crate::CheckParams;
use mon_model::Dependency;
use std::fmt;

/// A parameter value rejected by a plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidParam {
    pub parameter: String,
    pub message: String,
}

impl InvalidParam {
    pub fn new(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            parameter: parameter.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for InvalidParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.parameter, self.message)
    }
}

/// Synthesizes check commands for one protocol.
///
/// Plugins are registered once at startup and only read afterwards, so every
/// method takes `&self` and implementations hold no mutable state.
pub trait CheckPlugin: Send + Sync {
    /// Registry key, lowercase.
    fn protocol(&self) -> &str;

    /// Additional registry keys resolving to this plugin.
    fn aliases(&self) -> Vec<&str> {
        Vec::new()
    }

    fn description(&self) -> &str;

    /// Parameters that must be present after merging.
    fn required_params(&self) -> Vec<&str>;

    fn optional_params(&self) -> Vec<&str> {
        Vec::new()
    }

    /// Protocol defaults. May inspect the dependency, e.g. to infer TLS from
    /// the declared port or the engine from the alias that was used.
    fn defaults(&self, _dependency: &Dependency) -> CheckParams {
        CheckParams::new()
    }

    /// Check value domains of the merged parameters.
    fn validate(&self, _params: &CheckParams) -> Result<(), InvalidParam> {
        Ok(())
    }

    /// Build the command line. `target` is the address checked, either the
    /// dependency's host or the monitored host's address macro.
    fn command(&self, target: &str, params: &CheckParams) -> String;

    /// Whether an HTTP probe can infer parameters for this protocol.
    fn supports_discovery(&self) -> bool {
        false
    }

    /// Where the plugin came from, for listings.
    fn origin(&self) -> String {
        "builtin".to_string()
    }
}
