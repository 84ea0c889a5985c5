//! Built-in check plugins

use super::PluginProvider;
use crate::CheckPlugin;
use crate::protocols::{database, metrics, network, orchestration};
use std::sync::Arc;

/// Number of built-in protocols.
pub const BUILTIN_COUNT: usize = 11;

pub fn builtin_plugins() -> Vec<Arc<dyn CheckPlugin>> {
    vec![
        // Network services
        Arc::new(network::HttpCheck),
        Arc::new(network::TcpCheck),
        Arc::new(network::IcmpCheck),
        Arc::new(network::DnsCheck),
        Arc::new(network::LdapCheck),
        Arc::new(network::SmtpCheck),
        // Databases
        Arc::new(database::SqlCheck),
        // Containers and orchestration
        Arc::new(orchestration::DockerCheck),
        Arc::new(orchestration::KubernetesCheck),
        // Metrics and custom commands
        Arc::new(metrics::PrometheusCheck),
        Arc::new(metrics::CustomCheck),
    ]
}

/// Provider for the protocols shipped with Monforge.
pub struct BuiltinProvider;

impl PluginProvider for BuiltinProvider {
    fn name(&self) -> String {
        "builtin".to_string()
    }

    fn plugins(&self) -> crate::Result<Vec<Arc<dyn CheckPlugin>>> {
        Ok(builtin_plugins())
    }
}
