//! Deployment environments and their hosts

use crate::naming::slugify;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostKind {
    #[serde(alias = "Host", alias = "servidor", alias = "server", alias = "vm")]
    Host,
    #[serde(alias = "Container", alias = "contenedor", alias = "docker")]
    Container,
    #[serde(alias = "Domain", alias = "dominio")]
    Domain,
    #[serde(alias = "Pod", alias = "kubernetes")]
    Pod,
    #[serde(alias = "Other", alias = "otro")]
    Other,
}

impl fmt::Display for HostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Host => "host",
            Self::Container => "container",
            Self::Domain => "domain",
            Self::Pod => "pod",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    #[serde(rename = "type")]
    pub kind: HostKind,
    pub identifier: String,
    /// Network address when it differs from the identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Host {
    pub fn new(kind: HostKind, identifier: impl Into<String>) -> Self {
        Self {
            kind,
            identifier: identifier.into(),
            address: None,
        }
    }

    /// Address used to reach the host.
    pub fn address(&self) -> &str {
        self.address.as_deref().unwrap_or(&self.identifier)
    }

    /// Host object name in the check system, scoped by environment.
    pub fn object_name(&self, environment: &str) -> String {
        format!("host_{}_{}", slugify(environment), slugify(&self.identifier))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub name: String,
    #[serde(default, alias = "desc")]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub hosts: Vec<Host>,
}

impl Environment {
    /// An environment can be deployed only when it names at least one host.
    pub fn is_deployable(&self) -> bool {
        !self.hosts.is_empty()
    }

    pub fn host(&self, identifier: &str) -> Option<&Host> {
        self.hosts.iter().find(|h| h.identifier == identifier)
    }
}
