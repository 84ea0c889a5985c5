//! The service descriptor root document

use crate::{Dependency, Environment, LogSource, naming::slugify};
use serde::{Deserialize, Serialize};

/// Business priority of the monitored service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[serde(alias = "Critical", alias = "Crítica", alias = "Critica", alias = "crítica")]
    Critical,
    #[serde(alias = "High", alias = "Alta", alias = "alta")]
    High,
    #[serde(alias = "Medium", alias = "Media", alias = "media")]
    Medium,
    #[serde(alias = "Low", alias = "Baja", alias = "baja")]
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identification {
    #[serde(alias = "service_name")]
    pub name: String,
    #[serde(default, alias = "service_desc")]
    pub description: String,
    pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechStackEntry {
    pub technology: String,
    #[serde(default)]
    pub version: String,
}

/// A person notified about the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Responsible {
    #[serde(alias = "nombre")]
    pub name: String,
    pub email: String,
}

impl Responsible {
    /// Contact object name for the check system.
    pub fn contact_id(&self) -> String {
        format!("contact_{}", slugify(&self.name))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthApiDetails {
    pub endpoint: String,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub interval_sec: Option<u32>,
}

/// Validated description of one service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub identification: Identification,
    #[serde(default)]
    pub tech_stack: Vec<TechStackEntry>,
    #[serde(default, alias = "responsables")]
    pub responsibles: Vec<Responsible>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub logs: Vec<LogSource>,
    #[serde(default)]
    pub health_api: bool,
    #[serde(default)]
    pub health_api_details: Option<HealthApiDetails>,
    #[serde(alias = "envs")]
    pub environments: Vec<Environment>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ServiceDescriptor {
    /// Identifier-safe form of the service name.
    pub fn slug(&self) -> String {
        slugify(&self.identification.name)
    }

    /// Contact group shared by all responsible parties.
    pub fn contact_group(&self) -> String {
        format!("cg_{}", self.slug())
    }

    pub fn environment(&self, name: &str) -> Option<&Environment> {
        self.environments
            .iter()
            .find(|env| env.name.eq_ignore_ascii_case(name))
    }

    pub fn environment_names(&self) -> Vec<&str> {
        self.environments.iter().map(|env| env.name.as_str()).collect()
    }

    pub fn dependency(&self, name: &str) -> Option<&Dependency> {
        self.dependencies.iter().find(|dep| dep.name == name)
    }

    /// Health endpoint when the service exposes one.
    pub fn health_endpoint(&self) -> Option<&HealthApiDetails> {
        if self.health_api {
            self.health_api_details.as_ref()
        } else {
            None
        }
    }

    pub fn responsible_emails(&self) -> Vec<&str> {
        self.responsibles.iter().map(|r| r.email.as_str()).collect()
    }
}
