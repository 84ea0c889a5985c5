//! Generated artifact sets and their manifest
//!
//! An [`ArtifactSet`] is everything generated for one environment. On disk it
//! lives under `<out>/<environment>/{checks,logs}/` next to a `manifest.json`
//! listing each file, its group and checksum plus the environment's hosts,
//! so that a set generated today can be deployed later without the
//! descriptor.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use mon_checks::CheckSystemFiles;
use mon_fs::{ConfigStore, NormalizedPath, compute_content_checksum};
use mon_logs::LogPipelineFiles;
use mon_model::Host;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MANIFEST_FILE: &str = "manifest.json";

/// Destination class of a generated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactGroup {
    CheckSystem,
    LogCollector,
    LogProcessor,
    AdminApi,
    Dashboard,
    Alerting,
}

impl ArtifactGroup {
    /// Sub-directory of the environment directory.
    pub fn dir(self) -> &'static str {
        match self {
            Self::CheckSystem => "checks",
            _ => "logs",
        }
    }

    pub fn is_check_system(self) -> bool {
        self == Self::CheckSystem
    }

    /// Whether files of this group are copied onto hosts.
    pub fn is_host_file(self) -> bool {
        matches!(self, Self::CheckSystem | Self::LogCollector | Self::LogProcessor)
    }

    fn for_pipeline_file(name: &str) -> Self {
        match name {
            "filebeat.yml" => Self::LogCollector,
            "logstash.conf" => Self::LogProcessor,
            "kibana_dashboard.json" => Self::Dashboard,
            "alerts.json" => Self::Alerting,
            _ => Self::AdminApi,
        }
    }
}

impl fmt::Display for ArtifactGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CheckSystem => "check-system",
            Self::LogCollector => "log-collector",
            Self::LogProcessor => "log-processor",
            Self::AdminApi => "admin-api",
            Self::Dashboard => "dashboard",
            Self::Alerting => "alerting",
        };
        f.write_str(name)
    }
}

/// Which artifact families an operation covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupSelection {
    pub checks: bool,
    pub logs: bool,
}

impl GroupSelection {
    pub fn all() -> Self {
        Self {
            checks: true,
            logs: true,
        }
    }

    pub fn checks_only() -> Self {
        Self {
            checks: true,
            logs: false,
        }
    }

    pub fn logs_only() -> Self {
        Self {
            checks: false,
            logs: true,
        }
    }

    pub fn includes(self, group: ArtifactGroup) -> bool {
        if group.is_check_system() {
            self.checks
        } else {
            self.logs
        }
    }
}

impl Default for GroupSelection {
    fn default() -> Self {
        Self::all()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub group: ArtifactGroup,
    /// File name, e.g. `hosts.cfg`.
    pub name: String,
    pub content: String,
    /// `sha256:<hex>` of `content`.
    pub checksum: String,
}

impl Artifact {
    pub fn new(group: ArtifactGroup, name: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            group,
            name: name.into(),
            checksum: compute_content_checksum(&content),
            content,
        }
    }

    /// Path relative to the environment directory.
    pub fn relative_path(&self) -> String {
        format!("{}/{}", self.group.dir(), self.name)
    }
}

/// `manifest.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub service: String,
    pub environment: String,
    pub generated_at: DateTime<Utc>,
    pub hosts: Vec<Host>,
    /// Name the ingest pipeline and index template are registered under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_name: Option<String>,
    pub files: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path: String,
    pub group: ArtifactGroup,
    pub checksum: String,
}

/// All artifacts generated for one environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactSet {
    pub service: String,
    pub environment: String,
    pub hosts: Vec<Host>,
    pub asset_name: Option<String>,
    pub artifacts: Vec<Artifact>,
}

impl ArtifactSet {
    /// Assemble a set from the rendered files of either engine.
    pub fn new(
        service: impl Into<String>,
        environment: impl Into<String>,
        hosts: Vec<Host>,
        checks: Option<&CheckSystemFiles>,
        logs: Option<&LogPipelineFiles>,
    ) -> Self {
        let mut artifacts = Vec::new();
        if let Some(checks) = checks {
            for (name, content) in checks.files() {
                artifacts.push(Artifact::new(ArtifactGroup::CheckSystem, name, content));
            }
        }
        if let Some(logs) = logs {
            for (name, content) in logs.files() {
                artifacts.push(Artifact::new(ArtifactGroup::for_pipeline_file(name), name, content));
            }
        }
        Self {
            service: service.into(),
            environment: environment.into(),
            hosts,
            asset_name: logs.map(|l| l.asset_name.clone()),
            artifacts,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.name == name)
    }

    pub fn group(&self, group: ArtifactGroup) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter().filter(move |a| a.group == group)
    }

    /// `(file name, content)` of the check-system objects.
    pub fn check_files(&self) -> Vec<(&str, &str)> {
        self.group(ArtifactGroup::CheckSystem)
            .map(|a| (a.name.as_str(), a.content.as_str()))
            .collect()
    }

    pub fn has_checks(&self) -> bool {
        self.group(ArtifactGroup::CheckSystem).next().is_some()
    }

    pub fn has_logs(&self) -> bool {
        self.artifacts.iter().any(|a| !a.group.is_check_system())
    }

    /// Copy of the set restricted to `selection`.
    pub fn select(&self, selection: GroupSelection) -> Self {
        Self {
            artifacts: self
                .artifacts
                .iter()
                .filter(|a| selection.includes(a.group))
                .cloned()
                .collect(),
            ..self.clone()
        }
    }

    pub fn manifest(&self) -> Manifest {
        Manifest {
            service: self.service.clone(),
            environment: self.environment.clone(),
            generated_at: Utc::now(),
            hosts: self.hosts.clone(),
            asset_name: self.asset_name.clone(),
            files: self
                .artifacts
                .iter()
                .map(|a| ManifestEntry {
                    path: a.relative_path(),
                    group: a.group,
                    checksum: a.checksum.clone(),
                })
                .collect(),
        }
    }

    /// Write every artifact and the manifest under `<out>/<environment>/`.
    /// Returns the environment directory.
    pub fn write(&self, out: &NormalizedPath) -> Result<NormalizedPath> {
        let dir = out.join(&self.environment);
        for artifact in &self.artifacts {
            mon_fs::io::write_text(&dir.join(&artifact.relative_path()), &artifact.content)?;
        }
        ConfigStore::new().save(&dir.join(MANIFEST_FILE), &self.manifest())?;
        tracing::info!(
            environment = %self.environment,
            files = self.artifacts.len(),
            dir = %dir,
            "wrote artifact set"
        );
        Ok(dir)
    }

    /// Load a set written by [`ArtifactSet::write`], verifying every checksum.
    pub fn load(dir: &NormalizedPath) -> Result<Self> {
        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Err(Error::Manifest {
                path: manifest_path.to_native(),
                message: "manifest.json not found".into(),
            });
        }
        let manifest: Manifest = ConfigStore::new().load(&manifest_path)?;

        let mut artifacts = Vec::with_capacity(manifest.files.len());
        for entry in &manifest.files {
            let Some(name) = entry.path.rsplit('/').next().filter(|n| !n.is_empty()) else {
                return Err(Error::Manifest {
                    path: manifest_path.to_native(),
                    message: format!("invalid file entry '{}'", entry.path),
                });
            };
            let path = dir.join(&entry.path);
            let content = mon_fs::io::read_text(&path).map_err(|e| Error::Manifest {
                path: manifest_path.to_native(),
                message: format!("{}: {}", entry.path, e),
            })?;
            let artifact = Artifact::new(entry.group, name, content);
            if artifact.checksum != entry.checksum {
                return Err(Error::Manifest {
                    path: manifest_path.to_native(),
                    message: format!(
                        "{} was modified after generation (expected {}, found {})",
                        entry.path, entry.checksum, artifact.checksum
                    ),
                });
            }
            artifacts.push(artifact);
        }

        tracing::debug!(environment = %manifest.environment, files = artifacts.len(), "loaded artifact set");
        Ok(Self {
            service: manifest.service,
            environment: manifest.environment,
            hosts: manifest.hosts,
            asset_name: manifest.asset_name,
            artifacts,
        })
    }
}
