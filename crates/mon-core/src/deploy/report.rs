//! Deployment outcome reporting

use crate::transport::TransportError;
use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::fmt;

/// Steps of a deployment, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Init,
    Backup,
    DryRunCheck,
    Transfer,
    PostValidate,
    Notify,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Backup => "backup",
            Self::DryRunCheck => "dry-run-check",
            Self::Transfer => "transfer",
            Self::PostValidate => "post-validate",
            Self::Notify => "notify",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    Transport,
    Validation,
    Backup,
    Cancelled,
}

/// Why a host did not finish.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HostError {
    /// Remote operation failed or timed out
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Syntax-check, reachability or reload command exited non-zero
    #[error("{host}: '{command}' failed (exit {code}): {output}")]
    Validation {
        host: String,
        command: String,
        code: String,
        output: String,
    },

    /// The backup record could not be persisted; nothing was written
    #[error("{host}: cannot record backup: {message}")]
    Backup { host: String, message: String },

    /// Cancellation observed between steps
    #[error("{host}: cancelled before {stage}")]
    Cancelled { host: String, stage: Stage },
}

impl HostError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Transport(_) => FailureKind::Transport,
            Self::Validation { .. } => FailureKind::Validation,
            Self::Backup { .. } => FailureKind::Backup,
            Self::Cancelled { .. } => FailureKind::Cancelled,
        }
    }
}

impl Serialize for HostError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("HostError", 2)?;
        state.serialize_field("kind", &self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostStatus {
    Succeeded,
    DryRun,
    Failed,
    /// Not attempted because an earlier host failed with `stop_on_first_failure`
    Skipped,
    Cancelled,
}

impl fmt::Display for HostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Succeeded => "succeeded",
            Self::DryRun => "dry-run",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostOutcome {
    pub host: String,
    pub status: HostStatus,
    /// Last stage entered.
    pub stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<HostError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_id: Option<String>,
    pub rolled_back: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollback_error: Option<String>,
    /// Remote paths written.
    pub files: Vec<String>,
    /// Actions a dry run would have taken.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub planned: Vec<String>,
}

impl HostOutcome {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            status: HostStatus::Skipped,
            stage: Stage::Init,
            error: None,
            backup_id: None,
            rolled_back: false,
            rollback_error: None,
            files: Vec::new(),
            planned: Vec::new(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status == HostStatus::Failed
    }
}

/// Result of one administrative `PUT`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminOutcome {
    /// Request path, e.g. `/_index_template/payments-api-logs`.
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Not sent because the deployment was cancelled first.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub cancelled: bool,
}

impl AdminOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none() && self.status.is_some_and(|s| (200..300).contains(&s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentStatus {
    Succeeded,
    PartiallyFailed,
    Failed,
    DryRun,
    Cancelled,
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Succeeded => "succeeded",
            Self::PartiallyFailed => "partially-failed",
            Self::Failed => "failed",
            Self::DryRun => "dry-run",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeploymentReport {
    pub id: String,
    pub service: String,
    pub environment: String,
    pub dry_run: bool,
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
    pub hosts: Vec<HostOutcome>,
    pub admin: Vec<AdminOutcome>,
    pub status: DeploymentStatus,
    /// Channels that failed to deliver the summary.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notification_errors: Vec<String>,
}

impl DeploymentReport {
    /// Overall status from the host and admin outcomes.
    /// Overall status. A cancellation counts only when it stopped work: a
    /// host or an admin call that never ran.
    pub fn compute_status(dry_run: bool, hosts: &[HostOutcome], admin: &[AdminOutcome]) -> DeploymentStatus {
        if dry_run {
            return DeploymentStatus::DryRun;
        }
        if hosts.iter().any(|h| h.status == HostStatus::Cancelled) || admin.iter().any(|a| a.cancelled) {
            return DeploymentStatus::Cancelled;
        }
        let succeeded = hosts.iter().filter(|h| h.status == HostStatus::Succeeded).count();
        let admin_ok = admin.iter().all(AdminOutcome::succeeded);
        if succeeded == hosts.len() && admin_ok {
            DeploymentStatus::Succeeded
        } else if succeeded == 0 {
            DeploymentStatus::Failed
        } else {
            DeploymentStatus::PartiallyFailed
        }
    }

    pub fn failed_hosts(&self) -> Vec<&HostOutcome> {
        self.hosts.iter().filter(|h| h.is_failure()).collect()
    }

    /// Whether any failure was a validation failure.
    pub fn has_validation_failure(&self) -> bool {
        self.hosts
            .iter()
            .filter_map(|h| h.error.as_ref())
            .any(|e| e.kind() == FailureKind::Validation)
    }

    /// Plain-text summary for notifications.
    pub fn summary(&self) -> String {
        let mut text = format!(
            "Deployment {} of {} to {}: {}\n\n",
            self.id, self.service, self.environment, self.status
        );
        for host in &self.hosts {
            text.push_str(&format!("  {:<24} {:<10} stage={}", host.host, host.status.to_string(), host.stage));
            if host.rolled_back {
                text.push_str(" (rolled back)");
            }
            text.push('\n');
            if let Some(error) = &host.error {
                text.push_str(&format!("      {}\n", error));
            }
        }
        for call in &self.admin {
            let status = match (&call.status, &call.error) {
                (_, Some(error)) => error.clone(),
                (Some(code), None) => format!("HTTP {}", code),
                (None, None) => "not sent".to_string(),
            };
            text.push_str(&format!("  PUT {} -> {}\n", call.path, status));
        }
        text
    }
}
