//! Staging sessions and their persisted log
//!
//! ```text
//! staged ─► awaiting-manual-step ─► validated
//!   │                 └──────────► failed
//!   └──► failed
//! ```
//!
//! Each state change appends a full snapshot to `sessions.jsonl`; the last
//! snapshot of an id is its current state.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use mon_fs::{JsonLines, NormalizedPath};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    Staged,
    AwaitingManualStep,
    Validated,
    Failed,
}

impl SessionStatus {
    /// Allowed transitions. There is no way out of `awaiting-manual-step`
    /// other than validation.
    pub fn can_become(self, next: SessionStatus) -> bool {
        matches!(
            (self, next),
            (Self::Staged, Self::AwaitingManualStep)
                | (Self::Staged, Self::Failed)
                | (Self::AwaitingManualStep, Self::Validated)
                | (Self::AwaitingManualStep, Self::Failed)
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Staged => "staged",
            Self::AwaitingManualStep => "awaiting-manual-step",
            Self::Validated => "validated",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileStatus {
    /// Transferred in this session
    Staged,
    /// Same checksum as the previous session; not transferred
    Unchanged,
    /// Failed local pre-validation
    Rejected,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Staged => "staged",
            Self::Unchanged => "unchanged",
            Self::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedFile {
    pub name: String,
    pub checksum: String,
    pub status: FileStatus,
    /// Where the import tool reads the file.
    pub import_path: String,
    /// Per-session copy, for staged files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_path: Option<String>,
    /// Previous import file, when one existed and backups are enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSession {
    pub id: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub service: String,
    pub environment: String,
    /// Staging host.
    pub host: String,
    pub status: SessionStatus,
    pub files: Vec<StagedFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// Failure reason, naming the failing file or check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DeploymentSession {
    pub fn new(service: impl Into<String>, environment: impl Into<String>, host: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created: now,
            updated: now,
            service: service.into(),
            environment: environment.into(),
            host: host.into(),
            status: SessionStatus::Staged,
            files: Vec::new(),
            instructions: None,
            message: None,
        }
    }

    pub fn file(&self, name: &str) -> Option<&StagedFile> {
        self.files.iter().find(|f| f.name == name)
    }

    pub fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|f| f.status == status).count()
    }

    /// Move to `next`, refusing transitions the state machine does not have.
    pub fn transition(&mut self, next: SessionStatus, message: Option<String>) -> Result<()> {
        if !self.status.can_become(next) {
            return Err(Error::InvalidSessionState {
                id: self.id.clone(),
                status: self.status.to_string(),
                action: format!("moving to {}", next),
                required: match next {
                    SessionStatus::AwaitingManualStep => "staged".into(),
                    SessionStatus::Validated => "awaiting-manual-step".into(),
                    _ => "a non-final status".into(),
                },
            });
        }
        tracing::info!(session = %self.id, from = %self.status, to = %next, "session transition");
        self.status = next;
        self.updated = Utc::now();
        if message.is_some() {
            self.message = message;
        }
        Ok(())
    }
}

/// `sessions.jsonl`
#[derive(Debug, Clone)]
pub struct SessionLog {
    log: JsonLines<DeploymentSession>,
}

impl SessionLog {
    pub fn new(path: NormalizedPath) -> Self {
        Self {
            log: JsonLines::new(path),
        }
    }

    /// Persist a snapshot of `session`.
    pub fn record(&self, session: &DeploymentSession) -> Result<()> {
        Ok(self.log.append(session)?)
    }

    /// Current state of every session, oldest first.
    pub fn sessions(&self) -> Result<Vec<DeploymentSession>> {
        let mut order = Vec::new();
        let mut latest: HashMap<String, DeploymentSession> = HashMap::new();
        for snapshot in self.log.read_all()? {
            if !latest.contains_key(&snapshot.id) {
                order.push(snapshot.id.clone());
            }
            latest.insert(snapshot.id.clone(), snapshot);
        }
        Ok(order.into_iter().filter_map(|id| latest.remove(&id)).collect())
    }

    /// Look a session up by id or unique id prefix.
    pub fn get(&self, id: &str) -> Result<DeploymentSession> {
        let mut matches: Vec<DeploymentSession> = self
            .sessions()?
            .into_iter()
            .filter(|s| s.id == id || (id.len() >= 8 && s.id.starts_with(id)))
            .collect();
        match matches.len() {
            1 => Ok(matches.remove(0)),
            _ => Err(Error::SessionNotFound { id: id.to_string() }),
        }
    }

    /// Most recent session of `environment` whose files reached the staging
    /// host: awaiting the manual step or validated.
    pub fn baseline(&self, environment: &str) -> Result<Option<DeploymentSession>> {
        Ok(self.sessions()?.into_iter().rev().find(|s| {
            s.environment.eq_ignore_ascii_case(environment)
                && matches!(s.status, SessionStatus::AwaitingManualStep | SessionStatus::Validated)
        }))
    }
}
