//! Staged import into a check-system front end without an API
//!
//! Staging prepares the object files on the import host and writes
//! instructions for the operator; validation, run later and separately,
//! checks that the import happened. Files whose checksum matches the
//! previous session of the environment are not transferred again.

use super::session::{DeploymentSession, FileStatus, SessionLog, SessionStatus, StagedFile};
use crate::artifacts::ArtifactSet;
use crate::config::{InfraConfig, StagedImportConfig};
use crate::deploy::{Notification, NotifierSet};
use crate::transport::{self, RemoteTransport, TransportError};
use crate::{Error, Result};
use mon_checks::validate_object_set;
use mon_fs::{NormalizedPath, compute_content_checksum};
use mon_model::{Host, HostKind};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

pub struct StagedImportAdapter<'a> {
    settings: &'a StagedImportConfig,
    transport: Arc<dyn RemoteTransport>,
    host: Host,
    sessions: SessionLog,
    instructions_dir: NormalizedPath,
    notifiers: NotifierSet,
}

impl<'a> StagedImportAdapter<'a> {
    pub fn new(config: &'a InfraConfig, transport: Arc<dyn RemoteTransport>) -> Result<Self> {
        let settings = config.staged_import()?;
        Ok(Self {
            settings,
            transport,
            host: Host::new(HostKind::Host, settings.host.clone()),
            sessions: SessionLog::new(config.sessions_log()),
            instructions_dir: config.instructions_dir(),
            notifiers: NotifierSet::new(),
        })
    }

    /// Adapter with the configured transport and notification channels.
    pub fn from_config(config: &'a InfraConfig) -> Result<Self> {
        let settings = config.staged_import()?;
        let timeout = Duration::from_secs(config.general.command_timeout_secs);
        let transport = transport::connect(&settings.transport, "staged_import", timeout)?;
        Ok(Self::new(config, transport)?.with_notifiers(NotifierSet::from_config(&config.notifications, timeout)?))
    }

    pub fn with_notifiers(mut self, notifiers: NotifierSet) -> Self {
        self.notifiers = notifiers;
        self
    }

    pub fn sessions(&self) -> &SessionLog {
        &self.sessions
    }

    fn import_path(&self, name: &str) -> String {
        format!("{}/{}", self.settings.import_dir.trim_end_matches('/'), name)
    }

    /// Stage the check-system files of `set`.
    ///
    /// Returns the session in `awaiting-manual-step`, or in `failed` when
    /// local pre-validation rejected a file. Transport errors are persisted
    /// as a failed session and returned as errors.
    pub fn stage(&self, set: &ArtifactSet) -> Result<DeploymentSession> {
        let files = set.check_files();
        if files.is_empty() {
            return Err(Error::config("stage", "artifact set contains no check-system files"));
        }

        let baseline = self.sessions.baseline(&set.environment)?;
        let mut session = DeploymentSession::new(&set.service, &set.environment, &self.host.identifier);
        for (name, content) in &files {
            let checksum = compute_content_checksum(content);
            let unchanged = baseline
                .as_ref()
                .and_then(|b| b.file(name))
                .is_some_and(|previous| previous.checksum == checksum);
            session.files.push(StagedFile {
                name: name.to_string(),
                checksum,
                status: if unchanged { FileStatus::Unchanged } else { FileStatus::Staged },
                import_path: self.import_path(name),
                session_path: None,
                backup_path: None,
            });
        }
        self.sessions.record(&session)?;
        tracing::info!(
            session = %session.id,
            environment = %session.environment,
            staged = session.count(FileStatus::Staged),
            unchanged = session.count(FileStatus::Unchanged),
            "staging"
        );

        if let Some(message) = self.prevalidate(&mut session, &files) {
            session.transition(SessionStatus::Failed, Some(message))?;
            self.sessions.record(&session)?;
            return Ok(session);
        }

        let mut replaced = Vec::new();
        if let Err(error) = self.transfer(&mut session, &files, &mut replaced) {
            self.restore_import_files(&session, &replaced);
            session.transition(SessionStatus::Failed, Some(error.to_string()))?;
            self.sessions.record(&session)?;
            return Err(error.into());
        }

        let instructions = self.instructions_dir.join(&format!("{}.txt", session.id));
        let text = self.instructions(&session);
        mon_fs::io::write_text(&instructions, &text)?;
        session.instructions = Some(instructions.as_str().to_string());

        let notification = Notification {
            subject: format!(
                "[monforge] {} {}: manual import required (session {})",
                session.service, session.environment, session.id
            ),
            body: text,
            success: true,
            environment: session.environment.clone(),
        };
        for error in self.notifiers.notify(&notification) {
            tracing::warn!(session = %session.id, "{}", error);
        }

        session.transition(SessionStatus::AwaitingManualStep, None)?;
        self.sessions.record(&session)?;
        Ok(session)
    }

    /// Syntax-check the whole object set, since files reference each other.
    /// Every file with issues is rejected, unchanged ones included, because
    /// the operator imports the full set. Returns the failure message,
    /// naming the files.
    fn prevalidate(&self, session: &mut DeploymentSession, files: &[(&str, &str)]) -> Option<String> {
        let issues = validate_object_set(files.iter().copied());
        if issues.is_empty() {
            return None;
        }
        let bad: BTreeSet<&str> = issues.iter().map(|i| i.file.as_str()).collect();
        for file in &mut session.files {
            if bad.contains(file.name.as_str()) {
                file.status = FileStatus::Rejected;
            }
        }
        for issue in &issues {
            tracing::error!(session = %session.id, "{}", issue);
        }
        let first = issues
            .iter()
            .map(ToString::to_string)
            .next()
            .unwrap_or_default();
        Some(format!(
            "pre-validation failed for {}: {}",
            bad.into_iter().collect::<Vec<_>>().join(", "),
            first
        ))
    }

    /// Copy staged files to the import host. `replaced` collects the prior
    /// content of every import file about to be overwritten, so that a
    /// failed transfer can put the import directory back.
    fn transfer(
        &self,
        session: &mut DeploymentSession,
        files: &[(&str, &str)],
        replaced: &mut Vec<(String, Option<Vec<u8>>)>,
    ) -> std::result::Result<(), TransportError> {
        let import_dir = self.settings.import_dir.trim_end_matches('/');
        let backup_dir = self.settings.backup_dir.trim_end_matches('/');
        for (file, (name, content)) in session.files.iter_mut().zip(files) {
            if file.status != FileStatus::Staged {
                continue;
            }
            let existing = self.transport.read_file(&self.host, &file.import_path)?;
            if let (true, Some(existing)) = (self.settings.create_backups, &existing) {
                let path = format!("{}/{}/{}", backup_dir, session.id, name);
                self.transport.write_file(&self.host, &path, existing)?;
                file.backup_path = Some(path);
            }
            let session_path = format!("{}/{}/{}", import_dir, session.id, name);
            self.transport.write_file(&self.host, &session_path, content.as_bytes())?;
            replaced.push((file.import_path.clone(), existing));
            self.transport.write_file(&self.host, &file.import_path, content.as_bytes())?;
            file.session_path = Some(session_path);
            tracing::debug!(session = %session.id, file = %name, "staged");
        }
        Ok(())
    }

    /// Put back the import files a failed transfer touched. Failures are
    /// logged; the transfer error is what gets reported.
    fn restore_import_files(&self, session: &DeploymentSession, replaced: &[(String, Option<Vec<u8>>)]) {
        for (path, previous) in replaced.iter().rev() {
            let restored = match previous {
                Some(content) => self.transport.write_file(&self.host, path, content),
                None => self.transport.remove_file(&self.host, path),
            };
            match restored {
                Ok(()) => tracing::info!(session = %session.id, path = %path, "import file restored"),
                Err(error) => tracing::error!(session = %session.id, "cannot restore {}: {}", path, error),
            }
        }
    }

    /// Operator instructions for a staged session.
    pub fn instructions(&self, session: &DeploymentSession) -> String {
        let import_dir = &self.settings.import_dir;
        let mut text = String::from("Monforge staged import\n======================\n\n");
        text.push_str(&format!("Session:      {}\n", session.id));
        text.push_str(&format!("Service:      {}\n", session.service));
        text.push_str(&format!("Environment:  {}\n", session.environment));
        text.push_str(&format!("Staging host: {}\n", session.host));
        text.push_str(&format!("Created:      {}\n\n", session.created.to_rfc3339()));

        text.push_str(&format!("Files in {}:\n", import_dir));
        for file in &session.files {
            text.push_str(&format!(
                "  [{:<9}] {:<14} {}\n",
                file.status.to_string(),
                file.name,
                file.checksum
            ));
        }
        text.push('\n');

        if session.count(FileStatus::Staged) == 0 {
            text.push_str("No file changed since the previous session. Re-import only if the\n");
            text.push_str("previous import was not completed.\n\n");
        }

        text.push_str("Steps:\n");
        match &self.settings.web_url {
            Some(url) => text.push_str(&format!("  1. Open the NagiosQL web interface at {}\n", url)),
            None => text.push_str(&format!("  1. Open the NagiosQL web interface on {}\n", session.host)),
        }
        text.push_str("  2. Go to Tools > Data import.\n");
        let order: Vec<&str> = session.files.iter().map(|f| f.name.as_str()).collect();
        text.push_str(&format!(
            "  3. Select the files from {} in this order: {}\n",
            import_dir,
            order.join(", ")
        ));
        text.push_str("     and enable \"Overwrite database\".\n");
        text.push_str("  4. Start the import and check that every object was imported.\n");
        text.push_str(
            "  5. Go to Tools > Nagios control: write the configuration files, check them and restart.\n",
        );
        text.push_str(&format!("  6. Confirm with: monforge validate-import {}\n", session.id));
        if let Some(dir) = session.files.iter().find_map(|f| f.backup_path.as_deref()) {
            text.push_str(&format!(
                "\nPrevious import files were saved under {}.\n",
                dir.rsplit_once('/').map_or(dir, |(parent, _)| parent)
            ));
        }
        text
    }

    /// Verify a session after the manual import. Only sessions awaiting the
    /// manual step can be validated; the result is final.
    pub fn validate_import(&self, id: &str) -> Result<DeploymentSession> {
        let mut session = self.sessions.get(id)?;
        if session.status != SessionStatus::AwaitingManualStep {
            return Err(Error::InvalidSessionState {
                id: session.id.clone(),
                status: session.status.to_string(),
                action: "validate-import".into(),
                required: SessionStatus::AwaitingManualStep.to_string(),
            });
        }

        let outcome = match self.verify(&session) {
            Ok(None) => session.transition(SessionStatus::Validated, None),
            Ok(Some(message)) => session.transition(SessionStatus::Failed, Some(message)),
            Err(error) => session.transition(SessionStatus::Failed, Some(error.to_string())),
        };
        outcome?;
        self.sessions.record(&session)?;

        match session.status {
            SessionStatus::Validated => tracing::info!(session = %session.id, "import validated"),
            _ => tracing::error!(
                session = %session.id,
                "import validation failed: {}",
                session.message.as_deref().unwrap_or("")
            ),
        }
        Ok(session)
    }

    /// First failing check, if any.
    fn verify(&self, session: &DeploymentSession) -> std::result::Result<Option<String>, TransportError> {
        for file in &session.files {
            match self.transport.read_file(&self.host, &file.import_path)? {
                None => return Ok(Some(format!("{} is missing at {}", file.name, file.import_path))),
                Some(content) => {
                    let found = compute_content_checksum(&content);
                    if found != file.checksum {
                        return Ok(Some(format!(
                            "{} at {} has checksum {}, expected {}",
                            file.name, file.import_path, found, file.checksum
                        )));
                    }
                }
            }
        }
        for command in &self.settings.verify_commands {
            let output = self.transport.run(&self.host, command)?;
            if !output.success() {
                return Ok(Some(format!(
                    "verification command '{}' exited with {}: {}",
                    command,
                    output.code.map_or_else(|| "signal".to_string(), |c| c.to_string()),
                    output.summary()
                )));
            }
        }
        Ok(None)
    }
}
