//! The deployment state machine
//!
//! ```text
//! Init ─► DryRunCheck ─► Backup ─► Transfer ─► PostValidate ─► Notify ─► Done
//!                 │        └──────────┴────────────┴──► Failed (rollback)
//!                 └─► (dry run) log planned actions ─► Done
//! ```
//!
//! Backup, Transfer and PostValidate run per host, strictly in that order, on
//! up to `concurrency` scoped worker threads.

use super::admin::{AdminClient, HttpAdminClient};
use super::cancel::CancelToken;
use super::notify::{Notification, NotifierSet};
use super::report::{
    AdminOutcome, DeploymentReport, DeploymentStatus, HostError, HostOutcome, HostStatus, Stage,
};
use crate::artifacts::{ArtifactGroup, ArtifactSet};
use crate::backup::{self, BackupLog, BackupRecord, BackupTarget};
use crate::config::InfraConfig;
use crate::transport::{self, RemoteTransport};
use crate::{Error, Result};
use chrono::Utc;
use mon_model::Host;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// A file to place on every host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    pub remote_path: String,
    pub backup_dir: String,
    pub content: String,
}

/// What one host goes through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentPlan {
    pub files: Vec<PlannedFile>,
    /// Run after transfer; any failure rolls the host back.
    pub validations: Vec<String>,
    /// Run after successful validation.
    pub reloads: Vec<String>,
}

impl DeploymentPlan {
    pub fn for_set(config: &InfraConfig, set: &ArtifactSet) -> Self {
        let mut plan = Self::default();
        for artifact in &set.artifacts {
            let (dir, backup_dir) = match artifact.group {
                ArtifactGroup::CheckSystem => (&config.check_system.config_dir, &config.check_system.backup_dir),
                ArtifactGroup::LogCollector => (
                    &config.log_pipeline.collector_config_dir,
                    &config.log_pipeline.backup_dir,
                ),
                ArtifactGroup::LogProcessor => (
                    &config.log_pipeline.processor_config_dir,
                    &config.log_pipeline.backup_dir,
                ),
                _ => continue,
            };
            plan.files.push(PlannedFile {
                remote_path: format!("{}/{}", dir.trim_end_matches('/'), artifact.name),
                backup_dir: backup_dir.clone(),
                content: artifact.content.clone(),
            });
        }

        let checks = set.has_checks();
        let logs = set
            .artifacts
            .iter()
            .any(|a| matches!(a.group, ArtifactGroup::LogCollector | ArtifactGroup::LogProcessor));
        if config.general.validate_after_deploy {
            if let (true, Some(command)) = (checks, &config.check_system.validate_command) {
                plan.validations.push(command.clone());
            }
            if let (true, Some(command)) = (logs, &config.log_pipeline.reachability_command) {
                plan.validations.push(command.clone());
            }
        }
        if let (true, Some(command)) = (checks, &config.check_system.reload_command) {
            plan.reloads.push(command.clone());
        }
        plan
    }

    fn backup_targets(&self) -> Vec<BackupTarget> {
        self.files
            .iter()
            .map(|f| BackupTarget {
                remote_path: f.remote_path.clone(),
                backup_dir: f.backup_dir.clone(),
            })
            .collect()
    }
}

pub struct Deployer<'a> {
    config: &'a InfraConfig,
    transport: Arc<dyn RemoteTransport>,
    admin: Option<Box<dyn AdminClient>>,
    notifiers: NotifierSet,
    backups: BackupLog,
    cancel: CancelToken,
}

impl<'a> Deployer<'a> {
    pub fn new(config: &'a InfraConfig, transport: Arc<dyn RemoteTransport>) -> Self {
        Self {
            config,
            transport,
            admin: None,
            notifiers: NotifierSet::new(),
            backups: BackupLog::new(config.backups_log()),
            cancel: CancelToken::new(),
        }
    }

    /// Deployer for `environment` with the configured transport, channels
    /// and, when `with_admin` is set, the administrative endpoint.
    pub fn from_config(config: &'a InfraConfig, environment: &str, with_admin: bool) -> Result<Self> {
        let settings = config.environment(environment)?;
        let timeout = Duration::from_secs(config.general.command_timeout_secs);
        let transport = transport::connect(
            &settings.transport,
            &format!("environments.{}", environment),
            timeout,
        )?;
        let mut deployer =
            Self::new(config, transport).with_notifiers(NotifierSet::from_config(&config.notifications, timeout)?);
        if with_admin {
            if let Some(client) = HttpAdminClient::from_config(&config.log_pipeline)? {
                deployer = deployer.with_admin(Box::new(client));
            }
        }
        Ok(deployer)
    }

    pub fn with_admin(mut self, admin: Box<dyn AdminClient>) -> Self {
        self.admin = Some(admin);
        self
    }

    pub fn with_notifiers(mut self, notifiers: NotifierSet) -> Self {
        self.notifiers = notifiers;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Deploy `set` to every host of its environment.
    pub fn deploy(&self, set: &ArtifactSet) -> Result<DeploymentReport> {
        let started = Utc::now();
        let id = uuid::Uuid::new_v4().to_string();
        let environment = set.environment.as_str();
        let dry_run = self.config.general.dry_run;

        tracing::info!(
            deployment = %id,
            environment,
            hosts = set.hosts.len(),
            transport = self.transport.name(),
            dry_run,
            stage = %Stage::Init,
            "starting deployment"
        );
        if set.hosts.is_empty() {
            return Err(Error::NoHosts {
                environment: environment.to_string(),
            });
        }
        let plan = DeploymentPlan::for_set(self.config, set);
        tracing::debug!(stage = %Stage::DryRunCheck, dry_run, files = plan.files.len(), "evaluated dry-run gate");

        let hosts = if dry_run {
            set.hosts.iter().map(|host| self.simulate_host(host, &plan)).collect()
        } else {
            self.run_hosts(environment, &set.hosts, &plan)
        };

        let admin = if hosts.iter().any(|h| matches!(h.status, HostStatus::Succeeded | HostStatus::DryRun)) {
            self.register_assets(set, dry_run)
        } else {
            Vec::new()
        };

        let status = DeploymentReport::compute_status(dry_run, &hosts, &admin);
        let mut report = DeploymentReport {
            id,
            service: set.service.clone(),
            environment: environment.to_string(),
            dry_run,
            started,
            finished: Utc::now(),
            hosts,
            admin,
            status,
            notification_errors: Vec::new(),
        };

        let notification = Notification {
            subject: format!("[monforge] {} {}: {}", report.service, report.environment, report.status),
            body: report.summary(),
            success: report.status == DeploymentStatus::Succeeded,
            environment: report.environment.clone(),
        };
        if dry_run {
            tracing::info!(stage = %Stage::Notify, dry_run, "would send: {}", notification.subject);
        } else {
            report.notification_errors = self.notifiers.notify(&notification);
        }

        tracing::info!(
            deployment = %report.id,
            environment,
            status = %report.status,
            stage = %Stage::Done,
            "deployment finished"
        );
        Ok(report)
    }

    fn run_hosts(&self, environment: &str, hosts: &[Host], plan: &DeploymentPlan) -> Vec<HostOutcome> {
        let workers = self.config.general.concurrency.clamp(1, hosts.len().max(1));
        let next = AtomicUsize::new(0);
        let halt = AtomicBool::new(false);
        let results: Mutex<Vec<Option<HostOutcome>>> = Mutex::new(vec![None; hosts.len()]);

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    loop {
                        let index = next.fetch_add(1, Ordering::SeqCst);
                        let Some(host) = hosts.get(index) else {
                            break;
                        };
                        let outcome = if self.cancel.is_cancelled() {
                            HostOutcome {
                                status: HostStatus::Cancelled,
                                error: Some(HostError::Cancelled {
                                    host: host.identifier.clone(),
                                    stage: Stage::Backup,
                                }),
                                ..HostOutcome::new(&host.identifier)
                            }
                        } else if halt.load(Ordering::SeqCst) {
                            tracing::warn!(host = %host.identifier, "skipped after an earlier host failed");
                            HostOutcome::new(&host.identifier)
                        } else {
                            self.deploy_host(environment, host, plan)
                        };
                        if outcome.is_failure() && self.config.general.stop_on_first_failure {
                            halt.store(true, Ordering::SeqCst);
                        }
                        results.lock().unwrap_or_else(PoisonError::into_inner)[index] = Some(outcome);
                    }
                });
            }
        });

        results
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .into_iter()
            .zip(hosts)
            .map(|(outcome, host)| outcome.unwrap_or_else(|| HostOutcome::new(&host.identifier)))
            .collect()
    }

    /// Backup, Transfer and PostValidate for one host.
    fn deploy_host(&self, environment: &str, host: &Host, plan: &DeploymentPlan) -> HostOutcome {
        let transport = self.transport.as_ref();
        let mut outcome = HostOutcome::new(&host.identifier);

        outcome.stage = Stage::Backup;
        let record = if self.config.general.backup_before_deploy {
            match backup::create(transport, host, environment, &plan.backup_targets()) {
                Ok(record) => {
                    if let Err(e) = self.backups.append(&record) {
                        let error = HostError::Backup {
                            host: host.identifier.clone(),
                            message: e.to_string(),
                        };
                        return self.abort(host, outcome, error, None);
                    }
                    outcome.backup_id = Some(record.id.clone());
                    Some(record)
                }
                Err(e) => return self.abort(host, outcome, e.into(), None),
            }
        } else {
            tracing::warn!(host = %host.identifier, "backups disabled; failures cannot be rolled back");
            None
        };

        if self.cancel.is_cancelled() {
            let error = HostError::Cancelled {
                host: host.identifier.clone(),
                stage: Stage::Transfer,
            };
            return self.abort(host, outcome, error, record.as_ref());
        }

        outcome.stage = Stage::Transfer;
        for file in &plan.files {
            if let Err(e) = transport.write_file(host, &file.remote_path, file.content.as_bytes()) {
                return self.abort(host, outcome, e.into(), record.as_ref());
            }
            tracing::debug!(host = %host.identifier, path = %file.remote_path, stage = "transfer", "wrote");
            outcome.files.push(file.remote_path.clone());
        }
        tracing::info!(host = %host.identifier, files = outcome.files.len(), stage = %Stage::Transfer, "transferred");

        if self.cancel.is_cancelled() {
            let error = HostError::Cancelled {
                host: host.identifier.clone(),
                stage: Stage::PostValidate,
            };
            return self.abort(host, outcome, error, record.as_ref());
        }

        outcome.stage = Stage::PostValidate;
        for command in plan.validations.iter().chain(&plan.reloads) {
            match transport.run(host, command) {
                Ok(output) if output.success() => {
                    tracing::debug!(host = %host.identifier, command = %command, "command succeeded");
                }
                Ok(output) => {
                    let error = HostError::Validation {
                        host: host.identifier.clone(),
                        command: command.clone(),
                        code: output.code.map_or_else(|| "signal".to_string(), |c| c.to_string()),
                        output: output.summary(),
                    };
                    return self.abort(host, outcome, error, record.as_ref());
                }
                Err(e) => return self.abort(host, outcome, e.into(), record.as_ref()),
            }
        }

        outcome.stage = Stage::Done;
        outcome.status = HostStatus::Succeeded;
        tracing::info!(host = %host.identifier, stage = %Stage::PostValidate, "host deployed");
        outcome
    }

    /// Mark the host failed or cancelled and roll back what was written.
    fn abort(
        &self,
        host: &Host,
        mut outcome: HostOutcome,
        error: HostError,
        record: Option<&BackupRecord>,
    ) -> HostOutcome {
        outcome.status = match error {
            HostError::Cancelled { .. } => HostStatus::Cancelled,
            _ => HostStatus::Failed,
        };
        tracing::error!(host = %host.identifier, stage = %outcome.stage, "{}", error);
        outcome.error = Some(error);

        if outcome.stage >= Stage::Transfer {
            match record {
                Some(record) => match backup::restore(self.transport.as_ref(), host, record) {
                    Ok(()) => outcome.rolled_back = true,
                    Err(e) => outcome.rollback_error = Some(e.to_string()),
                },
                None if !outcome.files.is_empty() => {
                    tracing::warn!(host = %host.identifier, "no backup taken; host left with new files");
                }
                None => {}
            }
        }
        outcome
    }

    /// Log every action without touching the host.
    fn simulate_host(&self, host: &Host, plan: &DeploymentPlan) -> HostOutcome {
        let mut outcome = HostOutcome::new(&host.identifier);
        let mut plan_step = |stage: Stage, action: String| {
            tracing::info!(host = %host.identifier, stage = %stage, dry_run = true, "would {}", action);
            outcome.planned.push(action);
        };

        if self.config.general.backup_before_deploy {
            for file in &plan.files {
                plan_step(Stage::Backup, format!("back up {} into {}", file.remote_path, file.backup_dir));
            }
        }
        for file in &plan.files {
            plan_step(
                Stage::Transfer,
                format!("write {} ({} bytes)", file.remote_path, file.content.len()),
            );
        }
        for command in plan.validations.iter().chain(&plan.reloads) {
            plan_step(Stage::PostValidate, format!("run '{}'", command));
        }

        outcome.stage = Stage::Done;
        outcome.status = HostStatus::DryRun;
        outcome
    }

    /// Register the ingest pipeline and index template, once per deployment.
    fn register_assets(&self, set: &ArtifactSet, dry_run: bool) -> Vec<AdminOutcome> {
        let Some(asset) = set.asset_name.as_deref() else {
            return Vec::new();
        };
        let Some(client) = self.admin.as_deref() else {
            if set.group(ArtifactGroup::AdminApi).next().is_some() {
                tracing::debug!("no admin endpoint configured; ingest pipeline and index template not registered");
            }
            return Vec::new();
        };

        let mut outcomes = Vec::new();
        for (name, prefix) in [
            ("ingest_pipeline.json", "/_ingest/pipeline/"),
            ("index_template.json", "/_index_template/"),
        ] {
            let Some(artifact) = set.get(name) else {
                continue;
            };
            let path = format!("{}{}", prefix, asset);
            if dry_run {
                tracing::info!(path = %path, dry_run, stage = "transfer", "would PUT");
                outcomes.push(AdminOutcome {
                    path,
                    status: None,
                    error: None,
                    cancelled: false,
                });
                continue;
            }
            if self.cancel.is_cancelled() {
                tracing::warn!(path = %path, "cancelled; not registered");
                outcomes.push(AdminOutcome {
                    path,
                    status: None,
                    error: Some("cancelled before registration".into()),
                    cancelled: true,
                });
                continue;
            }
            let outcome = match client.put_json(&path, &artifact.content) {
                Ok(status) => AdminOutcome {
                    path,
                    status: Some(status),
                    error: None,
                    cancelled: false,
                },
                Err(message) => AdminOutcome {
                    path,
                    status: None,
                    error: Some(message),
                    cancelled: false,
                },
            };
            if outcome.succeeded() {
                tracing::info!(path = %outcome.path, "registered");
            } else {
                tracing::error!(path = %outcome.path, status = ?outcome.status, error = ?outcome.error, "admin call failed");
            }
            outcomes.push(outcome);
        }
        outcomes
    }
}
