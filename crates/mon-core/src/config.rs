//! Infrastructure configuration
//!
//! [`InfraConfig`] is loaded once per invocation and threaded explicitly
//! through generation, deployment and staging. Credentials are never stored
//! in the file: credential fields hold `${VAR}` references that resolve from
//! the process environment when used.

use crate::{Error, Result};
use mon_fs::{ConfigStore, NormalizedPath};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

fn default_state_dir() -> PathBuf {
    PathBuf::from(".monforge")
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    4
}

fn default_command_timeout() -> u64 {
    60
}

fn default_discovery_timeout() -> u64 {
    5
}

fn default_check_config_dir() -> String {
    "/etc/nagios/objects".to_string()
}

fn default_check_backup_dir() -> String {
    "/var/backups/monforge/nagios".to_string()
}

fn default_collector_dir() -> String {
    "/etc/filebeat".to_string()
}

fn default_processor_dir() -> String {
    "/etc/logstash/conf.d".to_string()
}

fn default_log_backup_dir() -> String {
    "/var/backups/monforge/elastic".to_string()
}

fn default_admin_timeout() -> u64 {
    10
}

fn default_ssh_port() -> u16 {
    22
}

fn default_import_dir() -> String {
    "/var/lib/nagiosql/import".to_string()
}

fn default_import_backup_dir() -> String {
    "/var/lib/nagiosql/backup".to_string()
}

fn default_mail_command() -> String {
    "sendmail -t".to_string()
}

/// A credential held as a `${VAR}` reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Name of the referenced variable, or `None` if the value is not a
    /// well-formed `${VAR}` reference.
    pub fn variable(&self) -> Option<&str> {
        let name = self.0.trim().strip_prefix("${")?.strip_suffix('}')?;
        let mut chars = name.chars();
        let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        valid.then_some(name)
    }

    /// Read the referenced variable from the process environment.
    pub fn resolve(&self, field: &str) -> Result<String> {
        let variable = self.variable().ok_or_else(|| {
            Error::config(field, "credentials must be written as ${VAR} references")
        })?;
        std::env::var(variable).map_err(|_| Error::MissingSecret {
            variable: variable.to_string(),
            field: field.to_string(),
        })
    }
}

/// `[general]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default = "default_true")]
    pub backup_before_deploy: bool,
    #[serde(default = "default_true")]
    pub validate_after_deploy: bool,
    /// Hosts processed in parallel.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub stop_on_first_failure: bool,
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            dry_run: false,
            backup_before_deploy: true,
            validate_after_deploy: true,
            concurrency: default_concurrency(),
            stop_on_first_failure: false,
            command_timeout_secs: default_command_timeout(),
        }
    }
}

/// `[synthesis]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Reject unknown pattern tokens instead of matching them literally.
    #[serde(default)]
    pub strict_patterns: bool,
    #[serde(default)]
    pub discovery: bool,
    #[serde(default = "default_discovery_timeout")]
    pub discovery_timeout_secs: u64,
    /// Declarative check plugin files, loaded in order.
    #[serde(default)]
    pub plugin_files: Vec<PathBuf>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            strict_patterns: false,
            discovery: false,
            discovery_timeout_secs: default_discovery_timeout(),
            plugin_files: Vec::new(),
        }
    }
}

/// `[check_system]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckSystemConfig {
    #[serde(default = "default_check_config_dir")]
    pub config_dir: String,
    #[serde(default = "default_check_backup_dir")]
    pub backup_dir: String,
    #[serde(default)]
    pub validate_command: Option<String>,
    #[serde(default)]
    pub reload_command: Option<String>,
}

impl Default for CheckSystemConfig {
    fn default() -> Self {
        Self {
            config_dir: default_check_config_dir(),
            backup_dir: default_check_backup_dir(),
            validate_command: None,
            reload_command: None,
        }
    }
}

/// `[log_pipeline]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogPipelineConfig {
    #[serde(default = "default_collector_dir")]
    pub collector_config_dir: String,
    #[serde(default = "default_processor_dir")]
    pub processor_config_dir: String,
    #[serde(default = "default_log_backup_dir")]
    pub backup_dir: String,
    #[serde(default)]
    pub reachability_command: Option<String>,
    /// Search cluster administrative endpoint.
    #[serde(default)]
    pub admin_url: Option<String>,
    #[serde(default)]
    pub admin_user: Option<Secret>,
    #[serde(default)]
    pub admin_password: Option<Secret>,
    #[serde(default = "default_admin_timeout")]
    pub admin_timeout_secs: u64,
}

impl Default for LogPipelineConfig {
    fn default() -> Self {
        Self {
            collector_config_dir: default_collector_dir(),
            processor_config_dir: default_processor_dir(),
            backup_dir: default_log_backup_dir(),
            reachability_command: None,
            admin_url: None,
            admin_user: None,
            admin_password: None,
            admin_timeout_secs: default_admin_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Ssh,
    Local,
}

/// How hosts of an environment (or the staging host) are reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportSettings {
    #[serde(default)]
    pub transport: TransportKind,
    #[serde(default)]
    pub ssh_user: Option<String>,
    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,
    #[serde(default)]
    pub ssh_key: Option<Secret>,
    /// Directory holding one sub-directory per host, for `local`.
    #[serde(default)]
    pub local_root: Option<PathBuf>,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            transport: TransportKind::Ssh,
            ssh_user: None,
            ssh_port: default_ssh_port(),
            ssh_key: None,
            local_root: None,
        }
    }
}

/// `[environments.<NAME>]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(flatten)]
    pub transport: TransportSettings,
}

/// `[staged_import]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedImportConfig {
    /// Host running the import tool.
    pub host: String,
    #[serde(flatten)]
    pub transport: TransportSettings,
    #[serde(default = "default_import_dir")]
    pub import_dir: String,
    #[serde(default = "default_import_backup_dir")]
    pub backup_dir: String,
    /// Web interface of the import tool, quoted in instructions.
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(default = "default_true")]
    pub create_backups: bool,
    /// Commands that must exit 0 on the staging host after the manual import.
    #[serde(default)]
    pub verify_commands: Vec<String>,
}

/// `[notifications]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub webhook_url: Option<Secret>,
    #[serde(default)]
    pub email_recipients: Vec<String>,
    #[serde(default = "default_mail_command")]
    pub mail_command: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            email_recipients: Vec::new(),
            mail_command: default_mail_command(),
        }
    }
}

/// Command-line overrides applied on top of the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub dry_run: bool,
    pub no_backup: bool,
    pub concurrency: Option<usize>,
    pub stop_on_first_failure: bool,
    pub strict_patterns: bool,
    pub discover: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InfraConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    #[serde(default)]
    pub check_system: CheckSystemConfig,
    #[serde(default)]
    pub log_pipeline: LogPipelineConfig,
    #[serde(default)]
    pub environments: BTreeMap<String, EnvironmentConfig>,
    #[serde(default)]
    pub staged_import: Option<StagedImportConfig>,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

impl InfraConfig {
    /// Load and validate a configuration file. Relative paths in the file
    /// resolve against the file's directory.
    pub fn load(path: &NormalizedPath) -> Result<Self> {
        let mut config: Self = ConfigStore::new().load(path)?;
        let base = path
            .parent()
            .map(|p| p.to_native())
            .unwrap_or_default();
        config.resolve_relative(&base);
        config.validate()?;
        tracing::debug!(
            path = %path,
            environments = config.environments.len(),
            staged_import = config.staged_import.is_some(),
            "loaded infrastructure configuration"
        );
        Ok(config)
    }

    fn resolve_relative(&mut self, base: &Path) {
        let rebase = |p: &mut PathBuf| {
            if p.is_relative() && !base.as_os_str().is_empty() {
                *p = base.join(&*p);
            }
        };
        rebase(&mut self.general.state_dir);
        self.synthesis.plugin_files.iter_mut().for_each(rebase);
        for env in self.environments.values_mut() {
            if let Some(root) = env.transport.local_root.as_mut() {
                rebase(root);
            }
        }
        if let Some(root) = self
            .staged_import
            .as_mut()
            .and_then(|s| s.transport.local_root.as_mut())
        {
            rebase(root);
        }
    }

    /// Check value domains and credential references.
    pub fn validate(&self) -> Result<()> {
        if self.general.concurrency == 0 {
            return Err(Error::config("general.concurrency", "must be at least 1"));
        }
        if self.general.command_timeout_secs == 0 {
            return Err(Error::config("general.command_timeout_secs", "must be at least 1"));
        }
        for (field, dir) in [
            ("check_system.config_dir", &self.check_system.config_dir),
            ("check_system.backup_dir", &self.check_system.backup_dir),
            ("log_pipeline.collector_config_dir", &self.log_pipeline.collector_config_dir),
            ("log_pipeline.processor_config_dir", &self.log_pipeline.processor_config_dir),
            ("log_pipeline.backup_dir", &self.log_pipeline.backup_dir),
        ] {
            if !dir.starts_with('/') {
                return Err(Error::config(field, "must be an absolute remote path"));
            }
        }

        let mut secrets: Vec<(String, &Secret)> = Vec::new();
        if let Some(s) = &self.log_pipeline.admin_user {
            secrets.push(("log_pipeline.admin_user".into(), s));
        }
        if let Some(s) = &self.log_pipeline.admin_password {
            secrets.push(("log_pipeline.admin_password".into(), s));
        }
        if let Some(s) = &self.notifications.webhook_url {
            secrets.push(("notifications.webhook_url".into(), s));
        }
        for (name, env) in &self.environments {
            validate_transport(&format!("environments.{}", name), &env.transport)?;
            if let Some(s) = &env.transport.ssh_key {
                secrets.push((format!("environments.{}.ssh_key", name), s));
            }
        }
        if let Some(staged) = &self.staged_import {
            if staged.host.trim().is_empty() {
                return Err(Error::config("staged_import.host", "must not be empty"));
            }
            if !staged.import_dir.starts_with('/') {
                return Err(Error::config("staged_import.import_dir", "must be an absolute remote path"));
            }
            validate_transport("staged_import", &staged.transport)?;
            if let Some(s) = &staged.transport.ssh_key {
                secrets.push(("staged_import.ssh_key".into(), s));
            }
        }
        for (field, secret) in secrets {
            if secret.variable().is_none() {
                return Err(Error::config(
                    field,
                    "credentials must be written as ${VAR} references, not literal values",
                ));
            }
        }
        Ok(())
    }

    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if overrides.dry_run {
            self.general.dry_run = true;
        }
        if overrides.no_backup {
            self.general.backup_before_deploy = false;
        }
        if let Some(n) = overrides.concurrency {
            self.general.concurrency = n.max(1);
        }
        if overrides.stop_on_first_failure {
            self.general.stop_on_first_failure = true;
        }
        if overrides.strict_patterns {
            self.synthesis.strict_patterns = true;
        }
        if overrides.discover {
            self.synthesis.discovery = true;
        }
    }

    /// Connection settings for an environment, matched case-insensitively.
    pub fn environment(&self, name: &str) -> Result<&EnvironmentConfig> {
        self.environments
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, env)| env)
            .ok_or_else(|| {
                Error::config(
                    format!("environments.{}", name),
                    "no connection settings for this environment",
                )
            })
    }

    pub fn staged_import(&self) -> Result<&StagedImportConfig> {
        self.staged_import
            .as_ref()
            .ok_or_else(|| Error::config("staged_import", "section is required for staged import"))
    }

    pub fn state_dir(&self) -> NormalizedPath {
        NormalizedPath::new(&self.general.state_dir)
    }

    pub fn sessions_log(&self) -> NormalizedPath {
        self.state_dir().join("sessions.jsonl")
    }

    pub fn backups_log(&self) -> NormalizedPath {
        self.state_dir().join("backups.jsonl")
    }

    pub fn instructions_dir(&self) -> NormalizedPath {
        self.state_dir().join("instructions")
    }
}

fn validate_transport(field: &str, settings: &TransportSettings) -> Result<()> {
    if settings.transport == TransportKind::Local && settings.local_root.is_none() {
        return Err(Error::config(
            format!("{}.local_root", field),
            "is required for transport = \"local\"",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn parse(content: &str) -> Result<InfraConfig> {
        let path = NormalizedPath::new("monforge.toml");
        let config: InfraConfig = ConfigStore::new().parse(&path, mon_fs::DocumentFormat::Toml, content)?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = parse("").unwrap();

        assert_eq!(config.general.concurrency, 4);
        assert!(config.general.backup_before_deploy);
        assert!(!config.synthesis.strict_patterns);
        assert_eq!(config.check_system.config_dir, "/etc/nagios/objects");
        assert_eq!(config.notifications.mail_command, "sendmail -t");
        assert!(config.staged_import.is_none());
    }

    #[test]
    fn environments_flatten_transport_settings() {
        let config = parse(
            r#"
[environments.EXP]
transport = "ssh"
ssh_user = "deploy"
ssh_port = 2222
ssh_key = "${MONFORGE_SSH_KEY}"

[environments.DEV]
transport = "local"
local_root = "/tmp/hosts"
"#,
        )
        .unwrap();

        let exp = config.environment("exp").unwrap();
        assert_eq!(exp.transport.transport, TransportKind::Ssh);
        assert_eq!(exp.transport.ssh_port, 2222);
        assert_eq!(
            exp.transport.ssh_key.as_ref().and_then(Secret::variable),
            Some("MONFORGE_SSH_KEY")
        );
        assert_eq!(config.environment("DEV").unwrap().transport.transport, TransportKind::Local);
        assert!(config.environment("PRE").is_err());
    }

    #[rstest]
    #[case("[log_pipeline]\nadmin_password = \"hunter2\"", "log_pipeline.admin_password")]
    #[case("[notifications]\nwebhook_url = \"https://hooks.example.com/x\"", "notifications.webhook_url")]
    #[case("[environments.EXP]\nssh_key = \"/home/me/.ssh/id\"", "environments.EXP.ssh_key")]
    #[case("[environments.EXP]\ntransport = \"local\"", "environments.EXP.local_root")]
    #[case("[general]\nconcurrency = 0", "general.concurrency")]
    #[case("[check_system]\nconfig_dir = \"objects\"", "check_system.config_dir")]
    fn invalid_values_name_the_field(#[case] content: &str, #[case] field: &str) {
        match parse(content).unwrap_err() {
            Error::Config { field: actual, .. } => assert_eq!(actual, field),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn secrets_resolve_from_the_environment() {
        let secret = Secret::new("${MONFORGE_TEST_SECRET_UNSET_1}");
        match secret.resolve("log_pipeline.admin_user").unwrap_err() {
            Error::MissingSecret { variable, field } => {
                assert_eq!(variable, "MONFORGE_TEST_SECRET_UNSET_1");
                assert_eq!(field, "log_pipeline.admin_user");
            }
            other => panic!("unexpected error: {}", other),
        }

        let path = Secret::new("${PATH}");
        assert!(path.resolve("x").is_ok());
        assert_eq!(Secret::new("${1BAD}").variable(), None);
    }

    #[test]
    fn overrides_take_precedence() {
        let mut config = parse("[general]\nconcurrency = 8").unwrap();
        config.apply(&ConfigOverrides {
            dry_run: true,
            no_backup: true,
            concurrency: Some(0),
            strict_patterns: true,
            ..Default::default()
        });

        assert!(config.general.dry_run);
        assert!(!config.general.backup_before_deploy);
        assert_eq!(config.general.concurrency, 1);
        assert!(config.synthesis.strict_patterns);
        assert!(!config.synthesis.discovery);
    }

    #[test]
    fn state_paths_live_under_state_dir() {
        let mut config = InfraConfig::default();
        config.general.state_dir = PathBuf::from("/srv/monforge");
        assert_eq!(config.sessions_log().as_str(), "/srv/monforge/sessions.jsonl");
        assert_eq!(config.backups_log().as_str(), "/srv/monforge/backups.jsonl");
        assert_eq!(config.instructions_dir().as_str(), "/srv/monforge/instructions");
    }
}
