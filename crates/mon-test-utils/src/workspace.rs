//! [`TestWorkspace`]: a temporary directory laid out for deployment tests.
//!
//! Hosts are plain directories under `hosts/<identifier>/`, which is what the
//! local transport maps remote paths onto. Remote commands run with the host
//! directory as working directory, so marker files placed there can steer
//! validation commands.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Remote directory holding check-system objects in generated configs.
pub const CHECK_CONFIG_DIR: &str = "/etc/nagios/objects";
/// Remote staging directory for the import tool.
pub const IMPORT_DIR: &str = "/var/lib/nagiosql/import";
/// Validation command that fails on hosts containing a `fail-validation` file.
pub const MARKER_VALIDATE_COMMAND: &str = "test ! -e fail-validation";

/// Knobs for the generated infrastructure configuration.
#[derive(Debug, Clone)]
pub struct LocalConfig {
    pub validate_command: String,
    pub reachability_command: String,
    pub verify_commands: Vec<String>,
    pub backups: bool,
    pub concurrency: usize,
    pub stop_on_first_failure: bool,
    pub staged_backups: bool,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            validate_command: MARKER_VALIDATE_COMMAND.to_string(),
            reachability_command: "true".to_string(),
            verify_commands: vec![format!("test -f .{}/hosts.cfg", IMPORT_DIR)],
            backups: true,
            concurrency: 2,
            stop_on_first_failure: false,
            staged_backups: true,
        }
    }
}

impl LocalConfig {
    fn render(&self, root: &Path) -> String {
        let root = root.display();
        let verify = self
            .verify_commands
            .iter()
            .map(|c| format!("{:?}", c))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            r#"[general]
state_dir = "{root}/state"
backup_before_deploy = {backups}
validate_after_deploy = true
concurrency = {concurrency}
stop_on_first_failure = {stop}
command_timeout_secs = 10

[check_system]
config_dir = "{check_dir}"
backup_dir = "/var/backups/monforge/nagios"
validate_command = {validate:?}

[log_pipeline]
collector_config_dir = "/etc/filebeat"
processor_config_dir = "/etc/logstash/conf.d"
backup_dir = "/var/backups/monforge/elastic"
reachability_command = {reach:?}

[environments.EXP]
transport = "local"
local_root = "{root}/hosts"

[environments.DEV]
transport = "local"
local_root = "{root}/hosts"

[staged_import]
host = "nagiosql"
transport = "local"
local_root = "{root}/hosts"
import_dir = "{import_dir}"
backup_dir = "/var/lib/nagiosql/backup"
web_url = "http://nagiosql.local/nagiosql"
create_backups = {staged_backups}
verify_commands = [{verify}]
"#,
            backups = self.backups,
            concurrency = self.concurrency,
            stop = self.stop_on_first_failure,
            check_dir = CHECK_CONFIG_DIR,
            validate = self.validate_command,
            reach = self.reachability_command,
            import_dir = IMPORT_DIR,
            staged_backups = self.staged_backups,
        )
    }
}

/// A temporary workspace with a descriptor, a config file and host directories.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root().join("state")
    }

    pub fn out_dir(&self) -> PathBuf {
        self.root().join("out")
    }

    /// Write `content` as `service.json` and return its path.
    pub fn write_descriptor(&self, content: &str) -> PathBuf {
        let path = self.root().join("service.json");
        fs::write(&path, content).unwrap();
        path
    }

    /// Write `monforge.toml` for local-transport hosts and return its path.
    pub fn write_config(&self, config: &LocalConfig) -> PathBuf {
        let path = self.root().join("monforge.toml");
        fs::write(&path, config.render(self.root())).unwrap();
        path
    }

    /// Local directory standing in for a host.
    pub fn host_root(&self, host: &str) -> PathBuf {
        self.root().join("hosts").join(host)
    }

    /// Local path of a remote absolute path on `host`.
    pub fn host_path(&self, host: &str, remote: &str) -> PathBuf {
        self.host_root(host).join(remote.trim_start_matches('/'))
    }

    pub fn write_host_file(&self, host: &str, remote: &str, content: &str) {
        let path = self.host_path(host, remote);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    pub fn read_host_file(&self, host: &str, remote: &str) -> Option<String> {
        fs::read_to_string(self.host_path(host, remote)).ok()
    }

    /// Make the marker validation command fail on `host`.
    pub fn fail_validation_on(&self, host: &str) {
        let root = self.host_root(host);
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("fail-validation"), "").unwrap();
    }

    /// Every file under a remote directory of `host`, keyed by relative path.
    pub fn snapshot_dir(&self, host: &str, remote_dir: &str) -> BTreeMap<String, String> {
        let base = self.host_path(host, remote_dir);
        let mut files = BTreeMap::new();
        collect(&base, &base, &mut files);
        files
    }
}

fn collect(base: &Path, dir: &Path, files: &mut BTreeMap<String, String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect(base, &path, files);
        } else if let Ok(content) = fs::read_to_string(&path) {
            let relative = path.strip_prefix(base).unwrap().to_string_lossy().replace('\\', "/");
            files.insert(relative, content);
        }
    }
}
