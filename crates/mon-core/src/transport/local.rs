//! Local-directory transport
//!
//! Host `web-01` maps to `<root>/web-01/`; remote path `/etc/x` maps to
//! `<root>/web-01/etc/x`. Commands run with `sh -c` in the host directory.

use super::process::{self, Invocation};
use super::{CommandOutput, RemoteTransport, TransportError};
use mon_fs::NormalizedPath;
use mon_model::Host;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct LocalTransport {
    root: PathBuf,
    timeout: Duration,
}

impl LocalTransport {
    pub fn new(root: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            root: root.into(),
            timeout,
        }
    }

    pub fn host_root(&self, host: &Host) -> PathBuf {
        self.root.join(&host.identifier)
    }

    fn map(&self, host: &Host, path: &str) -> NormalizedPath {
        NormalizedPath::new(self.host_root(host)).join(path.trim_start_matches('/'))
    }
}

impl RemoteTransport for LocalTransport {
    fn name(&self) -> &'static str {
        "local"
    }

    fn read_file(&self, host: &Host, path: &str) -> Result<Option<Vec<u8>>, TransportError> {
        mon_fs::io::read_optional(&self.map(host, path))
            .map_err(|e| TransportError::file(host, "read", path, e))
    }

    fn write_file(&self, host: &Host, path: &str, content: &[u8]) -> Result<(), TransportError> {
        mon_fs::io::write_atomic(&self.map(host, path), content)
            .map_err(|e| TransportError::file(host, "write", path, e))
    }

    fn remove_file(&self, host: &Host, path: &str) -> Result<(), TransportError> {
        mon_fs::io::remove_if_exists(&self.map(host, path))
            .map(|_| ())
            .map_err(|e| TransportError::file(host, "remove", path, e))
    }

    fn run(&self, host: &Host, command: &str) -> Result<CommandOutput, TransportError> {
        let dir = self.host_root(host);
        std::fs::create_dir_all(&dir).map_err(|e| TransportError::Spawn {
            host: host.identifier.clone(),
            program: "sh".into(),
            message: e.to_string(),
        })?;
        process::run(
            Invocation {
                host: &host.identifier,
                program: "sh",
                args: vec!["-c".into(), command.into()],
                cwd: Some(&dir),
                stdin: None,
                display: command,
            },
            self.timeout,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mon_model::HostKind;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn setup() -> (TempDir, LocalTransport, Host) {
        let temp = TempDir::new().unwrap();
        let transport = LocalTransport::new(temp.path(), Duration::from_secs(10));
        (temp, transport, Host::new(HostKind::Host, "web-01"))
    }

    #[test]
    fn files_live_under_the_host_directory() {
        let (temp, transport, host) = setup();

        assert_eq!(transport.read_file(&host, "/etc/nagios/objects/hosts.cfg").unwrap(), None);
        transport
            .write_file(&host, "/etc/nagios/objects/hosts.cfg", b"define host {}\n")
            .unwrap();

        let local = temp.path().join("web-01/etc/nagios/objects/hosts.cfg");
        assert_eq!(std::fs::read_to_string(&local).unwrap(), "define host {}\n");
        assert_eq!(
            transport.read_file(&host, "/etc/nagios/objects/hosts.cfg").unwrap(),
            Some(b"define host {}\n".to_vec())
        );

        transport.remove_file(&host, "/etc/nagios/objects/hosts.cfg").unwrap();
        transport.remove_file(&host, "/etc/nagios/objects/hosts.cfg").unwrap();
        assert!(!local.exists());
    }

    #[test]
    fn commands_run_in_the_host_directory() {
        let (_temp, transport, host) = setup();
        transport.write_file(&host, "/etc/marker", b"x").unwrap();

        assert!(transport.run(&host, "test -f ./etc/marker").unwrap().success());
        assert!(!transport.run(&host, "test -f ./etc/missing").unwrap().success());
    }
}
