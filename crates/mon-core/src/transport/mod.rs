//! Remote transports
//!
//! A [`RemoteTransport`] reads, writes and removes files on a host and runs
//! shell commands there. Every call blocks the calling worker and is bounded
//! by the configured command timeout.
//!
//! - [`SshTransport`]: system `ssh`/`scp`
//! - [`LocalTransport`]: one local directory per host, for `transport = "local"`

mod local;
pub(crate) mod process;
mod ssh;

pub use local::LocalTransport;
pub use process::CommandOutput;
pub use ssh::SshTransport;

use crate::config::{TransportKind, TransportSettings};
use mon_model::Host;
use std::sync::Arc;
use std::time::Duration;

/// Failure of a single remote operation. Always names the host.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Reading, writing or removing a remote file failed
    #[error("{host}: cannot {operation} {path}: {message}")]
    File {
        host: String,
        operation: String,
        path: String,
        message: String,
    },

    /// A remote command did not finish in time
    #[error("{host}: '{command}' timed out after {seconds}s")]
    Timeout {
        host: String,
        command: String,
        seconds: u64,
    },

    /// The local helper program could not be started
    #[error("{host}: failed to start {program}: {message}")]
    Spawn {
        host: String,
        program: String,
        message: String,
    },

    /// A transport-level command (copy, move) exited unsuccessfully
    #[error("{host}: '{command}' exited with status {code}: {stderr}")]
    CommandFailed {
        host: String,
        command: String,
        code: i32,
        stderr: String,
    },
}

impl TransportError {
    pub fn host(&self) -> &str {
        match self {
            Self::File { host, .. }
            | Self::Timeout { host, .. }
            | Self::Spawn { host, .. }
            | Self::CommandFailed { host, .. } => host,
        }
    }

    pub(crate) fn file(host: &Host, operation: &str, path: &str, message: impl ToString) -> Self {
        Self::File {
            host: host.identifier.clone(),
            operation: operation.to_string(),
            path: path.to_string(),
            message: message.to_string(),
        }
    }
}

/// File and command access to remote hosts.
///
/// Paths are absolute remote paths. Implementations must be usable from
/// several worker threads at once.
pub trait RemoteTransport: Send + Sync {
    /// Short name for logs ("ssh", "local").
    fn name(&self) -> &'static str;

    /// Content of a remote file, `None` if it does not exist.
    fn read_file(&self, host: &Host, path: &str) -> Result<Option<Vec<u8>>, TransportError>;

    /// Create or replace a remote file, creating parent directories.
    fn write_file(&self, host: &Host, path: &str, content: &[u8]) -> Result<(), TransportError>;

    /// Remove a remote file. Missing files are not an error.
    fn remove_file(&self, host: &Host, path: &str) -> Result<(), TransportError>;

    /// Run a shell command. A non-zero exit is reported in the output, not
    /// as an error; only timeouts and spawn failures are errors.
    fn run(&self, host: &Host, command: &str) -> Result<CommandOutput, TransportError>;
}

/// Build the transport described by `settings`.
///
/// `field` names the configuration section, for error messages about
/// unresolved credentials.
pub fn connect(
    settings: &TransportSettings,
    field: &str,
    timeout: Duration,
) -> crate::Result<Arc<dyn RemoteTransport>> {
    match settings.transport {
        TransportKind::Local => {
            let root = settings.local_root.clone().ok_or_else(|| {
                crate::Error::config(format!("{}.local_root", field), "is required for transport = \"local\"")
            })?;
            Ok(Arc::new(LocalTransport::new(root, timeout)))
        }
        TransportKind::Ssh => {
            let key = settings
                .ssh_key
                .as_ref()
                .map(|secret| secret.resolve(&format!("{}.ssh_key", field)))
                .transpose()?;
            Ok(Arc::new(SshTransport::new(
                settings.ssh_user.clone(),
                settings.ssh_port,
                key,
                timeout,
            )))
        }
    }
}

/// Quote `value` for a POSIX shell.
pub fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-' | ':' | '=' | '@' | '+'))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Parent directory of an absolute remote path.
pub(crate) fn remote_parent(path: &str) -> &str {
    match path.trim_end_matches('/').rfind('/') {
        Some(0) | None => "/",
        Some(index) => &path[..index],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/etc/nagios/objects/hosts.cfg", "/etc/nagios/objects/hosts.cfg")]
    #[case("nagios -v /etc/nagios/nagios.cfg", "'nagios -v /etc/nagios/nagios.cfg'")]
    #[case("it's", r"'it'\''s'")]
    #[case("", "''")]
    fn quoting(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(shell_quote(input), expected);
    }

    #[rstest]
    #[case("/etc/nagios/objects/hosts.cfg", "/etc/nagios/objects")]
    #[case("/hosts.cfg", "/")]
    #[case("hosts.cfg", "/")]
    fn parents(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(remote_parent(path), expected);
    }
}
