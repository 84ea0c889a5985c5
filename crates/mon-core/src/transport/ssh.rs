//! SSH transport over the system `ssh` and `scp` binaries
//!
//! Authentication is non-interactive (`BatchMode=yes`); keys come from the
//! agent or from the configured key file.

use super::process::{self, Invocation, RawOutput};
use super::{CommandOutput, RemoteTransport, TransportError, remote_parent, shell_quote};
use mon_model::Host;
use std::io::Write;
use std::time::Duration;

/// Exit status used by the read helper for a missing file.
const MISSING_FILE_STATUS: i32 = 44;

#[derive(Debug, Clone)]
pub struct SshTransport {
    user: Option<String>,
    port: u16,
    key_file: Option<String>,
    timeout: Duration,
}

impl SshTransport {
    pub fn new(user: Option<String>, port: u16, key_file: Option<String>, timeout: Duration) -> Self {
        Self {
            user,
            port,
            key_file,
            timeout,
        }
    }

    fn destination(&self, host: &Host) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, host.address()),
            None => host.address().to_string(),
        }
    }

    fn common_options(&self) -> Vec<String> {
        let connect = self.timeout.as_secs().clamp(1, 30);
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", connect),
        ];
        if let Some(key) = &self.key_file {
            args.push("-i".into());
            args.push(key.clone());
        }
        args
    }

    /// Argument list for `ssh` running `command` on `host`.
    pub fn ssh_args(&self, host: &Host, command: &str) -> Vec<String> {
        let mut args = self.common_options();
        args.push("-p".into());
        args.push(self.port.to_string());
        args.push(self.destination(host));
        args.push("--".into());
        args.push(command.to_string());
        args
    }

    fn ssh_raw(&self, host: &Host, command: &str) -> Result<RawOutput, TransportError> {
        process::run_raw(
            Invocation {
                host: &host.identifier,
                program: "ssh",
                args: self.ssh_args(host, command),
                cwd: None,
                stdin: None,
                display: command,
            },
            self.timeout,
        )
    }

    fn ssh(&self, host: &Host, command: &str) -> Result<CommandOutput, TransportError> {
        self.ssh_raw(host, command).map(RawOutput::into_output)
    }

    fn checked(&self, host: &Host, command: &str) -> Result<(), TransportError> {
        let output = self.ssh(host, command)?;
        if output.success() {
            Ok(())
        } else {
            Err(TransportError::CommandFailed {
                host: host.identifier.clone(),
                command: command.to_string(),
                code: output.code.unwrap_or(-1),
                stderr: output.summary(),
            })
        }
    }
}

/// Interpret the output of the read helper. File content is passed through
/// untouched.
fn read_output(host: &Host, path: &str, output: RawOutput) -> Result<Option<Vec<u8>>, TransportError> {
    match output.code {
        Some(0) => Ok(Some(output.stdout)),
        Some(MISSING_FILE_STATUS) => Ok(None),
        _ => Err(TransportError::file(host, "read", path, output.into_output().summary())),
    }
}

impl RemoteTransport for SshTransport {
    fn name(&self) -> &'static str {
        "ssh"
    }

    fn read_file(&self, host: &Host, path: &str) -> Result<Option<Vec<u8>>, TransportError> {
        let quoted = shell_quote(path);
        let command = format!(
            "if [ -e {p} ]; then cat {p}; else exit {missing}; fi",
            p = quoted,
            missing = MISSING_FILE_STATUS
        );
        read_output(host, path, self.ssh_raw(host, &command)?)
    }

    fn write_file(&self, host: &Host, path: &str, content: &[u8]) -> Result<(), TransportError> {
        let mut local = tempfile::NamedTempFile::new()
            .map_err(|e| TransportError::file(host, "write", path, e))?;
        local
            .write_all(content)
            .and_then(|_| local.flush())
            .map_err(|e| TransportError::file(host, "write", path, e))?;

        let staging = format!("{}.monforge-tmp", path);
        self.checked(host, &format!("mkdir -p {}", shell_quote(remote_parent(path))))?;

        let mut args = self.common_options();
        args.push("-q".into());
        args.push("-P".into());
        args.push(self.port.to_string());
        args.push(local.path().to_string_lossy().into_owned());
        args.push(format!("{}:{}", self.destination(host), staging));
        let copy = process::run(
            Invocation {
                host: &host.identifier,
                program: "scp",
                args,
                cwd: None,
                stdin: None,
                display: &format!("scp {}", path),
            },
            self.timeout,
        )?;
        if !copy.success() {
            return Err(TransportError::file(host, "write", path, copy.summary()));
        }

        self.checked(
            host,
            &format!("mv -f {} {}", shell_quote(&staging), shell_quote(path)),
        )
    }

    fn remove_file(&self, host: &Host, path: &str) -> Result<(), TransportError> {
        self.checked(host, &format!("rm -f {}", shell_quote(path)))
    }

    fn run(&self, host: &Host, command: &str) -> Result<CommandOutput, TransportError> {
        self.ssh(host, command)
    }
}
