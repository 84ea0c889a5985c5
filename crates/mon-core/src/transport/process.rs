//! Child processes with timeouts
//!
//! Each call drives a small current-thread runtime so that callers stay
//! synchronous while `tokio::time::timeout` bounds the child. On unix the
//! child gets its own process group, so a terminal Ctrl-C reaches only
//! monforge and an in-flight copy runs to completion.

use super::TransportError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Exit status and captured output of a remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// First non-empty line of stderr, else of stdout.
    pub fn summary(&self) -> String {
        self.stderr
            .lines()
            .chain(self.stdout.lines())
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("")
            .to_string()
    }
}

/// Output with stdout kept byte for byte, for file reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RawOutput {
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl RawOutput {
    pub fn into_output(self) -> CommandOutput {
        CommandOutput {
            code: self.code,
            stdout: String::from_utf8_lossy(&self.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&self.stderr).into_owned(),
        }
    }
}

/// A process invocation on behalf of `host`.
pub(crate) struct Invocation<'a> {
    pub host: &'a str,
    pub program: &'a str,
    pub args: Vec<String>,
    pub cwd: Option<&'a Path>,
    pub stdin: Option<Vec<u8>>,
    /// Shown in timeout errors instead of the full argument list.
    pub display: &'a str,
}

pub(crate) fn run(invocation: Invocation<'_>, timeout: Duration) -> Result<CommandOutput, TransportError> {
    run_raw(invocation, timeout).map(RawOutput::into_output)
}

pub(crate) fn run_raw(invocation: Invocation<'_>, timeout: Duration) -> Result<RawOutput, TransportError> {
    let spawn_error = |message: String| TransportError::Spawn {
        host: invocation.host.to_string(),
        program: invocation.program.to_string(),
        message,
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| spawn_error(e.to_string()))?;

    let mut command = Command::new(invocation.program);
    command
        .args(&invocation.args)
        .stdin(if invocation.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);
    if let Some(cwd) = invocation.cwd {
        command.current_dir(cwd);
    }

    tracing::debug!(
        host = invocation.host,
        program = invocation.program,
        command = invocation.display,
        "running"
    );

    let stdin = invocation.stdin;
    let output = runtime.block_on(async move {
        let mut child = command.spawn()?;
        let pipe = child.stdin.take();
        let feed = async move {
            if let (Some(mut pipe), Some(bytes)) = (pipe, stdin) {
                pipe.write_all(&bytes).await?;
                pipe.shutdown().await?;
            }
            Ok::<(), std::io::Error>(())
        };
        let work = async move {
            let (fed, output) = tokio::join!(feed, child.wait_with_output());
            fed?;
            output
        };
        Ok::<_, std::io::Error>(tokio::time::timeout(timeout, work).await)
    });

    match output {
        Err(e) => Err(spawn_error(e.to_string())),
        Ok(Err(_elapsed)) => Err(TransportError::Timeout {
            host: invocation.host.to_string(),
            command: invocation.display.to_string(),
            seconds: timeout.as_secs(),
        }),
        Ok(Ok(Err(e))) => Err(spawn_error(e.to_string())),
        Ok(Ok(Ok(output))) => Ok(RawOutput {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str, stdin: Option<&str>, timeout: Duration) -> Result<CommandOutput, TransportError> {
        run(
            Invocation {
                host: "web-01",
                program: "sh",
                args: vec!["-c".into(), script.into()],
                cwd: None,
                stdin: stdin.map(|s| s.as_bytes().to_vec()),
                display: script,
            },
            timeout,
        )
    }

    #[test]
    fn captures_exit_code_and_streams() {
        let output = sh("echo out; echo err >&2; exit 3", None, Duration::from_secs(10)).unwrap();
        assert_eq!(output.code, Some(3));
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.summary(), "err");
        assert!(!output.success());
    }

    #[test]
    fn feeds_stdin() {
        let output = sh("cat", Some("hello"), Duration::from_secs(10)).unwrap();
        assert!(output.success());
        assert_eq!(output.stdout, "hello");
    }

    #[test]
    fn raw_output_keeps_non_utf8_bytes() {
        let output = run_raw(
            Invocation {
                host: "web-01",
                program: "sh",
                args: vec!["-c".into(), r"printf 'caf\351\n'".into()],
                cwd: None,
                stdin: None,
                display: "printf",
            },
            Duration::from_secs(10),
        )
        .unwrap();

        assert_eq!(output.stdout, b"caf\xe9\n".to_vec());
        assert_eq!(output.into_output().stdout, "caf\u{fffd}\n");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn child_leads_its_own_process_group() {
        let output = sh(
            r#"read -r _ _ _ _ pgrp _ < /proc/$$/stat; echo "$pgrp $$""#,
            None,
            Duration::from_secs(10),
        )
        .unwrap();
        let ids: Vec<&str> = output.stdout.split_whitespace().collect();

        assert_eq!(ids.len(), 2, "{:?}", output);
        assert_eq!(ids[0], ids[1]);
    }

    #[test]
    fn times_out() {
        let error = sh("sleep 5", None, Duration::from_millis(200)).unwrap_err();
        assert!(matches!(error, TransportError::Timeout { ref host, .. } if host == "web-01"));
    }
}
