//! Metric queries and arbitrary commands

use super::{DEFAULT_TIMEOUT_SECS, check_one_of, check_positive};
use crate::params::shell_quote;
use crate::{CheckParams, CheckPlugin, InvalidParam};
use mon_model::Dependency;

const COMPARISONS: &[&str] = &[">", ">=", "<", "<=", "==", "!="];

/// Threshold check on a Prometheus query result.
pub struct PrometheusCheck;

impl CheckPlugin for PrometheusCheck {
    fn protocol(&self) -> &str {
        "prometheus"
    }

    fn description(&self) -> &str {
        "PromQL query compared against warning and critical thresholds"
    }

    fn required_params(&self) -> Vec<&str> {
        vec!["query"]
    }

    fn optional_params(&self) -> Vec<&str> {
        vec!["url", "warning", "critical", "comparison"]
    }

    fn defaults(&self, _dependency: &Dependency) -> CheckParams {
        CheckParams::new()
            .with("url", "http://localhost:9090")
            .with("warning", 80)
            .with("critical", 90)
            .with("comparison", ">")
    }

    fn validate(&self, params: &CheckParams) -> Result<(), InvalidParam> {
        check_one_of(params, "comparison", COMPARISONS)?;
        match params.text("url") {
            Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => Err(
                InvalidParam::new("url", format!("'{}' is not an http(s) URL", url)),
            ),
            _ => Ok(()),
        }
    }

    fn command(&self, _target: &str, params: &CheckParams) -> String {
        format!(
            "check_prometheus_metric -u {} -q {} -w {} -c {} -o {}",
            params.text_or("url", "http://localhost:9090"),
            shell_quote(&params.text_or("query", "")),
            params.text_or("warning", "80"),
            params.text_or("critical", "90"),
            shell_quote(&params.text_or("comparison", ">")),
        )
    }
}

/// Wraps an operator-supplied command.
pub struct CustomCheck;

impl CheckPlugin for CustomCheck {
    fn protocol(&self) -> &str {
        "custom"
    }

    fn description(&self) -> &str {
        "Arbitrary command run through the custom check wrapper"
    }

    fn required_params(&self) -> Vec<&str> {
        vec!["command"]
    }

    fn optional_params(&self) -> Vec<&str> {
        vec!["args", "timeout", "working_dir"]
    }

    fn defaults(&self, _dependency: &Dependency) -> CheckParams {
        CheckParams::new().with("timeout", DEFAULT_TIMEOUT_SECS)
    }

    fn validate(&self, params: &CheckParams) -> Result<(), InvalidParam> {
        check_positive(params, "timeout")
    }

    fn command(&self, _target: &str, params: &CheckParams) -> String {
        let mut cmd = format!(
            "check_custom_command -c {}",
            shell_quote(&params.text_or("command", ""))
        );
        if let Some(args) = params.text("args") {
            cmd.push_str(&format!(" -a {}", shell_quote(&args)));
        }
        cmd.push_str(&format!(" -t {}", params.text_or("timeout", "30")));
        if let Some(dir) = params.text("working_dir") {
            cmd.push_str(&format!(" -d {}", shell_quote(&dir)));
        }
        cmd
    }
}
