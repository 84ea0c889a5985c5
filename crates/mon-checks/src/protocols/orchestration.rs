//! Container and orchestration resource checks

use super::{check_one_of, check_positive};
use crate::params::shell_quote;
use crate::{CheckParams, CheckPlugin, InvalidParam};
use mon_model::Dependency;

const DOCKER_CHECK_TYPES: &[&str] = &["running", "status", "health", "cpu", "memory", "disk", "logs"];
const THRESHOLD_TYPES: &[&str] = &["cpu", "memory", "disk"];

const K8S_RESOURCE_TYPES: &[&str] = &[
    "pod",
    "deployment",
    "statefulset",
    "daemonset",
    "service",
    "node",
    "ingress",
    "pvc",
];
const K8S_CHECK_TYPES: &[&str] = &["status", "ready", "replicas", "restarts", "resources"];

/// Warning threshold plus critical threshold, defaulting to warning + 10.
fn thresholds(params: &CheckParams) -> String {
    let warning = params.number("warning").unwrap_or(80);
    let critical = params.number("critical").unwrap_or(warning + 10);
    format!(" -w {} -c {}", warning, critical)
}

/// Docker container state and resource usage.
pub struct DockerCheck;

impl CheckPlugin for DockerCheck {
    fn protocol(&self) -> &str {
        "docker"
    }

    fn aliases(&self) -> Vec<&str> {
        vec!["container"]
    }

    fn description(&self) -> &str {
        "Docker container state, health or resource usage"
    }

    fn required_params(&self) -> Vec<&str> {
        vec!["container_name"]
    }

    fn optional_params(&self) -> Vec<&str> {
        vec!["check_type", "socket", "warning", "critical", "timeout"]
    }

    fn defaults(&self, _dependency: &Dependency) -> CheckParams {
        CheckParams::new()
            .with("check_type", "running")
            .with("socket", "/var/run/docker.sock")
    }

    fn validate(&self, params: &CheckParams) -> Result<(), InvalidParam> {
        check_one_of(params, "check_type", DOCKER_CHECK_TYPES)?;
        check_positive(params, "warning")?;
        check_positive(params, "critical")?;
        check_positive(params, "timeout")
    }

    fn command(&self, _target: &str, params: &CheckParams) -> String {
        let check_type = params.text_or("check_type", "running");
        let mut cmd = format!(
            "check_docker -c {} -t {}",
            params.text_or("container_name", ""),
            check_type
        );
        if let Some(socket) = params.text("socket") {
            cmd.push_str(&format!(" -s {}", socket));
        }
        if THRESHOLD_TYPES.contains(&check_type.as_str()) {
            cmd.push_str(&thresholds(params));
        }
        if let Some(timeout) = params.text("timeout") {
            cmd.push_str(&format!(" -T {}", timeout));
        }
        cmd
    }
}

/// Kubernetes resource state.
pub struct KubernetesCheck;

impl CheckPlugin for KubernetesCheck {
    fn protocol(&self) -> &str {
        "kubernetes"
    }

    fn aliases(&self) -> Vec<&str> {
        vec!["k8s"]
    }

    fn description(&self) -> &str {
        "Kubernetes resource status, readiness, replicas or restarts"
    }

    fn required_params(&self) -> Vec<&str> {
        vec!["resource_type"]
    }

    fn optional_params(&self) -> Vec<&str> {
        vec![
            "namespace",
            "check_type",
            "resource_name",
            "replicas_min",
            "warning",
            "critical",
            "kubeconfig",
        ]
    }

    fn defaults(&self, _dependency: &Dependency) -> CheckParams {
        CheckParams::new()
            .with("namespace", "default")
            .with("check_type", "status")
    }

    fn validate(&self, params: &CheckParams) -> Result<(), InvalidParam> {
        check_one_of(params, "resource_type", K8S_RESOURCE_TYPES)?;
        check_one_of(params, "check_type", K8S_CHECK_TYPES)?;
        check_positive(params, "replicas_min")?;
        if params.text("check_type").as_deref() == Some("replicas")
            && !params.contains("replicas_min")
        {
            return Err(InvalidParam::new(
                "replicas_min",
                "required when check_type is 'replicas'",
            ));
        }
        Ok(())
    }

    fn command(&self, _target: &str, params: &CheckParams) -> String {
        let check_type = params.text_or("check_type", "status");
        let mut cmd = format!(
            "check_kubernetes -t {} -n {} -c {}",
            params.text_or("resource_type", ""),
            params.text_or("namespace", "default"),
            check_type
        );
        if let Some(name) = params.text("resource_name") {
            cmd.push_str(&format!(" -r {}", name));
        }
        match check_type.as_str() {
            "replicas" => cmd.push_str(&format!(" -m {}", params.text_or("replicas_min", "1"))),
            "restarts" | "resources" => cmd.push_str(&thresholds(params)),
            _ => {}
        }
        if let Some(kubeconfig) = params.text("kubeconfig") {
            cmd.push_str(&format!(" -k {}", shell_quote(&kubeconfig)));
        }
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docker_resource_checks_carry_thresholds() {
        let params = CheckParams::new()
            .with("container_name", "api")
            .with("check_type", "memory")
            .with("warning", 70);
        assert_eq!(
            DockerCheck.command("$HOSTADDRESS$", &params),
            "check_docker -c api -t memory -w 70 -c 80"
        );
    }

    #[test]
    fn docker_rejects_unknown_check_type() {
        let params = CheckParams::new()
            .with("container_name", "api")
            .with("check_type", "uptime");
        assert!(DockerCheck.validate(&params).is_err());
    }

    #[test]
    fn kubernetes_replicas_requires_minimum() {
        let params = CheckParams::new()
            .with("resource_type", "deployment")
            .with("check_type", "replicas");
        assert_eq!(
            KubernetesCheck.validate(&params).unwrap_err().parameter,
            "replicas_min"
        );

        let params = params.with("replicas_min", 2).with("resource_name", "api");
        assert_eq!(
            KubernetesCheck.command("$HOSTADDRESS$", &params),
            "check_kubernetes -t deployment -n default -c replicas -r api -m 2"
        );
    }
}
