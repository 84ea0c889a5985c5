//! The check synthesis engine

use crate::discovery::{DiscoveryWarning, discover};
use crate::{CheckParams, CheckRegistry, CheckSchedule, ParamSource, Prober, SynthesisError};
use mon_model::{Dependency, Impact, ParamValue, ServiceDescriptor};
use serde::Serialize;

/// Check target used when a dependency declares no host of its own.
pub const HOST_ADDRESS_MACRO: &str = "$HOSTADDRESS$";

/// A synthesized check plus the metadata needed to place it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckCommand {
    pub dependency: String,
    pub protocol: String,
    /// Plugin command line without the plugin directory prefix.
    pub command_line: String,
    /// Object name for the command definition.
    pub command_name: String,
    pub service_description: String,
    pub impact: Impact,
    pub schedule: CheckSchedule,
    pub escalate: bool,
}

/// Every dependency's outcome for one descriptor.
#[derive(Debug, Default)]
pub struct SynthesisReport {
    pub commands: Vec<CheckCommand>,
    pub errors: Vec<SynthesisError>,
    pub warnings: Vec<DiscoveryWarning>,
}

impl SynthesisReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct CheckSynthesizer<'a> {
    registry: &'a CheckRegistry,
    prober: Option<&'a dyn Prober>,
}

impl<'a> CheckSynthesizer<'a> {
    pub fn new(registry: &'a CheckRegistry) -> Self {
        Self {
            registry,
            prober: None,
        }
    }

    /// Enable the discovery step using `prober`.
    pub fn with_discovery(mut self, prober: &'a dyn Prober) -> Self {
        self.prober = Some(prober);
        self
    }

    /// Synthesize one dependency's check. Discovery warnings are logged.
    pub fn synthesize(&self, dependency: &Dependency) -> Result<CheckCommand, SynthesisError> {
        let (command, warnings) = self.synthesize_with_warnings(dependency)?;
        for warning in &warnings {
            tracing::warn!("{}", warning);
        }
        Ok(command)
    }

    /// Synthesize one dependency's check, returning discovery warnings.
    pub fn synthesize_with_warnings(
        &self,
        dependency: &Dependency,
    ) -> Result<(CheckCommand, Vec<DiscoveryWarning>), SynthesisError> {
        let plugin = self.registry.get(&dependency.check_protocol).ok_or_else(|| {
            SynthesisError::UnknownProtocol {
                dependency: dependency.name.clone(),
                protocol: dependency.check_protocol.clone(),
            }
        })?;

        let mut params = plugin.defaults(dependency);
        let mut warnings = Vec::new();
        if let Some(prober) = self.prober {
            let outcome = discover(dependency, plugin.as_ref(), prober);
            params.overlay(&outcome.inferred.params, ParamSource::Discovered);
            warnings = outcome.warnings;
        }
        if let Some(port) = dependency.port() {
            params.insert("port", ParamValue::from(port), ParamSource::Dependency);
        }
        params.overlay(&dependency.check_params, ParamSource::Explicit);

        warn_on_undeclared(dependency, plugin.as_ref(), &params);

        for required in plugin.required_params() {
            if !params.contains(required) {
                return Err(SynthesisError::MissingParameter {
                    dependency: dependency.name.clone(),
                    protocol: plugin.protocol().to_string(),
                    parameter: required.to_string(),
                });
            }
        }
        plugin
            .validate(&params)
            .map_err(|invalid| SynthesisError::InvalidParameter {
                dependency: dependency.name.clone(),
                parameter: invalid.parameter,
                message: invalid.message,
            })?;

        let target = dependency.host.as_deref().unwrap_or(HOST_ADDRESS_MACRO);
        let command_line = plugin.command(target, &params);
        let protocol = plugin.protocol().to_string();
        tracing::debug!(dependency = %dependency.name, %protocol, %command_line, "synthesized check");

        let command = CheckCommand {
            dependency: dependency.name.clone(),
            command_name: format!("check_{}_{}", mon_model::slugify(&protocol), dependency.slug()),
            service_description: format!(
                "{} ({})",
                dependency.name,
                dependency.check_protocol.trim().to_uppercase()
            ),
            protocol,
            command_line,
            impact: dependency.impact,
            schedule: CheckSchedule::for_impact(dependency.impact),
            escalate: CheckSchedule::escalates(dependency.impact),
        };
        Ok((command, warnings))
    }

    /// Synthesize every dependency, collecting all errors instead of
    /// stopping at the first.
    pub fn synthesize_all(&self, descriptor: &ServiceDescriptor) -> SynthesisReport {
        let mut report = SynthesisReport::default();
        for dependency in &descriptor.dependencies {
            match self.synthesize_with_warnings(dependency) {
                Ok((command, warnings)) => {
                    for warning in &warnings {
                        tracing::warn!("{}", warning);
                    }
                    report.commands.push(command);
                    report.warnings.extend(warnings);
                }
                Err(error) => {
                    tracing::error!("{}", error);
                    report.errors.push(error);
                }
            }
        }
        report
    }
}

fn warn_on_undeclared(dependency: &Dependency, plugin: &dyn crate::CheckPlugin, params: &CheckParams) {
    let declared: Vec<&str> = plugin
        .required_params()
        .into_iter()
        .chain(plugin.optional_params())
        .collect();
    for key in params.keys() {
        if params.source(key) == Some(ParamSource::Explicit) && !declared.contains(&key) {
            tracing::warn!(
                dependency = %dependency.name,
                protocol = plugin.protocol(),
                parameter = key,
                "check parameter is not used by this protocol"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mon_model::{Nature, PortValue};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn dependency(protocol: &str, port: Option<PortValue>, params: &[(&str, ParamValue)]) -> Dependency {
        Dependency {
            name: "DB".into(),
            kind: "db".into(),
            nature: Nature::Internal,
            impact: Impact::Critical,
            port,
            check_protocol: protocol.into(),
            effect: String::new(),
            check_params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<BTreeMap<_, _>>(),
            host: None,
            affected_services: Vec::new(),
        }
    }

    #[test]
    fn tcp_with_string_port_uses_defaults() {
        let registry = CheckRegistry::with_builtins();
        let engine = CheckSynthesizer::new(&registry);

        let command = engine
            .synthesize(&dependency("tcp", Some(PortValue::Text("5432".into())), &[]))
            .unwrap();

        assert_eq!(command.command_line, "check_tcp -H $HOSTADDRESS$ -p 5432 -t 30");
        assert_eq!(command.command_name, "check_tcp_db");
        assert_eq!(command.service_description, "DB (TCP)");
        assert!(command.escalate);
    }

    #[test]
    fn http_on_443_infers_ssl() {
        let registry = CheckRegistry::with_builtins();
        let engine = CheckSynthesizer::new(&registry);
        let dep = dependency(
            "http",
            Some(PortValue::Number(443)),
            &[
                ("url", ParamValue::from("/api/v1/health")),
                ("expected_status", ParamValue::Integer(200)),
            ],
        );

        let command = engine.synthesize(&dep).unwrap();

        assert_eq!(
            command.command_line,
            "check_http -H $HOSTADDRESS$ -p 443 -u /api/v1/health -e 200 -t 30 -S"
        );
    }

    #[test]
    fn unknown_protocol_names_dependency_and_protocol() {
        let registry = CheckRegistry::with_builtins();
        let err = CheckSynthesizer::new(&registry)
            .synthesize(&dependency("gopher", None, &[]))
            .unwrap_err();
        assert_eq!(
            err,
            SynthesisError::UnknownProtocol {
                dependency: "DB".into(),
                protocol: "gopher".into()
            }
        );
    }

    #[test]
    fn missing_required_parameter_is_an_error() {
        let registry = CheckRegistry::with_builtins();
        let err = CheckSynthesizer::new(&registry)
            .synthesize(&dependency("tcp", None, &[]))
            .unwrap_err();
        assert!(matches!(
            err,
            SynthesisError::MissingParameter { ref parameter, .. } if parameter == "port"
        ));
    }

    #[test]
    fn explicit_port_parameter_overrides_dependency_port() {
        let registry = CheckRegistry::with_builtins();
        let dep = dependency(
            "tcp",
            Some(PortValue::Number(5432)),
            &[("port", ParamValue::Integer(6432))],
        );
        let command = CheckSynthesizer::new(&registry).synthesize(&dep).unwrap();
        assert!(command.command_line.contains("-p 6432"), "{}", command.command_line);
    }

    #[test]
    fn invalid_parameter_is_reported() {
        let registry = CheckRegistry::with_builtins();
        let dep = dependency(
            "http",
            Some(PortValue::Number(80)),
            &[("url", ParamValue::from("health"))],
        );
        let err = CheckSynthesizer::new(&registry).synthesize(&dep).unwrap_err();
        assert!(matches!(
            err,
            SynthesisError::InvalidParameter { ref parameter, .. } if parameter == "url"
        ));
    }
}
