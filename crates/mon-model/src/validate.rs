//! Structural validation of a parsed descriptor
//!
//! Runs once on load. The first problem found is reported with the path of
//! the offending field, e.g. `dependencies[1].port`.

use crate::{Error, LogFormat, Result, ServiceDescriptor};
use std::collections::HashSet;

pub(crate) fn validate(descriptor: &ServiceDescriptor) -> Result<()> {
    require_text("identification.name", &descriptor.identification.name)?;

    for (idx, responsible) in descriptor.responsibles.iter().enumerate() {
        require_text(&format!("responsibles[{}].name", idx), &responsible.name)?;
        let email = responsible.email.trim();
        if email.is_empty() || !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(Error::invalid(
                format!("responsibles[{}].email", idx),
                format!("'{}' is not an e-mail address", responsible.email),
            ));
        }
    }

    let mut dependency_names = HashSet::new();
    for (idx, dep) in descriptor.dependencies.iter().enumerate() {
        let field = |name: &str| format!("dependencies[{}].{}", idx, name);
        require_text(&field("name"), &dep.name)?;
        require_text(&field("check_protocol"), &dep.check_protocol)?;
        if !dependency_names.insert(dep.name.trim().to_lowercase()) {
            return Err(Error::invalid(
                field("name"),
                format!("duplicate dependency '{}'", dep.name),
            ));
        }
        if let Some(port) = &dep.port {
            port.resolve().map_err(|message| Error::invalid(field("port"), message))?;
        }
    }

    let mut log_names = HashSet::new();
    for (idx, log) in descriptor.logs.iter().enumerate() {
        let field = |name: &str| format!("logs[{}].{}", idx, name);
        require_text(&field("name"), &log.name)?;
        require_text(&field("path"), &log.path)?;
        if !log_names.insert(log.name.as_str()) {
            return Err(Error::invalid(field("name"), format!("duplicate log '{}'", log.name)));
        }
        if log.format != LogFormat::StructuredJson {
            for (pidx, pattern) in log.patterns.iter().enumerate() {
                require_text(&format!("logs[{}].patterns[{}]", idx, pidx), pattern)?;
            }
        }
    }

    if descriptor.health_api {
        match &descriptor.health_api_details {
            Some(details) => require_text("health_api_details.endpoint", &details.endpoint)?,
            None => {
                return Err(Error::invalid(
                    "health_api_details",
                    "required when health_api is enabled",
                ));
            }
        }
    }

    if descriptor.environments.is_empty() {
        return Err(Error::invalid("environments", "at least one environment is required"));
    }
    let mut env_names = HashSet::new();
    for (idx, env) in descriptor.environments.iter().enumerate() {
        require_text(&format!("environments[{}].name", idx), &env.name)?;
        if !env_names.insert(env.name.to_uppercase()) {
            return Err(Error::invalid(
                format!("environments[{}].name", idx),
                format!("duplicate environment '{}'", env.name),
            ));
        }
        let mut identifiers = HashSet::new();
        for (hidx, host) in env.hosts.iter().enumerate() {
            let field = format!("environments[{}].hosts[{}].identifier", idx, hidx);
            require_text(&field, &host.identifier)?;
            if !identifiers.insert(host.identifier.as_str()) {
                return Err(Error::invalid(
                    field,
                    format!("duplicate host '{}'", host.identifier),
                ));
            }
        }
    }

    Ok(())
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(Error::invalid(field, "must not be empty"))
    } else {
        Ok(())
    }
}
