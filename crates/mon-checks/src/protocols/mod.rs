//! Built-in check protocols
//!
//! Grouped by the kind of thing being checked:
//!
//! - [`network`]: http, tcp, icmp, dns, ldap, smtp
//! - [`database`]: sql (MySQL and PostgreSQL)
//! - [`orchestration`]: docker containers and kubernetes resources
//! - [`metrics`]: prometheus queries and custom commands

pub mod database;
pub mod metrics;
pub mod network;
pub mod orchestration;

use crate::{CheckParams, InvalidParam};

pub(crate) const DEFAULT_TIMEOUT_SECS: i64 = 30;

pub(crate) fn check_port(params: &CheckParams, key: &str) -> Result<(), InvalidParam> {
    match params.get(key) {
        None => Ok(()),
        Some(_) => match params.number(key) {
            Some(port) if (1..=65535).contains(&port) => Ok(()),
            _ => Err(InvalidParam::new(key, "must be a port number between 1 and 65535")),
        },
    }
}

pub(crate) fn check_positive(params: &CheckParams, key: &str) -> Result<(), InvalidParam> {
    match params.get(key) {
        None => Ok(()),
        Some(_) => match params.number(key) {
            Some(n) if n > 0 => Ok(()),
            _ => Err(InvalidParam::new(key, "must be a positive integer")),
        },
    }
}

pub(crate) fn check_one_of(
    params: &CheckParams,
    key: &str,
    allowed: &[&str],
) -> Result<(), InvalidParam> {
    match params.text(key) {
        Some(value) if !allowed.contains(&value.as_str()) => Err(InvalidParam::new(
            key,
            format!("'{}' is not one of {}", value, allowed.join(", ")),
        )),
        _ => Ok(()),
    }
}

pub(crate) fn check_absolute_path(params: &CheckParams, key: &str) -> Result<(), InvalidParam> {
    match params.text(key) {
        Some(value) if !value.starts_with('/') => {
            Err(InvalidParam::new(key, format!("'{}' must start with '/'", value)))
        }
        _ => Ok(()),
    }
}

/// Credentials must be check-system macros (`$USER3$`), never literals.
pub(crate) fn check_macro(params: &CheckParams, key: &str) -> Result<(), InvalidParam> {
    match params.text(key) {
        Some(value) if !(value.len() > 2 && value.starts_with('$') && value.ends_with('$')) => Err(
            InvalidParam::new(key, "must reference a resource macro such as $USER3$"),
        ),
        _ => Ok(()),
    }
}
