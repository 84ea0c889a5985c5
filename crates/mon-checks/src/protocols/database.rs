//! Database checks

use super::{DEFAULT_TIMEOUT_SECS, check_macro, check_one_of, check_port, check_positive};
use crate::{CheckParams, CheckPlugin, InvalidParam};
use mon_model::Dependency;

const ENGINES: &[&str] = &["mysql", "pgsql"];

fn engine_for(dependency: &Dependency) -> &'static str {
    let explicit = dependency
        .check_params
        .get("engine")
        .map(|v| v.to_string().to_lowercase());
    match explicit.as_deref().unwrap_or(dependency.protocol_key().as_str()) {
        "pgsql" | "postgres" | "postgresql" => "pgsql",
        _ => "mysql",
    }
}

/// SQL server login check for MySQL or PostgreSQL.
///
/// Passwords are only accepted as resource macros, so no credential ever
/// lands in a generated object file.
pub struct SqlCheck;

impl CheckPlugin for SqlCheck {
    fn protocol(&self) -> &str {
        "sql"
    }

    fn aliases(&self) -> Vec<&str> {
        vec!["mysql", "postgres", "postgresql", "pgsql"]
    }

    fn description(&self) -> &str {
        "Database login (MySQL or PostgreSQL)"
    }

    fn required_params(&self) -> Vec<&str> {
        vec!["port", "engine"]
    }

    fn optional_params(&self) -> Vec<&str> {
        vec!["database", "user", "password", "timeout"]
    }

    fn defaults(&self, dependency: &Dependency) -> CheckParams {
        let engine = engine_for(dependency);
        CheckParams::new()
            .with("engine", engine)
            .with("port", if engine == "pgsql" { 5432 } else { 3306 })
            .with("timeout", DEFAULT_TIMEOUT_SECS)
    }

    fn validate(&self, params: &CheckParams) -> Result<(), InvalidParam> {
        check_port(params, "port")?;
        check_positive(params, "timeout")?;
        check_one_of(params, "engine", ENGINES)?;
        check_macro(params, "password")
    }

    fn command(&self, target: &str, params: &CheckParams) -> String {
        let pgsql = params.text("engine").as_deref() == Some("pgsql");
        let mut cmd = format!(
            "{} -H {} -P {}",
            if pgsql { "check_pgsql" } else { "check_mysql" },
            target,
            params.text_or("port", ""),
        );
        if let Some(database) = params.text("database") {
            cmd.push_str(&format!(" -d {}", database));
        }
        if let Some(user) = params.text("user") {
            cmd.push_str(&format!(" {} {}", if pgsql { "-l" } else { "-u" }, user));
        }
        if let Some(password) = params.text("password") {
            cmd.push_str(&format!(" -p {}", password));
        }
        if pgsql {
            cmd.push_str(&format!(" -t {}", params.text_or("timeout", "30")));
        }
        cmd
    }
}
