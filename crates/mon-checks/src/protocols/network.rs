//! Network service checks

use super::{DEFAULT_TIMEOUT_SECS, check_absolute_path, check_port, check_positive};
use crate::params::shell_quote;
use crate::{CheckParams, CheckPlugin, InvalidParam};
use mon_model::Dependency;

fn tls_port(dependency: &Dependency) -> bool {
    matches!(dependency.port(), Some(443) | Some(8443))
}

/// HTTP(S) endpoint check.
pub struct HttpCheck;

impl CheckPlugin for HttpCheck {
    fn protocol(&self) -> &str {
        "http"
    }

    fn aliases(&self) -> Vec<&str> {
        vec!["https", "web"]
    }

    fn description(&self) -> &str {
        "HTTP request with expected status code"
    }

    fn required_params(&self) -> Vec<&str> {
        vec!["port"]
    }

    fn optional_params(&self) -> Vec<&str> {
        vec!["url", "expected_status", "timeout", "ssl", "auth"]
    }

    fn defaults(&self, dependency: &Dependency) -> CheckParams {
        let ssl = tls_port(dependency) || dependency.protocol_key() == "https";
        let params = CheckParams::new()
            .with("url", "/")
            .with("expected_status", 200)
            .with("timeout", DEFAULT_TIMEOUT_SECS)
            .with("ssl", ssl);
        if dependency.protocol_key() == "https" {
            params.with("port", 443)
        } else {
            params
        }
    }

    fn validate(&self, params: &CheckParams) -> Result<(), InvalidParam> {
        check_port(params, "port")?;
        check_absolute_path(params, "url")?;
        check_positive(params, "timeout")?;
        if let Some(auth) = params.text("auth") {
            let secret_is_macro = auth.split_once(':').is_some_and(|(_, secret)| {
                secret.len() > 2 && secret.starts_with('$') && secret.ends_with('$')
            });
            if !secret_is_macro {
                return Err(InvalidParam::new(
                    "auth",
                    "must be '<user>:<macro>', e.g. 'monitor:$USER3$'",
                ));
            }
        }
        match params.number("expected_status") {
            Some(status) if (100..=599).contains(&status) => Ok(()),
            _ => Err(InvalidParam::new(
                "expected_status",
                "must be an HTTP status code between 100 and 599",
            )),
        }
    }

    fn command(&self, target: &str, params: &CheckParams) -> String {
        let mut cmd = format!(
            "check_http -H {} -p {} -u {} -e {} -t {}",
            target,
            params.text_or("port", ""),
            params.text_or("url", "/"),
            params.text_or("expected_status", "200"),
            params.text_or("timeout", "30"),
        );
        if let Some(auth) = params.text("auth") {
            cmd.push_str(&format!(" -a {}", auth));
        }
        if params.flag("ssl") {
            cmd.push_str(" -S");
        }
        cmd
    }

    fn supports_discovery(&self) -> bool {
        true
    }
}

/// Plain TCP connect check, optionally with a send/expect exchange.
pub struct TcpCheck;

impl CheckPlugin for TcpCheck {
    fn protocol(&self) -> &str {
        "tcp"
    }

    fn description(&self) -> &str {
        "TCP connection to a port"
    }

    fn required_params(&self) -> Vec<&str> {
        vec!["port"]
    }

    fn optional_params(&self) -> Vec<&str> {
        vec!["timeout", "send", "expect", "ssl"]
    }

    fn defaults(&self, _dependency: &Dependency) -> CheckParams {
        CheckParams::new().with("timeout", DEFAULT_TIMEOUT_SECS)
    }

    fn validate(&self, params: &CheckParams) -> Result<(), InvalidParam> {
        check_port(params, "port")?;
        check_positive(params, "timeout")
    }

    fn command(&self, target: &str, params: &CheckParams) -> String {
        let mut cmd = format!(
            "check_tcp -H {} -p {} -t {}",
            target,
            params.text_or("port", ""),
            params.text_or("timeout", "30"),
        );
        if let Some(send) = params.text("send") {
            cmd.push_str(&format!(" -s {}", shell_quote(&send)));
        }
        if let Some(expect) = params.text("expect") {
            cmd.push_str(&format!(" -e {}", shell_quote(&expect)));
        }
        if params.flag("ssl") {
            cmd.push_str(" -S");
        }
        cmd
    }
}

/// ICMP echo round-trip and loss check.
pub struct IcmpCheck;

impl CheckPlugin for IcmpCheck {
    fn protocol(&self) -> &str {
        "icmp"
    }

    fn aliases(&self) -> Vec<&str> {
        vec!["ping", "icmp-ping"]
    }

    fn description(&self) -> &str {
        "ICMP ping with round-trip and packet-loss thresholds"
    }

    fn required_params(&self) -> Vec<&str> {
        Vec::new()
    }

    fn optional_params(&self) -> Vec<&str> {
        vec!["warning", "critical", "packets"]
    }

    fn defaults(&self, _dependency: &Dependency) -> CheckParams {
        CheckParams::new()
            .with("warning", "100.0,20%")
            .with("critical", "500.0,60%")
            .with("packets", 5)
    }

    fn validate(&self, params: &CheckParams) -> Result<(), InvalidParam> {
        check_positive(params, "packets")?;
        for key in ["warning", "critical"] {
            if let Some(value) = params.text(key) {
                let well_formed = value
                    .split_once(',')
                    .is_some_and(|(rta, loss)| {
                        rta.parse::<f64>().is_ok()
                            && loss.strip_suffix('%').is_some_and(|l| l.parse::<u32>().is_ok())
                    });
                if !well_formed {
                    return Err(InvalidParam::new(key, "must look like '<rta ms>,<loss>%'"));
                }
            }
        }
        Ok(())
    }

    fn command(&self, target: &str, params: &CheckParams) -> String {
        format!(
            "check_ping -H {} -w {} -c {} -p {}",
            target,
            params.text_or("warning", "100.0,20%"),
            params.text_or("critical", "500.0,60%"),
            params.text_or("packets", "5"),
        )
    }
}

/// DNS resolution check.
pub struct DnsCheck;

impl CheckPlugin for DnsCheck {
    fn protocol(&self) -> &str {
        "dns"
    }

    fn description(&self) -> &str {
        "DNS lookup, optionally against a given server and expected address"
    }

    fn required_params(&self) -> Vec<&str> {
        vec!["lookup"]
    }

    fn optional_params(&self) -> Vec<&str> {
        vec!["server", "expected_address", "timeout"]
    }

    fn defaults(&self, dependency: &Dependency) -> CheckParams {
        let params = CheckParams::new().with("timeout", DEFAULT_TIMEOUT_SECS);
        match &dependency.host {
            Some(host) => params.with("lookup", host.as_str()),
            None => params,
        }
    }

    fn validate(&self, params: &CheckParams) -> Result<(), InvalidParam> {
        check_positive(params, "timeout")
    }

    fn command(&self, _target: &str, params: &CheckParams) -> String {
        let mut cmd = format!("check_dns -H {}", params.text_or("lookup", ""));
        if let Some(server) = params.text("server") {
            cmd.push_str(&format!(" -s {}", server));
        }
        if let Some(address) = params.text("expected_address") {
            cmd.push_str(&format!(" -a {}", address));
        }
        cmd.push_str(&format!(" -t {}", params.text_or("timeout", "30")));
        cmd
    }
}

/// LDAP bind and search check.
pub struct LdapCheck;

impl CheckPlugin for LdapCheck {
    fn protocol(&self) -> &str {
        "ldap"
    }

    fn aliases(&self) -> Vec<&str> {
        vec!["ldaps"]
    }

    fn description(&self) -> &str {
        "LDAP search below a base DN"
    }

    fn required_params(&self) -> Vec<&str> {
        vec!["port", "base_dn"]
    }

    fn optional_params(&self) -> Vec<&str> {
        vec!["timeout", "ssl"]
    }

    fn defaults(&self, dependency: &Dependency) -> CheckParams {
        let secure = dependency.protocol_key() == "ldaps" || dependency.port() == Some(636);
        CheckParams::new()
            .with("port", if secure { 636 } else { 389 })
            .with("timeout", DEFAULT_TIMEOUT_SECS)
            .with("ssl", secure)
    }

    fn validate(&self, params: &CheckParams) -> Result<(), InvalidParam> {
        check_port(params, "port")?;
        check_positive(params, "timeout")?;
        match params.text("base_dn") {
            Some(dn) if !dn.contains('=') => {
                Err(InvalidParam::new("base_dn", format!("'{}' is not a DN", dn)))
            }
            _ => Ok(()),
        }
    }

    fn command(&self, target: &str, params: &CheckParams) -> String {
        let mut cmd = format!(
            "check_ldap -H {} -p {} -b {} -t {}",
            target,
            params.text_or("port", "389"),
            shell_quote(&params.text_or("base_dn", "")),
            params.text_or("timeout", "30"),
        );
        if params.flag("ssl") {
            cmd.push_str(" -S");
        }
        cmd
    }
}

/// SMTP banner check.
pub struct SmtpCheck;

impl CheckPlugin for SmtpCheck {
    fn protocol(&self) -> &str {
        "smtp"
    }

    fn description(&self) -> &str {
        "SMTP connection and greeting"
    }

    fn required_params(&self) -> Vec<&str> {
        vec!["port"]
    }

    fn optional_params(&self) -> Vec<&str> {
        vec!["timeout"]
    }

    fn defaults(&self, _dependency: &Dependency) -> CheckParams {
        CheckParams::new()
            .with("port", 25)
            .with("timeout", DEFAULT_TIMEOUT_SECS)
    }

    fn validate(&self, params: &CheckParams) -> Result<(), InvalidParam> {
        check_port(params, "port")?;
        check_positive(params, "timeout")
    }

    fn command(&self, target: &str, params: &CheckParams) -> String {
        format!(
            "check_smtp -H {} -p {} -t {}",
            target,
            params.text_or("port", "25"),
            params.text_or("timeout", "30"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icmp_rejects_malformed_thresholds() {
        let params = IcmpCheck
            .defaults(&dependency("ping", None))
            .with("warning", "fast");
        assert_eq!(IcmpCheck.validate(&params).unwrap_err().parameter, "warning");
    }

    #[test]
    fn https_alias_defaults_to_tls_on_443() {
        let dep = dependency("https", None);
        let params = HttpCheck.defaults(&dep);
        assert!(params.flag("ssl"));
        assert_eq!(params.number("port"), Some(443));
    }

    #[test]
    fn ldap_quotes_base_dn() {
        let params = LdapCheck
            .defaults(&dependency("ldap", Some(389)))
            .with("base_dn", "dc=example,dc=com");
        assert_eq!(
            LdapCheck.command("ldap.example.com", &params),
            "check_ldap -H ldap.example.com -p 389 -b 'dc=example,dc=com' -t 30"
        );
    }

    fn dependency(protocol: &str, port: Option<u64>) -> Dependency {
        Dependency {
            name: "dep".into(),
            kind: String::new(),
            nature: mon_model::Nature::Internal,
            impact: mon_model::Impact::Low,
            port: port.map(mon_model::PortValue::Number),
            check_protocol: protocol.into(),
            effect: String::new(),
            check_params: Default::default(),
            host: None,
            affected_services: Vec::new(),
        }
    }
}
