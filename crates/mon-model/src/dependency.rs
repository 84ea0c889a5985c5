//! Dependencies of the monitored service

use crate::naming::slugify;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Nature {
    #[serde(alias = "Internal", alias = "Interna", alias = "interna", alias = "Interno")]
    Internal,
    #[serde(alias = "External", alias = "Externa", alias = "externa", alias = "Externo")]
    External,
}

/// Effect of losing the dependency. Drives check interval and escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    #[serde(alias = "Critical", alias = "Crítico", alias = "Critico", alias = "Crítica", alias = "crítico")]
    Critical,
    #[serde(alias = "High", alias = "Alto", alias = "alto", alias = "Alta")]
    High,
    #[serde(alias = "Medium", alias = "Medio", alias = "medio", alias = "Media")]
    Medium,
    #[serde(alias = "Low", alias = "Bajo", alias = "bajo", alias = "Baja")]
    Low,
    #[serde(alias = "None", alias = "Ninguno", alias = "ninguno", alias = "Ninguna")]
    None,
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::None => "none",
        };
        f.write_str(name)
    }
}

/// A port as written in the document: a number or a numeric string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortValue {
    Number(u64),
    Text(String),
}

impl PortValue {
    /// The port as `u16`, `Ok(None)` for an empty string.
    pub fn resolve(&self) -> Result<Option<u16>, String> {
        let parsed = match self {
            Self::Number(n) => *n,
            Self::Text(s) if s.trim().is_empty() => return Ok(None),
            Self::Text(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| format!("'{}' is not a port number", s))?,
        };
        match u16::try_from(parsed) {
            Ok(port) if port > 0 => Ok(Some(port)),
            _ => Err(format!("{} is outside the port range 1-65535", parsed)),
        }
    }
}

/// A scalar check parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Text(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "1" | "on" => Some(true),
                "false" | "no" | "0" | "off" => Some(false),
                _ => None,
            },
            Self::Integer(n) => Some(*n != 0),
            Self::Float(_) => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Integer(n) => u64::try_from(*n).ok(),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Float(f) if f.fract() == 0.0 && *f >= 0.0 => Some(*f as u64),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(n) => write!(f, "{}", n),
            Self::Float(x) => write!(f, "{}", x),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for ParamValue {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<u16> for ParamValue {
    fn from(n: u16) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<u32> for ParamValue {
    fn from(n: u32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Something the service needs in order to work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub nature: Nature,
    pub impact: Impact,
    #[serde(default)]
    pub port: Option<PortValue>,
    pub check_protocol: String,
    #[serde(default)]
    pub effect: String,
    #[serde(default)]
    pub check_params: BTreeMap<String, ParamValue>,
    /// Address of the dependency; checks target the monitored host when absent.
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub affected_services: Vec<String>,
}

impl Dependency {
    /// Resolved port. Descriptors are validated on load, so an invalid value
    /// here reads as absent.
    pub fn port(&self) -> Option<u16> {
        self.port.as_ref().and_then(|p| p.resolve().ok().flatten())
    }

    pub fn protocol_key(&self) -> String {
        self.check_protocol.trim().to_lowercase()
    }

    pub fn slug(&self) -> String {
        slugify(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(PortValue::Number(5432), Ok(Some(5432)))]
    #[case(PortValue::Text("443".into()), Ok(Some(443)))]
    #[case(PortValue::Text(" ".into()), Ok(None))]
    fn port_resolution(#[case] value: PortValue, #[case] expected: Result<Option<u16>, String>) {
        assert_eq!(value.resolve(), expected);
    }

    #[rstest]
    #[case(PortValue::Number(0))]
    #[case(PortValue::Number(70000))]
    #[case(PortValue::Text("http".into()))]
    fn invalid_ports(#[case] value: PortValue) {
        assert!(value.resolve().is_err());
    }

    #[test]
    fn dependency_accepts_form_values() {
        let dep: Dependency = serde_json::from_str(
            r#"{"name":"LDAP","type":"Autenticación","nature":"Externa","impact":"Alto",
                "port":"5032","check_protocol":"TCP","effect":"Sin login"}"#,
        )
        .unwrap();

        assert_eq!(dep.nature, Nature::External);
        assert_eq!(dep.impact, Impact::High);
        assert_eq!(dep.port(), Some(5032));
        assert_eq!(dep.protocol_key(), "tcp");
        assert!(dep.check_params.is_empty());
    }

    #[test]
    fn param_values_keep_scalar_types() {
        let params: BTreeMap<String, ParamValue> =
            serde_json::from_str(r#"{"expected_status":200,"ssl":true,"url":"/health","ratio":0.5}"#)
                .unwrap();

        assert_eq!(params["expected_status"], ParamValue::Integer(200));
        assert_eq!(params["ssl"].as_bool(), Some(true));
        assert_eq!(params["url"].to_string(), "/health");
        assert_eq!(params["ratio"], ParamValue::Float(0.5));
        assert_eq!(ParamValue::from("30").as_u64(), Some(30));
    }
}
