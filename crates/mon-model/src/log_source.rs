//! Log sources shipped to the log pipeline

use crate::naming::slugify;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogFormat {
    #[serde(rename = "plain", alias = "Texto plano simple", alias = "text")]
    Plain,
    #[serde(rename = "multiline", alias = "Texto plano multilínea", alias = "Texto plano multilinea")]
    Multiline,
    #[serde(rename = "json", alias = "structured-json", alias = "JSON estructurado", alias = "JSON")]
    StructuredJson,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Plain => "plain",
            Self::Multiline => "multiline",
            Self::StructuredJson => "json",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionMethod {
    #[serde(alias = "tamano", alias = "tamaño", alias = "Tamaño")]
    Size,
    #[serde(alias = "tiempo", alias = "Tiempo", alias = "age")]
    Time,
}

/// Rotation policy as written in the descriptor, e.g. `size` / `10MB, 5 backups`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub method: RetentionMethod,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSource {
    pub name: String,
    pub path: String,
    pub format: LogFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_method: Option<RetentionMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_value: Option<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
    /// Overrides the global unknown-token policy for this source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

impl LogSource {
    /// Log type tag, derived from the file name without its extension.
    pub fn log_type(&self) -> String {
        let stem = self.name.rsplit_once('.').map_or(self.name.as_str(), |(stem, _)| stem);
        slugify(stem)
    }

    pub fn retention(&self) -> Option<RetentionPolicy> {
        match (self.retention_method, &self.retention_value) {
            (Some(method), Some(value)) if !value.trim().is_empty() => Some(RetentionPolicy {
                method,
                value: value.clone(),
            }),
            _ => None,
        }
    }
}
