//! Compiled parsing grammars

use crate::fragments::FieldType;
use crate::retention::RetentionDirective;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A pattern token that had no fragment and was matched literally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompileWarning {
    pub source_name: String,
    pub token: String,
    pub pattern: String,
}

impl fmt::Display for CompileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "log source '{}': unknown token '{}' in \"{}\" is matched literally",
            self.source_name, self.token, self.pattern
        )
    }
}

/// How records of a source are delimited and decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GrammarKind {
    /// One record per line, parsed by the grok expressions.
    Grok,
    /// Records start at a line matching `start_pattern`; other lines are
    /// appended to the previous record.
    Multiline { start_pattern: String },
    /// Self-describing JSON records; field names pass through.
    Structured,
}

/// One pattern string compiled to grok and to an equivalent regex.
#[derive(Debug, Clone)]
pub struct GrammarExpression {
    pub pattern: String,
    pub grok: String,
    pub regex: String,
    pub fields: Vec<(String, FieldType)>,
    pub(crate) compiled: Regex,
}

impl GrammarExpression {
    /// Fields captured from `line`, or `None` when it does not match.
    pub fn captures(&self, line: &str) -> Option<BTreeMap<String, String>> {
        let caps = self.compiled.captures(line)?;
        Some(
            self.compiled
                .capture_names()
                .flatten()
                .filter_map(|name| caps.name(name).map(|m| (name.to_string(), m.as_str().to_string())))
                .collect(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct ParsingGrammar {
    pub source_name: String,
    pub log_type: String,
    pub path: String,
    pub kind: GrammarKind,
    pub expressions: Vec<GrammarExpression>,
    pub retention: Option<RetentionDirective>,
    pub warnings: Vec<CompileWarning>,
    pub(crate) record_start: Option<Regex>,
}

impl ParsingGrammar {
    /// Extracted fields across all expressions, first declaration wins.
    pub fn fields(&self) -> Vec<(&str, FieldType)> {
        let mut out: Vec<(&str, FieldType)> = Vec::new();
        for (name, field_type) in self.expressions.iter().flat_map(|e| &e.fields) {
            if !out.iter().any(|(n, _)| n == name) {
                out.push((name.as_str(), *field_type));
            }
        }
        out
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.expressions
            .iter()
            .any(|e| e.fields.iter().any(|(n, _)| n == name))
    }

    /// grok pattern strings in match order.
    pub fn grok_patterns(&self) -> Vec<&str> {
        self.expressions.iter().map(|e| e.grok.as_str()).collect()
    }

    /// Whether `line` continues the previous record instead of starting one.
    pub fn continues_record(&self, line: &str) -> bool {
        self.record_start
            .as_ref()
            .is_some_and(|start| !start.is_match(line))
    }

    /// Parse one record locally. Structured records decode as a JSON object
    /// and keep their own field names.
    pub fn parse_record(&self, record: &str) -> Option<BTreeMap<String, String>> {
        if self.kind == GrammarKind::Structured {
            let value: serde_json::Value = serde_json::from_str(record).ok()?;
            return Some(
                value
                    .as_object()?
                    .iter()
                    .map(|(k, v)| {
                        let text = match v {
                            serde_json::Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        (k.clone(), text)
                    })
                    .collect(),
            );
        }
        self.expressions.iter().find_map(|e| e.captures(record))
    }

    /// Group raw lines into records according to the grammar kind.
    pub fn records<'a>(&self, lines: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut records: Vec<String> = Vec::new();
        for line in lines {
            match records.last_mut() {
                Some(last) if self.continues_record(line) => {
                    last.push('\n');
                    last.push_str(line);
                }
                _ => records.push(line.to_string()),
            }
        }
        records
    }
}
