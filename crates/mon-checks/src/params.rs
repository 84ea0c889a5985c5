//! Merged check parameters

use mon_model::ParamValue;
use std::collections::BTreeMap;

/// Where a parameter value came from. Later sources override earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParamSource {
    Default,
    Discovered,
    Dependency,
    Explicit,
}

/// Parameter set handed to a plugin after merging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckParams {
    values: BTreeMap<String, (ParamValue, ParamSource)>,
}

impl CheckParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder used by plugins to declare defaults.
    pub fn with(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value.into(), ParamSource::Default);
        self
    }

    pub fn insert(&mut self, key: &str, value: ParamValue, source: ParamSource) {
        self.values.insert(key.to_string(), (value, source));
    }

    /// Overlay every entry of `layer`, tagging it with `source`.
    pub fn overlay<'a>(
        &mut self,
        layer: impl IntoIterator<Item = (&'a String, &'a ParamValue)>,
        source: ParamSource,
    ) {
        for (key, value) in layer {
            self.insert(key, value.clone(), source);
        }
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key).map(|(value, _)| value)
    }

    pub fn source(&self, key: &str) -> Option<ParamSource> {
        self.values.get(key).map(|(_, source)| *source)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values
            .get(key)
            .is_some_and(|(value, _)| !matches!(value, ParamValue::Text(s) if s.trim().is_empty()))
    }

    /// Text form of a parameter; empty strings read as absent.
    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(ToString::to_string)
            .filter(|s| !s.trim().is_empty())
    }

    pub fn text_or(&self, key: &str, fallback: &str) -> String {
        self.text(key).unwrap_or_else(|| fallback.to_string())
    }

    pub fn number(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(ParamValue::as_u64)
    }

    pub fn flag(&self, key: &str) -> bool {
        self.get(key).and_then(ParamValue::as_bool).unwrap_or(false)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// Quote a value for a POSIX shell command line.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
