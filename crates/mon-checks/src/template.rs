//! Declarative check plugins
//!
//! Operators add protocols without writing Rust by listing TOML files in the
//! infrastructure configuration:
//!
//! ```toml
//! [[plugin]]
//! protocol = "redis"
//! aliases = ["redis-server"]
//! description = "Redis PING"
//! required = ["port"]
//! optional = ["password"]
//! command = "check_redis -H {host} -p {port}[ -a {password}]"
//!
//! [plugin.defaults]
//! port = 6379
//!
//! [plugin.choices]
//! mode = ["ping", "info"]
//! ```
//!
//! `{name}` inserts a parameter and `{host}` the check target. A bracketed
//! group is emitted only when every parameter inside it is set.

use crate::protocols::check_port;
use crate::registry::PluginProvider;
use crate::{CheckParams, CheckPlugin, Error, InvalidParam, Result};
use mon_fs::{ConfigStore, NormalizedPath};
use mon_model::{Dependency, ParamValue};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

const TARGET_PLACEHOLDER: &str = "host";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginDefinition {
    pub protocol: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub optional: Vec<String>,
    pub command: String,
    #[serde(default)]
    pub defaults: BTreeMap<String, ParamValue>,
    #[serde(default)]
    pub choices: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct PluginFile {
    #[serde(default)]
    plugin: Vec<PluginDefinition>,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Param(String),
    Optional(Vec<Segment>),
}

fn parse_template(template: &str) -> std::result::Result<Vec<Segment>, String> {
    fn flush(literal: &mut String, into: &mut Vec<Segment>) {
        if !literal.is_empty() {
            into.push(Segment::Literal(std::mem::take(literal)));
        }
    }

    let mut top = Vec::new();
    let mut group: Option<Vec<Segment>> = None;
    let mut literal = String::new();
    let mut chars = template.chars();

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == '}' {
                        closed = true;
                        break;
                    }
                    name.push(next);
                }
                if !closed {
                    return Err("unclosed '{'".to_string());
                }
                let name = name.trim();
                if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                    return Err(format!("invalid placeholder '{{{}}}'", name));
                }
                let target = group.as_mut().unwrap_or(&mut top);
                flush(&mut literal, target);
                target.push(Segment::Param(name.to_string()));
            }
            '}' => return Err("unmatched '}'".to_string()),
            '[' => {
                if group.is_some() {
                    return Err("optional groups cannot be nested".to_string());
                }
                flush(&mut literal, &mut top);
                group = Some(Vec::new());
            }
            ']' => match group.take() {
                Some(mut segments) => {
                    flush(&mut literal, &mut segments);
                    top.push(Segment::Optional(segments));
                }
                None => return Err("unmatched ']'".to_string()),
            },
            c => literal.push(c),
        }
    }
    if group.is_some() {
        return Err("unclosed '['".to_string());
    }
    flush(&mut literal, &mut top);
    Ok(top)
}

fn params_in(segments: &[Segment], into: &mut Vec<String>) {
    for segment in segments {
        match segment {
            Segment::Param(name) => into.push(name.clone()),
            Segment::Optional(inner) => params_in(inner, into),
            Segment::Literal(_) => {}
        }
    }
}

/// A plugin backed by a [`PluginDefinition`].
#[derive(Debug, Clone)]
pub struct TemplatePlugin {
    definition: PluginDefinition,
    segments: Vec<Segment>,
    source: String,
}

impl TemplatePlugin {
    /// Compile a definition, rejecting templates that reference unknown
    /// parameters or always-emitted parameters that may be unset.
    pub fn new(mut definition: PluginDefinition, source: impl Into<String>) -> std::result::Result<Self, String> {
        definition.protocol = definition.protocol.trim().to_lowercase();
        if definition.protocol.is_empty() {
            return Err("protocol must not be empty".to_string());
        }
        let segments = parse_template(&definition.command)?;

        let declared: HashSet<&str> = definition
            .required
            .iter()
            .chain(&definition.optional)
            .chain(definition.defaults.keys())
            .map(String::as_str)
            .chain(std::iter::once(TARGET_PLACEHOLDER))
            .collect();
        let always_set: HashSet<&str> = definition
            .required
            .iter()
            .chain(definition.defaults.keys())
            .map(String::as_str)
            .chain(std::iter::once(TARGET_PLACEHOLDER))
            .collect();

        let mut all = Vec::new();
        params_in(&segments, &mut all);
        if let Some(unknown) = all.iter().find(|p| !declared.contains(p.as_str())) {
            return Err(format!("placeholder '{{{}}}' is not a declared parameter", unknown));
        }
        for segment in &segments {
            if let Segment::Param(name) = segment {
                if !always_set.contains(name.as_str()) {
                    return Err(format!(
                        "optional parameter '{}' must be inside a [...] group",
                        name
                    ));
                }
            }
        }

        Ok(Self {
            definition,
            segments,
            source: source.into(),
        })
    }

    pub fn definition(&self) -> &PluginDefinition {
        &self.definition
    }

    fn render(&self, segments: &[Segment], target: &str, params: &CheckParams, out: &mut String) {
        for segment in segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Param(name) if name == TARGET_PLACEHOLDER => out.push_str(target),
                Segment::Param(name) => out.push_str(&params.text_or(name, "")),
                Segment::Optional(inner) => {
                    let mut names = Vec::new();
                    params_in(inner, &mut names);
                    let complete = names
                        .iter()
                        .all(|n| n == TARGET_PLACEHOLDER || params.contains(n));
                    if complete {
                        self.render(inner, target, params, out);
                    }
                }
            }
        }
    }
}

impl CheckPlugin for TemplatePlugin {
    fn protocol(&self) -> &str {
        &self.definition.protocol
    }

    fn aliases(&self) -> Vec<&str> {
        self.definition.aliases.iter().map(String::as_str).collect()
    }

    fn description(&self) -> &str {
        &self.definition.description
    }

    fn required_params(&self) -> Vec<&str> {
        self.definition.required.iter().map(String::as_str).collect()
    }

    fn optional_params(&self) -> Vec<&str> {
        self.definition.optional.iter().map(String::as_str).collect()
    }

    fn defaults(&self, _dependency: &Dependency) -> CheckParams {
        let mut params = CheckParams::new();
        params.overlay(&self.definition.defaults, crate::ParamSource::Default);
        params
    }

    fn validate(&self, params: &CheckParams) -> std::result::Result<(), InvalidParam> {
        check_port(params, "port")?;
        for (key, allowed) in &self.definition.choices {
            if let Some(value) = params.text(key) {
                if !allowed.contains(&value) {
                    return Err(InvalidParam::new(
                        key.as_str(),
                        format!("'{}' is not one of {}", value, allowed.join(", ")),
                    ));
                }
            }
        }
        Ok(())
    }

    fn command(&self, target: &str, params: &CheckParams) -> String {
        let mut out = String::new();
        self.render(&self.segments, target, params, &mut out);
        out.trim().to_string()
    }

    fn origin(&self) -> String {
        self.source.clone()
    }
}

/// Provider loading plugin definitions from an explicit list of TOML files.
pub struct TemplateProvider {
    files: Vec<NormalizedPath>,
}

impl TemplateProvider {
    pub fn new(files: Vec<NormalizedPath>) -> Self {
        Self { files }
    }
}

impl PluginProvider for TemplateProvider {
    fn name(&self) -> String {
        format!("plugin files ({})", self.files.len())
    }

    fn plugins(&self) -> Result<Vec<Arc<dyn CheckPlugin>>> {
        let store = ConfigStore::new();
        let mut plugins: Vec<Arc<dyn CheckPlugin>> = Vec::new();
        for path in &self.files {
            let file: PluginFile = store.load(path)?;
            if file.plugin.is_empty() {
                tracing::warn!(path = %path, "plugin file defines no [[plugin]] entries");
            }
            for definition in file.plugin {
                let plugin = TemplatePlugin::new(definition, path.as_str()).map_err(|message| {
                    Error::PluginDefinition {
                        path: path.to_native(),
                        message,
                    }
                })?;
                plugins.push(Arc::new(plugin));
            }
        }
        Ok(plugins)
    }
}
