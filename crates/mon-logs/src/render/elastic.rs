//! Ingest pipeline and index template bodies
//!
//! Both are valid request bodies for the search cluster's
//! `/_ingest/pipeline/<name>` and `/_index_template/<name>` endpoints.

use super::PipelineContext;
use crate::{GrammarKind, ParsingGrammar};
use serde_json::{Map, Value, json};

fn source_condition(grammar: &ParsingGrammar) -> String {
    format!("ctx.fields?.log_type == '{}'", grammar.log_type.replace('\'', ""))
}

pub(super) fn ingest_pipeline(ctx: &PipelineContext<'_>, grammars: &[ParsingGrammar]) -> Value {
    let mut processors = vec![
        json!({ "set": { "field": "service", "value": ctx.service } }),
        json!({ "set": { "field": "environment", "value": ctx.environment } }),
        json!({ "set": { "field": "log_type", "copy_from": "fields.log_type", "ignore_empty_value": true } }),
    ];
    for grammar in grammars {
        match grammar.kind {
            GrammarKind::Structured => processors.push(json!({
                "json": {
                    "if": source_condition(grammar),
                    "field": "message",
                    "add_to_root": true,
                    "ignore_failure": true
                }
            })),
            GrammarKind::Grok | GrammarKind::Multiline { .. } => {
                processors.push(json!({
                    "grok": {
                        "if": source_condition(grammar),
                        "field": "message",
                        "patterns": grammar.grok_patterns(),
                        "tag": grammar.log_type,
                    }
                }));
                if grammar.has_field("timestamp") {
                    processors.push(json!({
                        "date": {
                            "if": source_condition(grammar),
                            "field": "timestamp",
                            "formats": ["ISO8601", "yyyy-MM-dd HH:mm:ss,SSS", "yyyy-MM-dd HH:mm:ss"],
                            "target_field": "@timestamp",
                            "ignore_failure": true
                        }
                    }));
                }
            }
        }
    }
    json!({
        "description": format!(
            "Log pipeline for {} ({})",
            ctx.descriptor.identification.name, ctx.environment
        ),
        "processors": processors,
        "on_failure": [
            { "set": { "field": "error.message", "value": "{{ _ingest.on_failure_message }}" } }
        ],
        "_meta": { "service": ctx.service, "managed_by": "monforge" }
    })
}

/// Lifecycle phases from the grammars' retention directives. Size caps drive
/// rollover; the longest age drives deletion.
fn lifecycle_policy(grammars: &[ParsingGrammar]) -> Value {
    let directives: Vec<_> = grammars.iter().filter_map(|g| g.retention.as_ref()).collect();
    let mut rollover = Map::new();
    if let Some(size) = directives
        .iter()
        .filter(|d| d.max_size_bytes.is_some())
        .max_by_key(|d| d.max_size_bytes)
        .and_then(|d| d.rollover_size())
    {
        rollover.insert("max_primary_shard_size".into(), json!(size));
    }
    rollover.insert("max_age".into(), json!("1d"));

    let mut phases = Map::new();
    phases.insert("hot".into(), json!({ "actions": { "rollover": rollover } }));
    if let Some(days) = directives.iter().filter_map(|d| d.max_age_days).max() {
        phases.insert(
            "delete".into(),
            json!({ "min_age": format!("{}d", days), "actions": { "delete": {} } }),
        );
    }
    json!({ "policy": { "phases": phases } })
}

pub(super) fn index_template(ctx: &PipelineContext<'_>, grammars: &[ParsingGrammar]) -> Value {
    let mut properties = Map::new();
    properties.insert("@timestamp".into(), json!({ "type": "date" }));
    properties.insert("message".into(), json!({ "type": "text" }));
    for tag in ["service", "environment", "log_type"] {
        properties.insert(tag.into(), json!({ "type": "keyword" }));
    }
    for grammar in grammars {
        for (field, field_type) in grammar.fields() {
            properties
                .entry(field.to_string())
                .or_insert_with(|| json!({ "type": field_type.as_str() }));
        }
    }

    let retention: Map<String, Value> = grammars
        .iter()
        .filter_map(|g| {
            let directive = g.retention.as_ref()?;
            serde_json::to_value(directive).ok().map(|v| (g.log_type.clone(), v))
        })
        .collect();

    json!({
        "index_patterns": [format!("{}-{}-*", ctx.index_prefix, ctx.environment)],
        "priority": 200,
        "template": {
            "settings": {
                "number_of_shards": 1,
                "number_of_replicas": 1,
                "index.lifecycle.name": ctx.asset_name(),
                "index.default_pipeline": ctx.asset_name()
            },
            "mappings": { "properties": properties }
        },
        "_meta": {
            "service": ctx.service,
            "managed_by": "monforge",
            "retention": retention,
            "lifecycle_policy": lifecycle_policy(grammars)
        }
    })
}
