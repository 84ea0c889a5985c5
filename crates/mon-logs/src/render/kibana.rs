//! Dashboard and alert definitions

use super::PipelineContext;
use crate::ParsingGrammar;
use serde_json::{Value, json};

/// Words that mark a record as a problem in the per-source alerts.
const PROBLEM_KEYWORDS: [&str; 4] = ["ERROR", "FAILED", "EXCEPTION", "CRITICAL"];

pub(super) fn dashboard(ctx: &PipelineContext<'_>, grammars: &[ParsingGrammar]) -> Value {
    let base_query = format!(
        "service: \"{}\" and environment: \"{}\"",
        ctx.service, ctx.environment
    );
    let mut panels = vec![json!({
        "id": "recent-logs",
        "type": "search",
        "title": "Recent logs",
        "query": { "language": "kuery", "query": base_query },
        "columns": ["log_type", "message"]
    })];
    panels.push(json!({
        "id": "volume-by-source",
        "type": "histogram",
        "title": "Volume by log source",
        "field": "log_type",
        "interval": "auto"
    }));
    if grammars.iter().any(|g| g.has_field("level")) {
        panels.push(json!({
            "id": "records-by-level",
            "type": "histogram",
            "title": "Records by level",
            "field": "level",
            "interval": "auto"
        }));
    }
    if grammars.iter().any(|g| g.has_field("user")) {
        panels.push(json!({
            "id": "activity-by-user",
            "type": "pie",
            "title": "Activity by user",
            "field": "user"
        }));
    }
    if grammars.iter().any(|g| g.has_field("status_code")) {
        panels.push(json!({
            "id": "status-codes",
            "type": "pie",
            "title": "Response status codes",
            "field": "status_code"
        }));
    }
    json!({
        "id": format!("{}_{}_overview", ctx.service, ctx.environment),
        "title": format!("{} - {} overview", ctx.descriptor.identification.name, ctx.environment),
        "description": ctx.descriptor.identification.description,
        "index_pattern": format!("{}-{}-*", ctx.index_prefix, ctx.environment),
        "panels": panels
    })
}

pub(super) fn alerts(ctx: &PipelineContext<'_>, grammars: &[ParsingGrammar]) -> Value {
    let recipients = ctx.descriptor.responsible_emails();
    let email = json!({ "type": "email", "recipients": recipients });

    let mut alerts = vec![json!({
        "id": format!("{}_{}_critical_errors", ctx.service, ctx.environment),
        "name": format!("Critical errors - {} ({})", ctx.descriptor.identification.name, ctx.environment),
        "condition": {
            "query": {
                "bool": {
                    "filter": [
                        { "term": { "service": ctx.service } },
                        { "term": { "environment": ctx.environment } },
                        { "terms": { "level": ["ERROR", "CRITICAL", "FATAL"] } }
                    ]
                }
            },
            "threshold": 1,
            "window": "5m"
        },
        "actions": [email.clone()]
    })];

    for grammar in grammars {
        alerts.push(json!({
            "id": format!("{}_{}_{}_problems", ctx.service, ctx.environment, grammar.log_type),
            "name": format!("Problems in {} - {}", grammar.source_name, ctx.descriptor.identification.name),
            "condition": {
                "query": {
                    "bool": {
                        "filter": [
                            { "term": { "service": ctx.service } },
                            { "term": { "environment": ctx.environment } },
                            { "term": { "log_type": grammar.log_type } }
                        ],
                        "must": {
                            "query_string": {
                                "default_field": "message",
                                "query": PROBLEM_KEYWORDS.join(" OR ")
                            }
                        }
                    }
                },
                "threshold": 5,
                "window": "15m"
            },
            "actions": [email.clone()]
        }));
    }
    Value::Array(alerts)
}
