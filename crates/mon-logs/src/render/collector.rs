//! Collector inputs (`filebeat.yml`)

use super::{PROCESSOR_HOST, PipelineContext};
use crate::{GrammarKind, ParsingGrammar};
use serde_json::{Map, Value, json};

pub(super) fn filebeat(ctx: &PipelineContext<'_>, grammars: &[ParsingGrammar]) -> Value {
    let inputs: Vec<Value> = grammars.iter().map(|g| input(ctx, g)).collect();
    json!({
        "filebeat.inputs": inputs,
        "processors": [
            { "add_host_metadata": { "when.not.contains.tags": "forwarded" } },
            { "add_fields": {
                "target": "",
                "fields": { "service": ctx.service, "environment": ctx.environment }
            } }
        ],
        "output.logstash": { "hosts": [PROCESSOR_HOST] },
        "setup.ilm.enabled": false,
        "setup.template.enabled": false,
    })
}

fn input(ctx: &PipelineContext<'_>, grammar: &ParsingGrammar) -> Value {
    let mut input = Map::new();
    input.insert("type".into(), json!("log"));
    input.insert(
        "id".into(),
        json!(format!("{}-{}-{}", ctx.service, ctx.environment, grammar.log_type)),
    );
    input.insert("paths".into(), json!([grammar.path]));
    input.insert("encoding".into(), json!("utf-8"));
    input.insert(
        "fields".into(),
        json!({
            "service": ctx.service,
            "environment": ctx.environment,
            "log_type": grammar.log_type,
        }),
    );
    input.insert(
        "tags".into(),
        json!([ctx.service, ctx.environment, grammar.log_type]),
    );
    match &grammar.kind {
        GrammarKind::Multiline { start_pattern } => {
            input.insert("multiline.type".into(), json!("pattern"));
            input.insert("multiline.pattern".into(), json!(start_pattern));
            input.insert("multiline.negate".into(), json!(true));
            input.insert("multiline.match".into(), json!("after"));
        }
        GrammarKind::Structured => {
            input.insert("json.keys_under_root".into(), json!(true));
            input.insert("json.overwrite_keys".into(), json!(true));
            input.insert("json.add_error_key".into(), json!(true));
        }
        GrammarKind::Grok => {}
    }
    Value::Object(input)
}
