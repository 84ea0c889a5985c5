//! Stream-processing pipeline (`logstash.conf`)

use super::{PROCESSOR_PORT, PipelineContext, SEARCH_HOST};
use crate::{GrammarKind, ParsingGrammar};

/// Quote a string for the pipeline DSL. Strings are not escape-processed, so
/// a value containing `"` is single-quoted instead.
fn quote(value: &str) -> String {
    if value.contains('"') && !value.contains('\'') {
        format!("'{}'", value)
    } else {
        format!("\"{}\"", value.replace('"', "'"))
    }
}

pub(super) fn logstash(ctx: &PipelineContext<'_>, grammars: &[ParsingGrammar]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "# Log pipeline for {} ({})\n# Generated by monforge. Changes are overwritten on the next deployment.\n\n",
        ctx.descriptor.identification.name, ctx.environment
    ));
    out.push_str(&format!("input {{\n  beats {{\n    port => {}\n  }}\n}}\n\n", PROCESSOR_PORT));

    out.push_str("filter {\n");
    for (idx, grammar) in grammars.iter().enumerate() {
        let keyword = if idx == 0 { "if" } else { "} else if" };
        out.push_str(&format!(
            "  {} [fields][log_type] == {} {{\n",
            keyword,
            quote(&grammar.log_type)
        ));
        match grammar.kind {
            GrammarKind::Structured => {
                out.push_str("    json {\n      source => \"message\"\n      skip_on_invalid_json => true\n    }\n");
            }
            GrammarKind::Grok | GrammarKind::Multiline { .. } => {
                let patterns: Vec<String> = grammar.grok_patterns().into_iter().map(quote).collect();
                out.push_str(&format!(
                    "    grok {{\n      match => {{ \"message\" => [{}] }}\n      tag_on_failure => [{}]\n    }}\n",
                    patterns.join(", "),
                    quote(&format!("_grokparsefailure_{}", grammar.log_type))
                ));
                if grammar.has_field("timestamp") {
                    out.push_str(
                        "    date {\n      match => [\"timestamp\", \"ISO8601\", \"yyyy-MM-dd HH:mm:ss,SSS\", \"yyyy-MM-dd HH:mm:ss\"]\n      target => \"@timestamp\"\n    }\n",
                    );
                }
            }
        }
    }
    if !grammars.is_empty() {
        out.push_str("  }\n");
    }
    out.push_str(&format!(
        "  mutate {{\n    add_field => {{\n      \"service\" => {}\n      \"environment\" => {}\n      \"log_type\" => \"%{{[fields][log_type]}}\"\n    }}\n  }}\n",
        quote(&ctx.service),
        quote(&ctx.environment)
    ));
    out.push_str("}\n\n");

    out.push_str(&format!(
        "output {{\n  elasticsearch {{\n    hosts => [{}]\n    index => {}\n  }}\n}}\n",
        quote(SEARCH_HOST),
        quote(&format!(
            "{}-{}-%{{[fields][log_type]}}-%{{+YYYY.MM.dd}}",
            ctx.index_prefix, ctx.environment
        ))
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::quote;

    #[test]
    fn quoting_avoids_escapes() {
        assert_eq!(quote("plain"), "\"plain\"");
        assert_eq!(quote(r#"say "hi""#), r#"'say "hi"'"#);
        assert_eq!(quote(r#"it's "x""#), r#""it's 'x'""#);
    }
}
