use mon_fs::DocumentFormat;
use mon_logs::{GrammarKind, LogCompiler, PIPELINE_FILES, render_environment};
use mon_model::{ServiceDescriptor, parse_descriptor};
use mon_test_utils::descriptor::SAMPLE_DESCRIPTOR_JSON;
use pretty_assertions::assert_eq;
use serde_json::Value;

fn sample() -> ServiceDescriptor {
    parse_descriptor(SAMPLE_DESCRIPTOR_JSON, DocumentFormat::Json).unwrap()
}

#[test]
fn sample_sources_compile_leniently() {
    let report = LogCompiler::new(false).compile_all(&sample());

    assert!(report.is_ok(), "{:?}", report.errors);
    let kinds: Vec<&str> = report
        .grammars
        .iter()
        .map(|g| match g.kind {
            GrammarKind::Grok => "grok",
            GrammarKind::Multiline { .. } => "multiline",
            GrammarKind::Structured => "structured",
        })
        .collect();
    assert_eq!(kinds, vec!["grok", "multiline", "structured", "grok"]);

    // `IP` in "IP:IP_ADDRESS" is itself an uppercase word with no fragment.
    let tokens: Vec<&str> = report.warnings().map(|w| w.token.as_str()).collect();
    assert_eq!(tokens, vec!["SECURITY", "IP"]);
}

#[test]
fn strict_default_reports_the_failing_source() {
    let report = LogCompiler::new(true).compile_all(&sample());

    assert_eq!(report.grammars.len(), 3);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].source_name(), Some("security.log"));
}

#[test]
fn artifacts_carry_metadata_tags() {
    let descriptor = sample();
    let report = LogCompiler::default().compile_all(&descriptor);
    let environment = descriptor.environment("EXP").unwrap();

    let files = render_environment(&descriptor, environment, &report.grammars).unwrap();

    assert_eq!(files.files().map(|(name, _)| name), PIPELINE_FILES);
    assert_eq!(files.asset_name, "payments-api-logs");

    let filebeat: serde_yaml::Value = serde_yaml::from_str(&files.filebeat).unwrap();
    let inputs = filebeat["filebeat.inputs"].as_sequence().unwrap();
    assert_eq!(inputs.len(), 4);
    assert_eq!(inputs[0]["fields"]["service"].as_str(), Some("payments_api"));
    assert_eq!(inputs[0]["fields"]["environment"].as_str(), Some("exp"));
    assert_eq!(inputs[0]["fields"]["log_type"].as_str(), Some("payments"));
    assert_eq!(inputs[1]["multiline.negate"].as_bool(), Some(true));
    assert_eq!(inputs[1]["multiline.match"].as_str(), Some("after"));
    assert_eq!(inputs[2]["json.keys_under_root"].as_bool(), Some(true));

    assert!(files.logstash.contains("if [fields][log_type] == \"payments\" {"));
    assert!(files.logstash.contains("} else if [fields][log_type] == \"audit\" {"));
    assert!(files.logstash.contains("%{TIMESTAMP_ISO8601:timestamp}"));
    assert!(files.logstash.contains("\"environment\" => \"exp\""));

    let template: Value = serde_json::from_str(&files.index_template).unwrap();
    let properties = &template["template"]["mappings"]["properties"];
    assert_eq!(properties["timestamp"]["type"], "date");
    assert_eq!(properties["level"]["type"], "keyword");
    assert_eq!(properties["client_ip"]["type"], "ip");
    assert_eq!(properties["line"]["type"], "integer");
    assert_eq!(template["_meta"]["retention"]["worker"]["max_age_days"], 30);
    assert_eq!(
        template["_meta"]["lifecycle_policy"]["policy"]["phases"]["delete"]["min_age"],
        "30d"
    );

    let alerts: Value = serde_json::from_str(&files.alerts).unwrap();
    let alerts = alerts.as_array().unwrap();
    assert_eq!(alerts.len(), 1 + 4);
    assert_eq!(
        alerts[0]["actions"][0]["recipients"],
        serde_json::json!(["ana@example.com", "luis@example.com"])
    );

    let pipeline: Value = serde_json::from_str(&files.ingest_pipeline).unwrap();
    assert!(pipeline["processors"].as_array().unwrap().len() > 3);
    let dashboard: Value = serde_json::from_str(&files.dashboard).unwrap();
    assert!(dashboard["panels"].as_array().unwrap().iter().any(|p| p["field"] == "user"));
}

#[test]
fn rendering_is_deterministic() {
    let descriptor = sample();
    let compiler = LogCompiler::default();
    let environment = descriptor.environment("DEV").unwrap();

    let first = render_environment(&descriptor, environment, &compiler.compile_all(&descriptor).grammars).unwrap();
    let second = render_environment(&descriptor, environment, &compiler.compile_all(&descriptor).grammars).unwrap();

    assert_eq!(first, second);
}
