use mon_checks::nagios::{OBJECT_FILES, parse_objects};
use mon_checks::{CheckRegistry, CheckSynthesizer, render_environment, validate_object_set};
use mon_fs::DocumentFormat;
use mon_model::{ServiceDescriptor, parse_descriptor};
use mon_test_utils::descriptor::{MINIMAL_DESCRIPTOR_JSON, SAMPLE_DESCRIPTOR_JSON};
use pretty_assertions::assert_eq;

fn sample() -> ServiceDescriptor {
    parse_descriptor(SAMPLE_DESCRIPTOR_JSON, DocumentFormat::Json).unwrap()
}

fn count(content: &str, kind: &str) -> usize {
    parse_objects("x.cfg", content)
        .0
        .iter()
        .filter(|o| o.kind == kind)
        .count()
}

#[test]
fn sample_descriptor_synthesizes_every_dependency() {
    let registry = CheckRegistry::with_builtins();
    let report = CheckSynthesizer::new(&registry).synthesize_all(&sample());

    assert!(report.is_ok(), "{:?}", report.errors);
    let names: Vec<&str> = report.commands.iter().map(|c| c.command_name.as_str()).collect();
    assert_eq!(names, vec!["check_tcp_db", "check_http_auth_api", "check_docker_worker"]);
    assert_eq!(
        report.commands[0].command_line,
        "check_tcp -H $HOSTADDRESS$ -p 5432 -t 30"
    );
    assert!(report.commands[1].command_line.contains("-u /api/v1/health"));
    assert!(report.commands[1].command_line.ends_with("-S"));
}

#[test]
fn rendered_environment_is_a_consistent_object_set() {
    let descriptor = sample();
    let registry = CheckRegistry::with_builtins();
    let report = CheckSynthesizer::new(&registry).synthesize_all(&descriptor);
    let environment = descriptor.environment("exp").unwrap();

    let files = render_environment(&descriptor, environment, &report.commands);

    let issues = validate_object_set(files.files());
    assert!(issues.is_empty(), "{:#?}", issues);
    assert_eq!(
        files.files().map(|(name, _)| name),
        OBJECT_FILES
    );

    assert_eq!(count(&files.hosts, "host"), 2);
    assert_eq!(count(&files.hosts, "hostgroup"), 1);
    // Two hosts, each with three dependency checks and the health check.
    assert_eq!(count(&files.services, "service"), 8);
    // Critical and high impact dependencies escalate.
    assert_eq!(count(&files.services, "serviceescalation"), 2);
    assert_eq!(count(&files.contacts, "contact"), 2);
    assert_eq!(count(&files.contacts, "contactgroup"), 1);
    assert_eq!(count(&files.commands, "command"), 3 + 1 + 3);

    assert!(files.hosts.contains("host_exp_web_01"));
    assert!(files.contacts.contains("contact_ana_perez"));
    assert!(files.commands.contains("$USER1$/check_tcp -H $HOSTADDRESS$ -p 5432 -t 30"));
    assert!(files.commands.contains("$USER1$/check_http -H payments.example.com -u /api/health -t 30 -S"));
}

#[test]
fn schedule_follows_impact() {
    let descriptor = sample();
    let registry = CheckRegistry::with_builtins();
    let report = CheckSynthesizer::new(&registry).synthesize_all(&descriptor);
    let environment = descriptor.environment("EXP").unwrap();
    let files = render_environment(&descriptor, environment, &report.commands);

    let (objects, _) = parse_objects("services.cfg", &files.services);
    let db = objects
        .iter()
        .find(|o| o.get("service_description") == Some("DB (TCP)"))
        .unwrap();
    assert_eq!(db.get("check_interval"), Some("1"));
    assert_eq!(db.get("max_check_attempts"), Some("3"));
    assert_eq!(db.get("_dependency_impact"), Some("critical"));

    let health = objects
        .iter()
        .find(|o| o.get("check_command") == Some("check_health_payments_api"))
        .unwrap();
    // interval_sec 30 rounds up to one minute.
    assert_eq!(health.get("check_interval"), Some("1"));
}

#[test]
fn rendering_is_deterministic() {
    let descriptor = parse_descriptor(MINIMAL_DESCRIPTOR_JSON, DocumentFormat::Json).unwrap();
    let registry = CheckRegistry::with_builtins();
    let synthesizer = CheckSynthesizer::new(&registry);
    let environment = &descriptor.environments[0];

    let first = render_environment(&descriptor, environment, &synthesizer.synthesize_all(&descriptor).commands);
    let second = render_environment(&descriptor, environment, &synthesizer.synthesize_all(&descriptor).commands);

    assert_eq!(first, second);
    assert_eq!(count(&first.services, "serviceescalation"), 0);
}

#[test]
fn repeated_command_names_are_made_unique() {
    let descriptor = parse_descriptor(MINIMAL_DESCRIPTOR_JSON, DocumentFormat::Json).unwrap();
    let registry = CheckRegistry::with_builtins();
    let mut commands = CheckSynthesizer::new(&registry).synthesize_all(&descriptor).commands;
    let mut twin = commands[0].clone();
    twin.service_description = "DB replica (TCP)".into();
    commands.push(twin);

    let files = render_environment(&descriptor, &descriptor.environments[0], &commands);

    assert!(files.commands.contains("check_tcp_db_2"));
    assert!(validate_object_set(files.files()).is_empty());
}

#[test]
fn long_directive_names_keep_their_values() {
    let descriptor = sample();
    let registry = CheckRegistry::with_builtins();
    let report = CheckSynthesizer::new(&registry).synthesize_all(&descriptor);
    let environment = descriptor.environment("exp").unwrap();
    let files = render_environment(&descriptor, environment, &report.commands);

    let (objects, issues) = parse_objects("contacts.cfg", &files.contacts);
    assert!(issues.is_empty(), "{:#?}", issues);
    let contact = objects.iter().find(|o| o.kind == "contact").unwrap();
    assert_eq!(contact.get("service_notification_commands"), Some("notify-service-by-email"));
    assert_eq!(contact.get("service_notification_options"), Some("w,u,c,r"));
    assert!(files.contacts.contains("service_notification_commands notify-service-by-email"));
}
