//! Workflow tests across the whole stack
//!
//! Each test starts from a descriptor and a configuration file on disk, the
//! way an operator would, and follows the artifacts to the hosts.

use mon_core::{
    ArtifactSet, Deployer, DeploymentStatus, FileStatus, Generator, GroupSelection, InfraConfig, LocalTransport,
    SessionStatus, StagedImportAdapter,
};
use mon_fs::NormalizedPath;
use mon_model::load_descriptor;
use mon_test_utils::descriptor::SAMPLE_DESCRIPTOR_JSON;
use mon_test_utils::workspace::{CHECK_CONFIG_DIR, LocalConfig, TestWorkspace};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Test Infrastructure
// =============================================================================

struct Operator {
    ws: TestWorkspace,
    config: InfraConfig,
    descriptor_path: NormalizedPath,
}

impl Operator {
    fn new(local: LocalConfig) -> Self {
        let ws = TestWorkspace::new();
        let config_path = ws.write_config(&local);
        let descriptor_path = NormalizedPath::new(ws.write_descriptor(SAMPLE_DESCRIPTOR_JSON));
        let config = InfraConfig::load(&NormalizedPath::new(config_path)).unwrap();
        Self {
            ws,
            config,
            descriptor_path,
        }
    }

    /// Generate every environment into the output directory.
    fn generate(&self, selection: GroupSelection) -> Vec<ArtifactSet> {
        let descriptor = load_descriptor(&self.descriptor_path).unwrap();
        let generator = Generator::from_config(&self.config).unwrap();
        let sets = generator.generate(&descriptor, &[], selection).unwrap();
        let out = NormalizedPath::new(self.ws.out_dir());
        for set in &sets {
            set.write(&out).unwrap();
        }
        sets
    }

    fn load_generated(&self, environment: &str) -> ArtifactSet {
        ArtifactSet::load(&NormalizedPath::new(self.ws.out_dir().join(environment))).unwrap()
    }

    fn transport(&self) -> Arc<LocalTransport> {
        Arc::new(LocalTransport::new(self.ws.root().join("hosts"), Duration::from_secs(10)))
    }
}

// =============================================================================
// Generation
// =============================================================================

#[test]
fn generated_objects_carry_the_synthesized_commands() {
    let op = Operator::new(LocalConfig::default());
    op.generate(GroupSelection::all());

    let commands =
        std::fs::read_to_string(op.ws.out_dir().join("EXP").join("checks").join("commands.cfg")).unwrap();
    assert!(commands.contains("check_tcp -H $HOSTADDRESS$ -p 5432 -t 30"), "{}", commands);
    assert!(commands.contains("-u /api/v1/health -e 200"), "{}", commands);
    assert!(commands.contains(" -S"), "{}", commands);

    let logstash =
        std::fs::read_to_string(op.ws.out_dir().join("EXP").join("logs").join("logstash.conf")).unwrap();
    assert!(logstash.contains("grok"));
}

#[test]
fn generation_is_reproducible() {
    let op = Operator::new(LocalConfig::default());
    let first = op.generate(GroupSelection::all());
    let second = op.generate(GroupSelection::all());

    for (a, b) in first.iter().zip(&second) {
        let left: Vec<_> = a.artifacts.iter().map(|x| (&x.name, &x.checksum)).collect();
        let right: Vec<_> = b.artifacts.iter().map(|x| (&x.name, &x.checksum)).collect();
        assert_eq!(left, right);
    }
}

#[test]
fn reloaded_artifacts_match_generated_ones() {
    let op = Operator::new(LocalConfig::default());
    let sets = op.generate(GroupSelection::all());
    let reloaded = op.load_generated("DEV");

    let dev = sets.iter().find(|s| s.environment == "DEV").unwrap();
    assert_eq!(reloaded.hosts, dev.hosts);
    assert_eq!(reloaded.asset_name, dev.asset_name);
    assert_eq!(reloaded.artifacts.len(), dev.artifacts.len());
    for artifact in &dev.artifacts {
        assert_eq!(reloaded.get(&artifact.name).map(|a| &a.checksum), Some(&artifact.checksum));
    }
}

// =============================================================================
// Deployment
// =============================================================================

#[test]
fn failed_host_is_restored_from_generated_artifacts() {
    let op = Operator::new(LocalConfig::default());
    op.generate(GroupSelection::all());
    let set = op.load_generated("EXP");

    op.ws.write_host_file("web-01", "/etc/nagios/objects/legacy.cfg", "# kept\n");
    op.ws.write_host_file("web-01", "/etc/nagios/objects/hosts.cfg", "# previous hosts\n");
    op.ws.fail_validation_on("web-01");
    let before = op.ws.snapshot_dir("web-01", CHECK_CONFIG_DIR);

    let report = Deployer::new(&op.config, op.transport()).deploy(&set).unwrap();

    assert_eq!(report.status, DeploymentStatus::PartiallyFailed);
    assert!(report.summary().contains("web-01"));
    assert_eq!(op.ws.snapshot_dir("web-01", CHECK_CONFIG_DIR), before);

    let after = op.ws.snapshot_dir("web-02", CHECK_CONFIG_DIR);
    let names: Vec<&str> = after.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["commands.cfg", "contacts.cfg", "hosts.cfg", "services.cfg"]);
}

#[test]
fn second_deployment_backs_up_the_first() {
    let op = Operator::new(LocalConfig::default());
    let sets = op.generate(GroupSelection::checks_only());
    let dev = sets.iter().find(|s| s.environment == "DEV").unwrap();
    let deployer = Deployer::new(&op.config, op.transport());

    deployer.deploy(dev).unwrap();
    let report = deployer.deploy(dev).unwrap();

    assert_eq!(report.status, DeploymentStatus::Succeeded);
    let log = mon_core::BackupLog::new(op.config.backups_log());
    let records = log.records().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].tombstones(), records[0].entries.len());
    assert_eq!(records[1].tombstones(), 0);

    let latest = log.latest("dev", "payments-dev").unwrap().unwrap();
    assert_eq!(latest.id, records[1].id);
    assert_eq!(log.prune(1).unwrap().len(), 1);
    assert_eq!(log.records().unwrap().len(), 1);
}

// =============================================================================
// Staged import
// =============================================================================

#[test]
fn staging_survives_a_restart() {
    let op = Operator::new(LocalConfig::default());
    op.generate(GroupSelection::checks_only());
    let set = op.load_generated("EXP");

    let first = {
        let adapter = StagedImportAdapter::new(&op.config, op.transport()).unwrap();
        adapter.stage(&set).unwrap()
    };
    assert_eq!(first.status, SessionStatus::AwaitingManualStep);

    let adapter = StagedImportAdapter::new(&op.config, op.transport()).unwrap();
    let second = adapter.stage(&set).unwrap();
    assert_eq!(second.count(FileStatus::Unchanged), second.files.len());

    let validated = adapter.validate_import(&first.id[..8]).unwrap();
    assert_eq!(validated.status, SessionStatus::Validated);

    let sessions = adapter.sessions().sessions().unwrap();
    let ids: Vec<&str> = sessions.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec![first.id.as_str(), second.id.as_str()]);
    assert_eq!(sessions[0].status, SessionStatus::Validated);
}
