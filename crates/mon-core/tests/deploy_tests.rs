//! Deployment against local-directory hosts

use mon_checks::CheckRegistry;
use mon_core::deploy::{AdminClient, Notification, Notifier, NotifierSet};
use mon_core::{
    ArtifactSet, BackupLog, CancelToken, Deployer, DeploymentStatus, FailureKind, Generator, GroupSelection,
    HostStatus, InfraConfig, LocalTransport,
};
use mon_fs::{DocumentFormat, NormalizedPath};
use mon_logs::LogCompiler;
use mon_model::parse_descriptor;
use mon_test_utils::descriptor::SAMPLE_DESCRIPTOR_JSON;
use mon_test_utils::workspace::{CHECK_CONFIG_DIR, LocalConfig, TestWorkspace};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct Fixture {
    ws: TestWorkspace,
    config: InfraConfig,
    set: ArtifactSet,
}

impl Fixture {
    fn new(local: LocalConfig) -> Self {
        let ws = TestWorkspace::new();
        let path = ws.write_config(&local);
        let config = InfraConfig::load(&NormalizedPath::new(path)).unwrap();
        let descriptor = parse_descriptor(SAMPLE_DESCRIPTOR_JSON, DocumentFormat::Json).unwrap();
        let generator = Generator::new(CheckRegistry::with_builtins(), LogCompiler::default());
        let set = generator
            .generate(&descriptor, &["EXP".to_string()], GroupSelection::all())
            .unwrap()
            .remove(0);
        Self { ws, config, set }
    }

    fn deployer(&self) -> Deployer<'_> {
        let transport = LocalTransport::new(self.ws.root().join("hosts"), Duration::from_secs(10));
        Deployer::new(&self.config, Arc::new(transport))
    }

    fn backups(&self) -> BackupLog {
        BackupLog::new(self.config.backups_log())
    }

    fn content(&self, name: &str) -> Option<String> {
        self.set.get(name).map(|a| a.content.clone())
    }
}

#[derive(Clone, Default)]
struct RecordingAdmin {
    calls: Arc<Mutex<Vec<String>>>,
}

impl AdminClient for RecordingAdmin {
    fn put_json(&self, path: &str, body: &str) -> Result<u16, String> {
        serde_json::from_str::<serde_json::Value>(body).map_err(|e| e.to_string())?;
        self.calls.lock().unwrap().push(path.to_string());
        Ok(200)
    }
}

#[derive(Clone, Default)]
struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
    fail: bool,
}

impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    fn send(&self, notification: &Notification) -> Result<(), String> {
        self.sent.lock().unwrap().push(notification.clone());
        if self.fail { Err("smtp down".into()) } else { Ok(()) }
    }
}

mod success {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn every_host_receives_every_host_file() {
        let fx = Fixture::new(LocalConfig::default());
        let report = fx.deployer().deploy(&fx.set).unwrap();

        assert_eq!(report.status, DeploymentStatus::Succeeded);
        for host in ["web-01", "web-02"] {
            assert_eq!(
                fx.ws.read_host_file(host, "/etc/nagios/objects/hosts.cfg"),
                fx.content("hosts.cfg")
            );
            assert_eq!(fx.ws.read_host_file(host, "/etc/filebeat/filebeat.yml"), fx.content("filebeat.yml"));
            assert_eq!(
                fx.ws.read_host_file(host, "/etc/logstash/conf.d/logstash.conf"),
                fx.content("logstash.conf")
            );
            assert_eq!(fx.ws.read_host_file(host, "/etc/nagios/objects/alerts.json"), None);
        }
        assert!(report.hosts.iter().all(|h| h.files.len() == 6 && h.backup_id.is_some()));
        assert_eq!(fx.backups().records().unwrap().len(), 2);
    }

    #[test]
    fn admin_assets_are_registered_once() {
        let fx = Fixture::new(LocalConfig::default());
        let admin = RecordingAdmin::default();
        let report = fx.deployer().with_admin(Box::new(admin.clone())).deploy(&fx.set).unwrap();

        assert_eq!(report.status, DeploymentStatus::Succeeded);
        assert_eq!(
            *admin.calls.lock().unwrap(),
            vec![
                "/_ingest/pipeline/payments-api-logs".to_string(),
                "/_index_template/payments-api-logs".to_string(),
            ]
        );
        assert!(report.admin.iter().all(|a| a.succeeded()));
    }

    #[test]
    fn checks_only_leaves_log_directories_alone() {
        let fx = Fixture::new(LocalConfig::default());
        let set = fx.set.select(GroupSelection::checks_only());
        let report = fx.deployer().deploy(&set).unwrap();

        assert_eq!(report.status, DeploymentStatus::Succeeded);
        assert_eq!(fx.ws.read_host_file("web-01", "/etc/filebeat/filebeat.yml"), None);
        assert_eq!(report.hosts[0].files.len(), 4);
    }

    #[test]
    fn notification_failure_does_not_fail_the_deployment() {
        let fx = Fixture::new(LocalConfig::default());
        let notifier = RecordingNotifier {
            fail: true,
            ..Default::default()
        };
        let report = fx
            .deployer()
            .with_notifiers(NotifierSet::new().with(Box::new(notifier.clone())))
            .deploy(&fx.set)
            .unwrap();

        assert_eq!(report.status, DeploymentStatus::Succeeded);
        assert_eq!(report.notification_errors, vec!["recording: smtp down".to_string()]);
        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].subject.contains("succeeded"));
        assert!(sent[0].body.contains("web-02"));
    }
}

mod failure {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn validation_failure_rolls_back_only_that_host() {
        let fx = Fixture::new(LocalConfig::default());
        fx.ws
            .write_host_file("web-01", "/etc/nagios/objects/hosts.cfg", "# hand-written hosts\n");
        fx.ws.fail_validation_on("web-01");
        let before = fx.ws.snapshot_dir("web-01", CHECK_CONFIG_DIR);

        let report = fx.deployer().deploy(&fx.set).unwrap();

        assert_eq!(report.status, DeploymentStatus::PartiallyFailed);
        let failed: Vec<&str> = report.failed_hosts().iter().map(|h| h.host.as_str()).collect();
        assert_eq!(failed, vec!["web-01"]);

        let web01 = &report.hosts[0];
        assert!(web01.rolled_back);
        assert_eq!(web01.error.as_ref().unwrap().kind(), FailureKind::Validation);
        assert!(report.has_validation_failure());
        assert_eq!(fx.ws.snapshot_dir("web-01", CHECK_CONFIG_DIR), before);
        assert_eq!(fx.ws.read_host_file("web-01", "/etc/filebeat/filebeat.yml"), None);

        assert_eq!(report.hosts[1].status, HostStatus::Succeeded);
        assert_eq!(
            fx.ws.read_host_file("web-02", "/etc/nagios/objects/hosts.cfg"),
            fx.content("hosts.cfg")
        );
    }

    #[test]
    fn stop_on_first_failure_skips_remaining_hosts() {
        let fx = Fixture::new(LocalConfig {
            concurrency: 1,
            stop_on_first_failure: true,
            ..Default::default()
        });
        fx.ws.fail_validation_on("web-01");

        let report = fx.deployer().deploy(&fx.set).unwrap();

        assert_eq!(report.status, DeploymentStatus::Failed);
        assert_eq!(report.hosts[0].status, HostStatus::Failed);
        assert_eq!(report.hosts[1].status, HostStatus::Skipped);
        assert_eq!(fx.ws.read_host_file("web-02", "/etc/nagios/objects/hosts.cfg"), None);
    }

    #[test]
    fn unreadable_target_is_a_transport_failure() {
        let fx = Fixture::new(LocalConfig::default());
        std::fs::create_dir_all(fx.ws.host_path("web-02", "/etc/nagios/objects/hosts.cfg")).unwrap();

        let report = fx.deployer().deploy(&fx.set).unwrap();

        assert_eq!(report.status, DeploymentStatus::PartiallyFailed);
        let web02 = &report.hosts[1];
        assert_eq!(web02.status, HostStatus::Failed);
        assert_eq!(web02.error.as_ref().unwrap().kind(), FailureKind::Transport);
        assert!(web02.files.is_empty());
    }

    #[test]
    fn without_backups_a_failed_host_keeps_new_files() {
        let fx = Fixture::new(LocalConfig {
            backups: false,
            ..Default::default()
        });
        fx.ws.fail_validation_on("web-01");

        let report = fx.deployer().deploy(&fx.set).unwrap();

        let web01 = &report.hosts[0];
        assert_eq!(web01.status, HostStatus::Failed);
        assert!(!web01.rolled_back);
        assert!(fx.ws.read_host_file("web-01", "/etc/nagios/objects/hosts.cfg").is_some());
        assert!(fx.backups().records().unwrap().is_empty());
    }

    #[test]
    fn environment_without_hosts_fails_init() {
        let fx = Fixture::new(LocalConfig::default());
        let mut set = fx.set.clone();
        set.hosts.clear();
        assert!(matches!(
            fx.deployer().deploy(&set).unwrap_err(),
            mon_core::Error::NoHosts { .. }
        ));
    }
}

mod dry_run {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn dry_run_touches_nothing() {
        let mut fx = Fixture::new(LocalConfig::default());
        fx.config.general.dry_run = true;
        let notifier = RecordingNotifier::default();

        let report = fx
            .deployer()
            .with_notifiers(NotifierSet::new().with(Box::new(notifier.clone())))
            .with_admin(Box::new(RecordingAdmin::default()))
            .deploy(&fx.set)
            .unwrap();

        assert_eq!(report.status, DeploymentStatus::DryRun);
        assert!(!fx.ws.host_root("web-01").exists());
        assert!(!fx.ws.host_root("web-02").exists());
        assert!(!fx.config.backups_log().exists());
        assert!(notifier.sent.lock().unwrap().is_empty());

        let planned = &report.hosts[0].planned;
        assert!(planned.iter().any(|a| a.starts_with("back up /etc/nagios/objects/hosts.cfg")));
        assert!(planned.iter().any(|a| a.starts_with("write /etc/filebeat/filebeat.yml")));
        assert!(planned.contains(&"run 'test ! -e fail-validation'".to_string()));
        assert_eq!(report.admin.len(), 2);
        assert!(report.admin.iter().all(|a| a.status.is_none()));
    }
}

mod cancellation {
    use super::*;
    use mon_core::deploy::{HostError, Stage};
    use mon_core::{CommandOutput, RemoteTransport, TransportError};
    use mon_model::Host;
    use pretty_assertions::assert_eq;

    /// When the wrapped transport trips the token.
    enum Trip {
        /// On the first write below this remote prefix.
        WriteUnder(&'static str),
        /// On the first command run on this host.
        RunOn(&'static str),
    }

    /// Local transport that cancels the deployment part way through, the
    /// way a Ctrl-C would.
    struct TrippingTransport {
        inner: LocalTransport,
        token: CancelToken,
        trip: Trip,
    }

    impl RemoteTransport for TrippingTransport {
        fn name(&self) -> &'static str {
            "tripping"
        }

        fn read_file(&self, host: &Host, path: &str) -> Result<Option<Vec<u8>>, TransportError> {
            self.inner.read_file(host, path)
        }

        fn write_file(&self, host: &Host, path: &str, content: &[u8]) -> Result<(), TransportError> {
            self.inner.write_file(host, path, content)?;
            if let Trip::WriteUnder(prefix) = self.trip {
                if path.starts_with(prefix) {
                    self.token.cancel();
                }
            }
            Ok(())
        }

        fn remove_file(&self, host: &Host, path: &str) -> Result<(), TransportError> {
            self.inner.remove_file(host, path)
        }

        fn run(&self, host: &Host, command: &str) -> Result<CommandOutput, TransportError> {
            let output = self.inner.run(host, command)?;
            if let Trip::RunOn(target) = self.trip {
                if host.identifier == target {
                    self.token.cancel();
                }
            }
            Ok(output)
        }
    }

    fn tripping_deployer(fx: &Fixture, trip: Trip) -> Deployer<'_> {
        let token = CancelToken::new();
        let transport = TrippingTransport {
            inner: LocalTransport::new(fx.ws.root().join("hosts"), Duration::from_secs(10)),
            token: token.clone(),
            trip,
        };
        Deployer::new(&fx.config, Arc::new(transport)).with_cancel(token)
    }

    fn sequential() -> Fixture {
        Fixture::new(LocalConfig {
            concurrency: 1,
            ..Default::default()
        })
    }

    #[test]
    fn cancelled_before_start_writes_nothing() {
        let fx = Fixture::new(LocalConfig::default());
        let token = CancelToken::new();
        token.cancel();

        let report = fx.deployer().with_cancel(token).deploy(&fx.set).unwrap();

        assert_eq!(report.status, DeploymentStatus::Cancelled);
        assert!(report.hosts.iter().all(|h| h.status == HostStatus::Cancelled));
        assert!(fx.ws.read_host_file("web-01", "/etc/nagios/objects/hosts.cfg").is_none());
        assert!(report.admin.is_empty());
    }

    #[test]
    fn cancel_during_transfer_finishes_the_copy_then_rolls_back() {
        let fx = sequential();
        fx.ws
            .write_host_file("web-01", "/etc/nagios/objects/hosts.cfg", "# hand-written hosts\n");
        let before = fx.ws.snapshot_dir("web-01", CHECK_CONFIG_DIR);

        let report = tripping_deployer(&fx, Trip::WriteUnder("/etc/")).deploy(&fx.set).unwrap();

        assert_eq!(report.status, DeploymentStatus::Cancelled);
        let web01 = &report.hosts[0];
        assert_eq!(web01.status, HostStatus::Cancelled);
        assert_eq!(web01.error.as_ref().unwrap().kind(), FailureKind::Cancelled);
        assert!(matches!(
            web01.error,
            Some(HostError::Cancelled {
                stage: Stage::PostValidate,
                ..
            })
        ));
        // Every file was copied before the cancellation took effect.
        assert_eq!(web01.files.len(), 6);
        assert!(web01.rolled_back);
        assert_eq!(fx.ws.snapshot_dir("web-01", CHECK_CONFIG_DIR), before);
        assert_eq!(fx.ws.read_host_file("web-01", "/etc/filebeat/filebeat.yml"), None);

        assert_eq!(report.hosts[1].status, HostStatus::Cancelled);
        assert!(fx.ws.read_host_file("web-02", "/etc/nagios/objects/hosts.cfg").is_none());
    }

    #[test]
    fn cancel_during_backup_leaves_the_host_untouched() {
        let fx = sequential();
        fx.ws
            .write_host_file("web-01", "/etc/nagios/objects/hosts.cfg", "# hand-written hosts\n");

        let report = tripping_deployer(&fx, Trip::WriteUnder("/var/backups/"))
            .deploy(&fx.set)
            .unwrap();

        assert_eq!(report.status, DeploymentStatus::Cancelled);
        let web01 = &report.hosts[0];
        assert_eq!(web01.status, HostStatus::Cancelled);
        assert!(web01.backup_id.is_some());
        assert!(web01.files.is_empty());
        assert!(!web01.rolled_back);
        assert_eq!(
            fx.ws.read_host_file("web-01", "/etc/nagios/objects/hosts.cfg").as_deref(),
            Some("# hand-written hosts\n")
        );
        assert_eq!(fx.backups().records().unwrap().len(), 1);
    }

    #[test]
    fn cancel_after_the_last_host_skips_only_registration() {
        let fx = sequential();
        let admin = RecordingAdmin::default();

        let report = tripping_deployer(&fx, Trip::RunOn("web-02"))
            .with_admin(Box::new(admin.clone()))
            .deploy(&fx.set)
            .unwrap();

        assert!(report.hosts.iter().all(|h| h.status == HostStatus::Succeeded));
        assert_eq!(
            fx.ws.read_host_file("web-02", "/etc/nagios/objects/hosts.cfg"),
            fx.content("hosts.cfg")
        );
        assert!(admin.calls.lock().unwrap().is_empty());
        assert_eq!(report.admin.len(), 2);
        assert!(report.admin.iter().all(|a| a.cancelled));
        assert_eq!(report.status, DeploymentStatus::Cancelled);
    }

    #[test]
    fn cancel_after_every_host_finished_is_not_a_cancellation() {
        let fx = sequential();

        let report = tripping_deployer(&fx, Trip::RunOn("web-02")).deploy(&fx.set).unwrap();

        assert!(report.admin.is_empty());
        assert_eq!(report.status, DeploymentStatus::Succeeded);
    }
}
