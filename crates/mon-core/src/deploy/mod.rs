//! Deployment orchestration
//!
//! Pushes an [`ArtifactSet`](crate::ArtifactSet) onto every host of its
//! environment with backup, post-deployment validation and per-host
//! rollback, then registers log-pipeline assets and announces the outcome.

pub mod admin;
pub mod cancel;
pub mod notify;
pub mod orchestrator;
pub mod report;

pub use admin::{AdminClient, HttpAdminClient};
pub use cancel::CancelToken;
pub use notify::{MailNotifier, Notification, Notifier, NotifierSet, WebhookNotifier};
pub use orchestrator::{DeploymentPlan, Deployer, PlannedFile};
pub use report::{
    AdminOutcome, DeploymentReport, DeploymentStatus, FailureKind, HostError, HostOutcome, HostStatus, Stage,
};
