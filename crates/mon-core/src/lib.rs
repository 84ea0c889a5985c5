//! Artifact sets, deployment orchestration and staged import for Monforge
//!
//! This crate sits between the synthesis engines and the CLI:
//!
//! - **Generation**: run both engines over a descriptor and assemble one
//!   [`ArtifactSet`] per environment, with an on-disk manifest
//! - **Deployment**: back up, transfer, validate and roll back per host,
//!   register log-pipeline assets and notify
//! - **Staged import**: stage check-system files for a manual import and
//!   verify it later through a persisted session
//!
//! # Architecture
//!
//! ```text
//!                       CLI
//!                        |
//!                    mon-core
//!      generate ── artifacts ── deploy ── staged
//!                        |         \      /
//!                        |        transport
//!     +-----------+------+------+
//!     |           |             |
//! mon-checks   mon-logs     mon-model ── mon-fs
//! ```
//!
//! Configuration is an immutable [`InfraConfig`] passed down explicitly.

pub mod artifacts;
pub mod backup;
pub mod config;
pub mod deploy;
pub mod error;
pub mod generate;
pub mod staged;
pub mod transport;

pub use artifacts::{Artifact, ArtifactGroup, ArtifactSet, GroupSelection, Manifest};
pub use backup::{BackupEntry, BackupLog, BackupRecord};
pub use config::{ConfigOverrides, InfraConfig, Secret, TransportKind};
pub use deploy::{
    CancelToken, Deployer, DeploymentReport, DeploymentStatus, FailureKind, HostError, HostStatus,
};
pub use error::{Error, Result};
pub use generate::{Generator, Synthesis, check_syntax};
pub use staged::{DeploymentSession, FileStatus, SessionLog, SessionStatus, StagedImportAdapter};
pub use transport::{CommandOutput, LocalTransport, RemoteTransport, SshTransport, TransportError};
