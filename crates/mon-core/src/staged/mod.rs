//! Staged import for check-system front ends without an API
//!
//! "Prepare locally, instruct a human, verify afterward": staging and
//! validation are separate invocations joined by the persisted session.

pub mod adapter;
pub mod session;

pub use adapter::StagedImportAdapter;
pub use session::{DeploymentSession, FileStatus, SessionLog, SessionStatus, StagedFile};
