//! Command implementations

mod backups;
mod deploy;
mod generate;
mod protocols;
mod sessions;
mod stage;

pub use backups::{run_backups_list, run_backups_prune};
pub use deploy::{run_deploy, run_deploy_artifacts};
pub use generate::run_generate;
pub use protocols::run_protocols;
pub use sessions::run_sessions;
pub use stage::{run_stage, run_validate_import};
