//! Shared test fixtures for the Monforge workspace.
//!
//! Dev-dependency only. Fixtures are plain text so that every crate, including
//! the model crate itself, can use them without a dependency cycle.
//!
//! # Modules
//!
//! - [`descriptor`]: sample service descriptors
//! - [`workspace`]: [`TestWorkspace`](workspace::TestWorkspace) with local host directories

pub mod descriptor;
pub mod workspace;
