//! Check synthesis for Monforge
//!
//! Maps each dependency of a service descriptor onto a concrete check
//! command for the check system, then renders the host, service, contact and
//! command object files for an environment.
//!
//! # Architecture
//!
//! ```text
//!   Dependency ──► CheckRegistry ──► CheckPlugin (built-in or template)
//!        │                                 │
//!        └──► discovery (optional) ──► CheckParams ──► CheckCommand
//!                                                         │
//!                                                  nagios::render
//! ```
//!
//! Parameters merge in a fixed order: protocol defaults, then discovered
//! values, then the dependency's port, then explicit `check_params`.

pub mod discovery;
pub mod engine;
pub mod error;
pub mod nagios;
pub mod params;
pub mod plugin;
pub mod protocols;
pub mod registry;
pub mod schedule;
pub mod template;

pub use discovery::{
    DiscoveryOutcome, DiscoveryWarning, HttpProber, InferredParams, ProbeResponse, Prober,
    ServiceFamily,
};
pub use engine::{CheckCommand, CheckSynthesizer, SynthesisReport, HOST_ADDRESS_MACRO};
pub use error::{Error, Result, SynthesisError};
pub use nagios::{CheckSystemFiles, SyntaxIssue, render_environment, validate_object_set};
pub use params::{CheckParams, ParamSource};
pub use plugin::{CheckPlugin, InvalidParam};
pub use registry::{BuiltinProvider, CheckRegistry, PluginProvider};
pub use schedule::CheckSchedule;
pub use template::{PluginDefinition, TemplatePlugin, TemplateProvider};
