//! Service descriptor model for Monforge
//!
//! The descriptor is the validated, immutable input to both synthesis engines:
//! identity and priority of the service, the dependencies to be checked, the
//! log sources to be shipped and the environments to deploy into.
//!
//! Documents are accepted as JSON or YAML. Keys and enumerated values of the
//! capture form are accepted as aliases of the English names, so a document
//! exported by the form loads unchanged.

pub mod dependency;
pub mod descriptor;
pub mod environment;
pub mod error;
pub mod load;
pub mod log_source;
pub mod naming;
mod validate;

pub use dependency::{Dependency, Impact, Nature, ParamValue, PortValue};
pub use descriptor::{HealthApiDetails, Identification, Priority, Responsible, ServiceDescriptor, TechStackEntry};
pub use environment::{Environment, Host, HostKind};
pub use error::{Error, Result};
pub use load::{load_descriptor, parse_descriptor};
pub use log_source::{LogFormat, LogSource, RetentionMethod, RetentionPolicy};
pub use naming::slugify;
