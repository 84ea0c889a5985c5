//! Check-system object files
//!
//! [`render`] turns synthesized checks into `hosts.cfg`, `services.cfg`,
//! `contacts.cfg` and `commands.cfg` for one environment; [`syntax`] parses
//! such files back and reports structural problems before anything is
//! shipped.

pub mod render;
pub mod syntax;

pub use render::{CheckSystemFiles, render_environment};
pub use syntax::{ObjectDefinition, SyntaxIssue, parse_objects, validate_object_set};

/// File names of the rendered object set, in load order.
pub const OBJECT_FILES: [&str; 4] = ["commands.cfg", "contacts.cfg", "hosts.cfg", "services.cfg"];
