//! Filesystem primitives for Monforge
//!
//! Atomic file writes, lock-guarded append-only JSON-lines logs, the canonical
//! `sha256:<hex>` checksum format and a format-aware document store used for
//! both service descriptors and infrastructure configuration.

pub mod checksum;
pub mod config;
pub mod error;
pub mod io;
pub mod jsonl;
pub mod path;

pub use checksum::{compute_content_checksum, compute_file_checksum};
pub use config::{ConfigStore, DocumentFormat};
pub use error::{Error, Result};
pub use jsonl::JsonLines;
pub use path::NormalizedPath;
