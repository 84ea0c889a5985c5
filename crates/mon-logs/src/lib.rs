//! Log pipeline synthesis for Monforge
//!
//! Compiles each log source's patterns into a [`ParsingGrammar`] and renders
//! the collector, processor, ingest, index, dashboard and alert artifacts for
//! an environment.
//!
//! Patterns are free text with uppercase placeholder tokens:
//!
//! ```text
//! [TIMESTAMP] LEVEL [MODULE:LINE] FUNCTION - MESSAGE
//! ```
//!
//! Known tokens map to grammar fragments (see [`fragments::FRAGMENTS`]).
//! Unknown tokens are matched literally with a warning unless the source, or
//! the compiler default, is strict; then compilation fails with a
//! [`PatternCompilationError`].

pub mod compile;
pub mod error;
pub mod fragments;
pub mod grammar;
pub mod render;
pub mod retention;
pub mod tokens;

pub use compile::{CompileReport, LogCompiler};
pub use error::{Error, PatternCompilationError, Result};
pub use fragments::{FieldType, Fragment};
pub use grammar::{CompileWarning, GrammarExpression, GrammarKind, ParsingGrammar};
pub use render::{LogPipelineFiles, PIPELINE_FILES, render_environment};
pub use retention::RetentionDirective;
pub use tokens::{Segment, tokenize};
