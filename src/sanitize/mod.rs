//! Untrusted Input Sanitization
//!
//! Validates strings and filesystem paths before they are used to build a
//! command line. Validation is lexical first: injection-style payloads are
//! rejected before any filesystem access happens.
//!
//! - `input.rs`: character policies and plain string checks
//! - `path.rs`: path constraints and canonicalization
//! - `error.rs`: the usage-error taxonomy
//!
//! A validated value must still be passed to a child process as its own
//! argument-vector element, never spliced into a shell string.

mod error;
mod input;
mod path;

pub use error::{ValidationError, ValidationErrorKind, EX_USAGE};
pub use input::{sanitize_input, strip_file_extension, CharacterSet, SanitizationPolicy};
pub use path::{is_bare_drive_letter, sanitize_path, PathConstraints, PathConstraintsBuilder, ValidatedPath};
