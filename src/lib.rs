//! execguard
//!
//! Guarded command execution: sanitize untrusted strings and paths, then run
//! fixed argument vectors as child processes with timeouts, optional
//! privilege de-escalation and encoding-aware output capture.
//!
//! - [`sanitize`]: character policies and path validation
//! - [`encoding`]: encoding lookup and pipe-encoding resolution
//! - [`process`]: the process executor
//! - [`config`] and [`logging`]: ambient setup for the CLI

pub mod config;
pub mod encoding;
pub mod logging;
pub mod process;
pub mod sanitize;

pub use encoding::{resolve_pipe_encoding, TextEncoding};
pub use process::{run_command, CommandSpec, ExecError, ExecutionOutcome, ProcessExecutor};
pub use sanitize::{sanitize_input, sanitize_path, PathConstraints, ValidatedPath, ValidationError};
