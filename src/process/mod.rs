//! Validated Subprocess Execution
//!
//! This module runs external programs without a shell:
//! - `command.rs`: the argument vector, timeout and target user
//! - `executor.rs`: spawning, output capture, timeout enforcement
//! - `privilege.rs`: alternate-user execution per platform
//! - `timeout.rs`: bounded waiting
//! - `outcome.rs`: the Success / TimedOut / Failed result
//! - `error.rs`: precondition and OS failures
//!
//! # Security
//!
//! Arguments are passed to the child as separate vector elements, so shell
//! metacharacters are never re-interpreted. Untrusted values should still go
//! through [`crate::sanitize`] first.

mod command;
mod error;
mod executor;
mod outcome;
mod privilege;
mod timeout;

pub use command::CommandSpec;
pub use error::ExecError;
pub use executor::{run_command, ExecutorConfig, ProcessExecutor, DEFAULT_LAST_RESORT_ENCODING};
pub use outcome::{CompletedProcess, ExecutionOutcome, TimeoutExpired};
#[cfg(unix)]
pub use privilege::PosixPrivilegeSwitcher;
pub use privilege::{host_privilege_switcher, PrivilegeSwitcher, UnsupportedPrivilegeSwitcher, UserIdentity};
pub use timeout::ExecutionTimeout;
