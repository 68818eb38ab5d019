//! Execution errors
//!
//! Timeouts and nonzero exits are not errors; they are outcomes. What remains
//! here is caller misuse and the operating system refusing to cooperate.

use std::io;

/// `EX_USAGE` from sysexits.h
const EX_USAGE: i32 = 64;
/// `EX_OSERR` from sysexits.h
const EX_OSERR: i32 = 71;

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error(
        "Running a subprocess as a different user is only supported on POSIX systems, \
         but the current platform is \"{platform}\""
    )]
    UnsupportedPlatform { platform: String },

    #[error("Unknown user '{0}'")]
    UnknownUser(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Failed to spawn process '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("System error while {context}: {source}")]
    System {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl ExecError {
    pub(crate) fn system(context: impl Into<String>, source: io::Error) -> Self {
        Self::System {
            context: context.into(),
            source,
        }
    }

    /// Whether the caller is at fault rather than the host
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedPlatform { .. } | Self::UnknownUser(_) | Self::InvalidCommand(_)
        )
    }

    /// Process exit status a CLI should report for this error
    pub fn exit_code(&self) -> i32 {
        if self.is_usage_error() {
            EX_USAGE
        } else {
            EX_OSERR
        }
    }
}
