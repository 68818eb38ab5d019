//! Validation error taxonomy
//!
//! Every variant here is a usage error: the caller handed us input (or a
//! constraint set) that does not satisfy the policy. Messages always name the
//! offending value and the violated rule.

/// Exit status for usage errors (`EX_USAGE` from sysexits.h)
pub const EX_USAGE: i32 = 64;

/// Error raised by input and path sanitization
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Wrong parametrization: {0}")]
    BadParametrization(String),

    #[error("Unknown encoding '{encoding}'")]
    UnknownEncoding { encoding: String },

    #[error("Argument \"{input}\" contains characters not representable in {encoding}: {chars:?}")]
    Encoding {
        input: String,
        encoding: String,
        chars: Vec<char>,
    },

    #[error("Argument \"{input}\" contains forbidden chars: {matched:?} (pattern: \"{pattern}\")")]
    ForbiddenCharacter {
        input: String,
        matched: Vec<String>,
        pattern: String,
    },

    #[error("Argument \"{input}\" contains disallowed chars: {matched:?} (pattern: \"{pattern}\")")]
    DisallowedCharacter {
        input: String,
        matched: Vec<String>,
        pattern: String,
    },

    #[error("{reason} => your argument in the following line is invalid:\n{path}")]
    NotFound { path: String, reason: String },

    #[error("{rule} => your argument in the following line is invalid:\n{path}")]
    WrongType { path: String, rule: String },

    #[error("{rule} => your argument in the following line is invalid:\n{path}")]
    PermissionMismatch { path: String, rule: String },
}

/// Coarse classification of a [`ValidationError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    BadParametrization,
    Encoding,
    ForbiddenCharacter,
    DisallowedCharacter,
    NotFound,
    WrongType,
    PermissionMismatch,
}

impl ValidationError {
    pub fn kind(&self) -> ValidationErrorKind {
        match self {
            Self::BadParametrization(_) => ValidationErrorKind::BadParametrization,
            Self::UnknownEncoding { .. } | Self::Encoding { .. } => ValidationErrorKind::Encoding,
            Self::ForbiddenCharacter { .. } => ValidationErrorKind::ForbiddenCharacter,
            Self::DisallowedCharacter { .. } => ValidationErrorKind::DisallowedCharacter,
            Self::NotFound { .. } => ValidationErrorKind::NotFound,
            Self::WrongType { .. } => ValidationErrorKind::WrongType,
            Self::PermissionMismatch { .. } => ValidationErrorKind::PermissionMismatch,
        }
    }

    /// Process exit status a CLI should report for this error
    pub fn exit_code(&self) -> i32 {
        EX_USAGE
    }

    pub(crate) fn not_found(path: &str, reason: impl Into<String>) -> Self {
        Self::NotFound {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn wrong_type(path: &str, rule: impl Into<String>) -> Self {
        Self::WrongType {
            path: path.to_string(),
            rule: rule.into(),
        }
    }

    pub(crate) fn permission(path: &str, rule: impl Into<String>) -> Self {
        Self::PermissionMismatch {
            path: path.to_string(),
            rule: rule.into(),
        }
    }
}
