//! Command specification

use super::error::ExecError;
use std::time::Duration;

/// A program invocation as an argument vector
///
/// Arguments are never joined into a shell string, so shell metacharacters in
/// any element reach the child verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    args: Vec<String>,
    timeout: Option<Duration>,
    run_as_user: Option<String>,
    suppress_missing_timeout_warning: bool,
}

impl CommandSpec {
    /// Create a command from its argument vector (program first)
    ///
    /// ```
    /// use std::time::Duration;
    /// use execguard::process::CommandSpec;
    ///
    /// let spec = CommandSpec::new(["echo", "hello"]).with_timeout(Duration::from_secs(5));
    /// assert_eq!(spec.program(), Some("echo"));
    /// ```
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            timeout: None,
            run_as_user: None,
            suppress_missing_timeout_warning: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_optional_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the child as another OS user (POSIX only)
    pub fn run_as(mut self, username: impl Into<String>) -> Self {
        self.run_as_user = Some(username.into());
        self
    }

    /// Silence the warning emitted when no timeout is set
    pub fn suppress_missing_timeout_warning(mut self) -> Self {
        self.suppress_missing_timeout_warning = true;
        self
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn program(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn run_as_user(&self) -> Option<&str> {
        self.run_as_user.as_deref()
    }

    pub fn warns_on_missing_timeout(&self) -> bool {
        !self.suppress_missing_timeout_warning
    }

    /// Reject specs that cannot be executed at all
    pub(crate) fn validate(&self) -> Result<(), ExecError> {
        match self.program() {
            None => return Err(ExecError::InvalidCommand("empty argument vector".to_string())),
            Some("") => return Err(ExecError::InvalidCommand("empty program name".to_string())),
            Some(_) => {}
        }
        if self.timeout == Some(Duration::ZERO) {
            return Err(ExecError::InvalidCommand("timeout must be greater than zero".to_string()));
        }
        if self.run_as_user.as_deref().is_some_and(str::is_empty) {
            return Err(ExecError::InvalidCommand("empty user name".to_string()));
        }
        Ok(())
    }

    /// Arguments equal to "-" once trimmed (conventionally "read stdin")
    pub(crate) fn stdin_markers(&self) -> impl Iterator<Item = &String> {
        self.args.iter().filter(|a| a.trim() == "-")
    }
}
