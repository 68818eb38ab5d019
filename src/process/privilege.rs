//! Privilege De-escalation
//!
//! Running a child as another OS user is a platform capability. The executor
//! only talks to [`PrivilegeSwitcher`]; each platform provides one
//! implementation and hosts without POSIX user switching get
//! [`UnsupportedPrivilegeSwitcher`].
//!
//! On POSIX the drop happens in the forked child, after the standard streams
//! are wired to our pipes and before exec: supplementary groups are cleared
//! (when the parent is root), then the GID is set, then the UID. No code of
//! ours or the caller's runs between the drop and exec.

use super::error::ExecError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;

/// The account a child process will run as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub username: String,
    pub uid: u32,
    pub gid: u32,
    pub home: PathBuf,
}

impl UserIdentity {
    /// Environment entries rewritten for the child
    ///
    /// `HOME`, `LOGNAME` and `USER` describe the target user; `PWD` is the
    /// working directory the child starts in.
    pub fn environment(&self, working_dir: &Path) -> Vec<(String, String)> {
        vec![
            ("HOME".to_string(), self.home.to_string_lossy().into_owned()),
            ("LOGNAME".to_string(), self.username.clone()),
            ("PWD".to_string(), working_dir.to_string_lossy().into_owned()),
            ("USER".to_string(), self.username.clone()),
        ]
    }
}

/// Platform capability for running a child as another user
pub trait PrivilegeSwitcher: Send + Sync + std::fmt::Debug {
    /// Returns the name of the implementation (e.g., "posix")
    fn name(&self) -> &str;

    /// Look up the target user in the OS user database
    fn lookup(&self, username: &str) -> Result<UserIdentity, ExecError>;

    /// Configure `command` so the child runs as `identity`
    fn apply(&self, identity: &UserIdentity, working_dir: &Path, command: &mut Command) -> Result<(), ExecError>;
}

/// setgid/setuid based switching for POSIX hosts
#[cfg(unix)]
#[derive(Debug, Clone, Copy, Default)]
pub struct PosixPrivilegeSwitcher;

#[cfg(unix)]
impl PrivilegeSwitcher for PosixPrivilegeSwitcher {
    fn name(&self) -> &str {
        "posix"
    }

    fn lookup(&self, username: &str) -> Result<UserIdentity, ExecError> {
        let user = nix::unistd::User::from_name(username)
            .map_err(|errno| ExecError::system(format!("looking up user '{}'", username), errno.into()))?
            .ok_or_else(|| ExecError::UnknownUser(username.to_string()))?;

        Ok(UserIdentity {
            username: user.name,
            uid: user.uid.as_raw(),
            gid: user.gid.as_raw(),
            home: user.dir,
        })
    }

    fn apply(&self, identity: &UserIdentity, working_dir: &Path, command: &mut Command) -> Result<(), ExecError> {
        // Inherited environment plus the rewritten entries.
        command.envs(identity.environment(working_dir));
        // Applied in the child as setgid() then setuid().
        command.gid(identity.gid);
        command.uid(identity.uid);
        Ok(())
    }
}

/// Switcher for hosts without POSIX user switching
#[derive(Debug, Clone, Default)]
pub struct UnsupportedPrivilegeSwitcher {
    platform: String,
}

impl UnsupportedPrivilegeSwitcher {
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
        }
    }

    fn error(&self) -> ExecError {
        ExecError::UnsupportedPlatform {
            platform: self.platform.clone(),
        }
    }
}

impl PrivilegeSwitcher for UnsupportedPrivilegeSwitcher {
    fn name(&self) -> &str {
        "unsupported"
    }

    fn lookup(&self, _username: &str) -> Result<UserIdentity, ExecError> {
        Err(self.error())
    }

    fn apply(&self, _identity: &UserIdentity, _working_dir: &Path, _command: &mut Command) -> Result<(), ExecError> {
        Err(self.error())
    }
}

/// The switcher for the host platform
#[cfg(unix)]
pub fn host_privilege_switcher() -> Arc<dyn PrivilegeSwitcher> {
    Arc::new(PosixPrivilegeSwitcher)
}

/// The switcher for the host platform
#[cfg(not(unix))]
pub fn host_privilege_switcher() -> Arc<dyn PrivilegeSwitcher> {
    Arc::new(UnsupportedPrivilegeSwitcher::new(std::env::consts::OS))
}
