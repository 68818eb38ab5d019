//! Process Executor
//!
//! Runs one argument vector as one child process and reports exactly one
//! [`ExecutionOutcome`]. No shell is involved.
//!
//! The child gets an empty stdin pipe that stays open until it is reaped, and
//! both output streams are drained concurrently so a chatty child cannot
//! deadlock on a full pipe. On POSIX the child leads its own process group;
//! when the timeout expires the whole group is killed and the child reaped.

use super::command::CommandSpec;
use super::error::ExecError;
use super::outcome::{CompletedProcess, ExecutionOutcome, TimeoutExpired};
use super::privilege::{host_privilege_switcher, PrivilegeSwitcher};
use super::timeout::ExecutionTimeout;
use crate::encoding::{resolve_pipe_encoding, TextEncoding};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, Once, PoisonError};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How long to keep reading output after the child is gone
const DEFAULT_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Encoding used when nothing better can be determined
pub const DEFAULT_LAST_RESORT_ENCODING: &str = "UTF-8";

/// Operating systems the executor is exercised on
const TESTED_PLATFORMS: &[&str] = &["linux", "macos"];

/// Configuration for process execution
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Working directory for the child (default: inherit ours)
    pub working_dir: Option<PathBuf>,

    /// Explicit encoding for child output; wins over every lookup
    pub io_encoding: Option<String>,

    /// Encoding used when every lookup comes up empty
    pub last_resort_encoding: String,

    /// How long to wait for the output readers once the child has exited
    pub drain_grace: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            working_dir: None,
            io_encoding: None,
            last_resort_encoding: DEFAULT_LAST_RESORT_ENCODING.to_string(),
            drain_grace: DEFAULT_DRAIN_GRACE,
        }
    }
}

impl ExecutorConfig {
    /// Create a new executor config with custom working directory
    pub fn with_working_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: Some(dir.into()),
            ..Default::default()
        }
    }

    pub fn io_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.io_encoding = Some(encoding.into());
        self
    }

    pub fn last_resort_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.last_resort_encoding = encoding.into();
        self
    }
}

/// Executor for argument-vector commands
///
/// The pipe encoding is resolved once at construction and never changes, so a
/// single executor can be shared across concurrent callers.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use execguard::process::{CommandSpec, ProcessExecutor};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let executor = ProcessExecutor::new();
///     let spec = CommandSpec::new(["echo", "hello"]).with_timeout(Duration::from_secs(5));
///     let outcome = executor.run(&spec).await?;
///     assert!(outcome.is_success());
///     assert_eq!(outcome.stdout(), "hello\n");
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    pipe_encoding: TextEncoding,
    switcher: Arc<dyn PrivilegeSwitcher>,
    config: ExecutorConfig,
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessExecutor {
    /// Create an executor with default configuration
    pub fn new() -> Self {
        Self::with_config(ExecutorConfig::default())
    }

    /// Create an executor with custom configuration
    pub fn with_config(config: ExecutorConfig) -> Self {
        warn_if_untested_platform();

        let label = resolve_pipe_encoding(config.io_encoding.as_deref(), &config.last_resort_encoding);
        let pipe_encoding = TextEncoding::for_label(&label).unwrap_or_else(|| {
            warn!("Unknown pipe encoding '{}', decoding child output as UTF-8", label);
            TextEncoding::utf8()
        });
        debug!("Pipe encoding: {}", pipe_encoding);

        Self {
            pipe_encoding,
            switcher: host_privilege_switcher(),
            config,
        }
    }

    /// Override the resolved pipe encoding
    pub fn with_pipe_encoding(mut self, encoding: TextEncoding) -> Self {
        self.pipe_encoding = encoding;
        self
    }

    /// Replace the platform privilege switcher
    pub fn with_privilege_switcher(mut self, switcher: Arc<dyn PrivilegeSwitcher>) -> Self {
        self.switcher = switcher;
        self
    }

    pub fn pipe_encoding(&self) -> TextEncoding {
        self.pipe_encoding
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run a command and report how it ended
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The command spec is unusable (empty argument vector, zero timeout)
    /// - An alternate user was requested and cannot be switched to
    /// - The process cannot be spawned or waited on
    ///
    /// A timeout or a nonzero exit is an [`ExecutionOutcome`], not an error.
    pub async fn run(&self, spec: &CommandSpec) -> Result<ExecutionOutcome, ExecError> {
        spec.validate()?;
        let args = spec.args().to_vec();
        let program = args[0].clone();

        for marker in spec.stdin_markers() {
            warn!(
                "Argument {:?} usually means \"read from stdin\", but no input is ever piped to the child",
                marker
            );
        }
        if spec.timeout().is_none() && spec.warns_on_missing_timeout() {
            warn!("No timeout set for {:?}; a hung child cannot be detected", program);
        }

        let mut std_command = std::process::Command::new(&program);
        std_command.args(&args[1..]);
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            std_command.process_group(0);
        }

        let mut command = Command::from(std_command);
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(ref dir) = self.config.working_dir {
            command.current_dir(dir);
        }

        if let Some(username) = spec.run_as_user() {
            let identity = self.switcher.lookup(username)?;
            let working_dir = match self.config.working_dir {
                Some(ref dir) => dir.clone(),
                None => std::env::current_dir()
                    .map_err(|e| ExecError::system("reading the current directory", e))?,
            };
            info!(
                "Running as user '{}' (uid {}, gid {}) via {} switcher",
                identity.username,
                identity.uid,
                identity.gid,
                self.switcher.name()
            );
            self.switcher.apply(&identity, &working_dir, &mut command)?;
        }

        info!("Executing: {}", describe(&args));
        let timeout = ExecutionTimeout::from(spec.timeout());
        let start = Instant::now();

        let mut child = command.spawn().map_err(|source| ExecError::Spawn {
            program: program.clone(),
            source,
        })?;

        // Held until the child is reaped.
        let stdin = child.stdin.take();
        let stdout = StreamCapture::start(child.stdout.take());
        let stderr = StreamCapture::start(child.stderr.take());

        let waited = timeout.run(child.wait()).await;
        let elapsed = start.elapsed();

        let status = match waited {
            Some(status) => status.map_err(|e| ExecError::system("waiting for the child process", e))?,
            None => {
                warn!("Command timed out after {:?}: {}", elapsed, describe(&args));
                kill_process_group(&mut child);
                child
                    .wait()
                    .await
                    .map_err(|e| ExecError::system("reaping the timed-out child", e))?;
                drop(stdin);

                return Ok(ExecutionOutcome::TimedOut(TimeoutExpired {
                    args,
                    timeout: timeout.duration().unwrap_or_default(),
                    elapsed,
                    stdout: self.decode(stdout.finish(self.config.drain_grace).await),
                    stderr: self.decode(stderr.finish(self.config.drain_grace).await),
                }));
            }
        };
        drop(stdin);

        let process = CompletedProcess {
            exit_code: exit_code(status),
            stdout: self.decode(stdout.finish(self.config.drain_grace).await),
            stderr: self.decode(stderr.finish(self.config.drain_grace).await),
            args,
            elapsed,
        };

        if status.success() {
            info!("Command succeeded: {}", describe(&process.args));
            Ok(ExecutionOutcome::Success(process))
        } else {
            warn!(
                "Command failed: {} (exit code: {})",
                describe(&process.args),
                process.exit_code
            );
            Ok(ExecutionOutcome::Failed(process))
        }
    }

    fn decode(&self, bytes: Vec<u8>) -> String {
        self.pipe_encoding.decode_lossy(&bytes)
    }
}

/// Run `args` with a default executor
///
/// Convenience wrapper for one-off calls; long-lived callers should keep a
/// [`ProcessExecutor`] so the pipe encoding is resolved once.
pub async fn run_command(
    args: Vec<String>,
    timeout: Option<Duration>,
    run_as_user: Option<String>,
) -> Result<ExecutionOutcome, ExecError> {
    let mut spec = CommandSpec::new(args).with_optional_timeout(timeout);
    if let Some(user) = run_as_user {
        spec = spec.run_as(user);
    }
    ProcessExecutor::new().run(&spec).await
}

/// Output collected from one child stream
///
/// Bytes land in a shared buffer as they arrive, so whatever was read before
/// the reader is abandoned is still available.
struct StreamCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
    task: Option<JoinHandle<()>>,
}

impl StreamCapture {
    fn start<R>(reader: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let task = reader.map(|mut reader| {
            let buffer = Arc::clone(&buffer);
            tokio::spawn(async move {
                let mut chunk = [0u8; 8192];
                loop {
                    match reader.read(&mut chunk).await {
                        Ok(0) => break,
                        Ok(n) => buffer
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .extend_from_slice(&chunk[..n]),
                        Err(e) => {
                            debug!("Stopped reading child output: {}", e);
                            break;
                        }
                    }
                }
            })
        });
        Self { buffer, task }
    }

    /// Wait up to `grace` for the stream to close, then take what was read
    async fn finish(self, grace: Duration) -> Vec<u8> {
        if let Some(mut task) = self.task {
            if tokio::time::timeout(grace, &mut task).await.is_err() {
                // A grandchild outside the process group still holds the pipe.
                debug!("Output stream still open after {:?}, abandoning reader", grace);
                task.abort();
            }
        }
        std::mem::take(&mut *self.buffer.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Kill the child's whole process group
#[cfg(unix)]
fn kill_process_group(child: &mut Child) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return;
    };

    match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        Ok(()) => debug!("Sent SIGKILL to process group {}", pid),
        Err(Errno::ESRCH) => debug!("Process group {} already gone", pid),
        Err(errno) => {
            warn!("Failed to kill process group {}: {}", pid, errno);
            if let Err(e) = child.start_kill() {
                warn!("Failed to kill process {}: {}", pid, e);
            }
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        warn!("Failed to kill timed-out process: {}", e);
    }
}

/// Exit code, or `-N` for a child terminated by signal `N`
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}

/// Command line for log output (truncated for long vectors)
fn describe(args: &[String]) -> String {
    if args.len() > 3 {
        format!("{:?} ... ({} args)", args[0], args.len())
    } else {
        format!("{:?}", args)
    }
}

fn warn_if_untested_platform() {
    static CHECK: Once = Once::new();
    CHECK.call_once(|| {
        let os = std::env::consts::OS;
        if !TESTED_PLATFORMS.contains(&os) {
            warn!(
                "Process execution has not been tested on '{}' (tested: {})",
                os,
                TESTED_PLATFORMS.join(", ")
            );
        }
    });
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::process::privilege::UnsupportedPrivilegeSwitcher;

    fn executor() -> ProcessExecutor {
        ProcessExecutor::new().with_pipe_encoding(TextEncoding::utf8())
    }

    fn spec(args: &[&str], secs: u64) -> CommandSpec {
        CommandSpec::new(args.iter().copied()).with_timeout(Duration::from_secs(secs))
    }

    #[tokio::test]
    async fn test_echo_succeeds() {
        let outcome = executor().run(&spec(&["echo", "hello"], 5)).await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.exit_code(), Some(0));
        assert_eq!(outcome.stdout(), "hello\n");
    }

    #[tokio::test]
    async fn test_shell_metacharacters_reach_child_verbatim() {
        let outcome = executor()
            .run(&spec(&["echo", "a; rm -rf / && $(whoami) | cat"], 5))
            .await
            .unwrap();
        assert_eq!(outcome.stdout(), "a; rm -rf / && $(whoami) | cat\n");
    }

    #[tokio::test]
    async fn test_stdin_reader_times_out() {
        let outcome = executor().run(&spec(&["cat", "-"], 1)).await.unwrap();
        match outcome {
            ExecutionOutcome::TimedOut(ref expired) => {
                assert!(expired.elapsed >= Duration::from_secs(1));
                assert_eq!(expired.args, ["cat", "-"]);
                assert_eq!(expired.timeout, Duration::from_secs(1));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_keeps_partial_output() {
        let outcome = executor()
            .run(&spec(&["sh", "-c", "echo started; sleep 30"], 1))
            .await
            .unwrap();
        assert!(outcome.is_timed_out());
        assert_eq!(outcome.stdout(), "started\n");
        assert!(outcome.elapsed() < Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_nonzero_exit_fails() {
        let outcome = executor()
            .run(&spec(&["cat", "/nonexistent-file-xyz"], 5))
            .await
            .unwrap();
        assert!(outcome.is_failed());
        assert_ne!(outcome.exit_code(), Some(0));
        assert!(!outcome.stderr().is_empty());
    }

    #[tokio::test]
    async fn test_signal_exit_is_negative() {
        let outcome = executor()
            .run(&spec(&["sh", "-c", "kill -9 $$"], 5))
            .await
            .unwrap();
        assert!(outcome.is_failed());
        assert_eq!(outcome.exit_code(), Some(-9));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let err = executor()
            .run(&spec(&["execguard-definitely-not-a-program"], 5))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
        assert_eq!(err.exit_code(), 71);
    }

    #[tokio::test]
    async fn test_invalid_spec_is_rejected() {
        let err = executor().run(&CommandSpec::new(Vec::<String>::new())).await.unwrap_err();
        assert!(matches!(err, ExecError::InvalidCommand(_)));
    }

    #[tokio::test]
    async fn test_without_timeout_still_runs() {
        let spec = CommandSpec::new(["true"]).suppress_missing_timeout_warning();
        let outcome = executor().run(&spec).await.unwrap();
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let expected = dunce::canonicalize(dir.path()).unwrap();
        let executor = ProcessExecutor::with_config(ExecutorConfig::with_working_dir(dir.path()))
            .with_pipe_encoding(TextEncoding::utf8());
        let outcome = executor.run(&spec(&["pwd", "-P"], 5)).await.unwrap();
        assert_eq!(outcome.stdout().trim_end(), expected.to_string_lossy());
    }

    #[tokio::test]
    async fn test_unsupported_switcher_rejects_alternate_user() {
        let executor = executor().with_privilege_switcher(Arc::new(UnsupportedPrivilegeSwitcher::new("plan9")));
        let err = executor.run(&spec(&["true"], 5).run_as("root")).await.unwrap_err();
        assert!(matches!(err, ExecError::UnsupportedPlatform { .. }));
        assert_eq!(err.exit_code(), 64);
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let err = executor()
            .run(&spec(&["true"], 5).run_as("execguard-no-such-user-xyz"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::UnknownUser(_)));
    }

    #[tokio::test]
    async fn test_run_as_current_user() {
        let uid = nix::unistd::getuid();
        let Some(me) = nix::unistd::User::from_uid(uid).unwrap() else {
            return;
        };
        let outcome = executor()
            .run(&spec(&["sh", "-c", "id -u; echo $HOME; echo $USER"], 5).run_as(me.name.clone()))
            .await
            .unwrap();
        assert!(outcome.is_success(), "{:?}", outcome);
        let lines: Vec<&str> = outcome.stdout().lines().collect();
        assert_eq!(lines[0], uid.as_raw().to_string());
        assert_eq!(lines[1], me.dir.to_string_lossy());
        assert_eq!(lines[2], me.name);
    }

    #[tokio::test]
    async fn test_legacy_encoding_decodes_lossily() {
        let executor = ProcessExecutor::new().with_pipe_encoding(TextEncoding::for_label("latin1").unwrap());
        let outcome = executor
            .run(&spec(&["printf", "caf\\351"], 5))
            .await
            .unwrap();
        assert_eq!(outcome.stdout(), "café");
    }

    #[tokio::test]
    async fn test_console_code_page_decodes_child_output() {
        let executor = ProcessExecutor::with_config(ExecutorConfig::default().io_encoding("cp850"));
        assert_eq!(executor.pipe_encoding().name(), "cp850");
        let outcome = executor
            .run(&spec(&["printf", "caf\\202"], 5))
            .await
            .unwrap();
        assert_eq!(outcome.stdout(), "café");
    }

    #[tokio::test]
    async fn test_run_command() {
        let outcome = run_command(
            vec!["echo".to_string(), "hello".to_string()],
            Some(Duration::from_secs(5)),
            None,
        )
        .await
        .unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.stdout().trim_end(), "hello");
    }

    #[test]
    fn test_describe_truncates() {
        let args: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        assert_eq!(describe(&args), "\"a\" ... (4 args)");
        assert_eq!(describe(&args[..2]), "[\"a\", \"b\"]");
    }
}
