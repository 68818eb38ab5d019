// execguard - Main Entry Point
//
// Thin CLI over the library:
// - check-input / check-path: validate untrusted values, print them back
// - encoding: show the resolved pipe encoding
// - run: execute an argument vector with timeout and optional user switch

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use execguard::config::Config;
use execguard::encoding::resolve_pipe_encoding;
use execguard::logging::{LogLevel, Session};
use execguard::process::{CommandSpec, ExecError, ExecutionOutcome, ProcessExecutor};
use execguard::sanitize::{sanitize_input, sanitize_path, CharacterSet, PathConstraints, ValidationError};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::info;

/// Exit status for a run that hit its timeout (as coreutils `timeout`)
const EXIT_TIMEOUT: u8 = 124;

const DEFAULT_WHITELIST: &str = r"\w\.\-_";
const DEFAULT_BLACKLIST: &str = r##";&'"#!$%\r\n"##;

/// execguard: validated command execution
#[derive(Parser, Debug)]
#[command(name = "execguard")]
#[command(version)]
#[command(about = "Sanitize untrusted input and run commands safely", long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file (default: platform config directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check a string against a character whitelist and blacklist
    CheckInput {
        text: String,

        /// Allowed characters, as a regex bracket-class body
        #[arg(long, default_value = DEFAULT_WHITELIST)]
        whitelist: String,

        /// Forbidden characters, as a regex bracket-class body
        #[arg(long, default_value = DEFAULT_BLACKLIST)]
        blacklist: String,

        #[arg(long, default_value = "utf-8")]
        encoding: String,
    },
    /// Validate a path and print its canonical form
    CheckPath {
        path: String,

        /// Required path kind
        #[arg(long, value_name = "KIND")]
        must_be: Option<PathKind>,

        /// Allowed path kind (repeatable)
        #[arg(long, value_name = "KIND")]
        may_be: Vec<PathKind>,

        #[arg(long)]
        must_be_readable: bool,
        #[arg(long)]
        may_be_readable: bool,
        #[arg(long)]
        must_be_writable: bool,
        #[arg(long)]
        may_be_writable: bool,
        #[arg(long)]
        must_be_executable: bool,
        #[arg(long)]
        may_be_executable: bool,

        #[arg(long, default_value = "utf-8")]
        encoding: String,
    },
    /// Print the encoding used to decode child output
    Encoding {
        /// Encoding used when nothing else is known
        #[arg(long)]
        last_resort: Option<String>,
    },
    /// Run a command (arguments after `--`)
    Run {
        /// Timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Run the command as this user (POSIX only)
        #[arg(long)]
        user: Option<String>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,

        /// Program and arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        args: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PathKind {
    File,
    Directory,
    Symlink,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::CheckInput { .. } => "check-input",
            Commands::CheckPath { .. } => "check-path",
            Commands::Encoding { .. } => "encoding",
            Commands::Run { .. } => "run",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match execute(args).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(error_exit_code(&e))
        }
    }
}

async fn execute(args: Args) -> Result<u8> {
    let config = load_config(args.config.as_ref())?;

    let mut logging = config.logging_config()?;
    if args.verbose {
        logging.level = LogLevel::Debug;
    }
    logging.init().context("Failed to initialize logging")?;

    let session = Session::begin(args.command.name());
    let result = dispatch(args.command, &config).await;
    let code = match result {
        Ok(code) => code,
        Err(ref e) => error_exit_code(e),
    };
    session.finish(i32::from(code));
    result
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file {:?} does not exist", path);
            }
            Config::load_from_path(path)
        }
        None => Config::load(),
    }
}

async fn dispatch(command: Commands, config: &Config) -> Result<u8> {
    match command {
        Commands::CheckInput {
            text,
            whitelist,
            blacklist,
            encoding,
        } => {
            let whitelist = CharacterSet::new(whitelist)?;
            let blacklist = CharacterSet::new(blacklist)?;
            sanitize_input(&text, &encoding, &whitelist, &blacklist)?;
            println!("{}", text);
            Ok(0)
        }
        Commands::CheckPath {
            path,
            must_be,
            may_be,
            must_be_readable,
            may_be_readable,
            must_be_writable,
            may_be_writable,
            must_be_executable,
            may_be_executable,
            encoding,
        } => {
            let constraints = PathConstraints {
                must_be_file: must_be == Some(PathKind::File),
                may_be_file: may_be.contains(&PathKind::File),
                must_be_directory: must_be == Some(PathKind::Directory),
                may_be_directory: may_be.contains(&PathKind::Directory),
                must_be_symlink: must_be == Some(PathKind::Symlink),
                may_be_symlink: may_be.contains(&PathKind::Symlink),
                must_be_readable,
                may_be_readable,
                must_be_writable,
                may_be_writable,
                must_be_executable,
                may_be_executable,
            };
            let validated = sanitize_path(&path, &encoding, &constraints)?;
            println!("{}", validated);
            Ok(0)
        }
        Commands::Encoding { last_resort } => {
            let last_resort = last_resort.unwrap_or_else(|| config.execution.last_resort_encoding.clone());
            println!(
                "{}",
                resolve_pipe_encoding(config.execution.io_encoding.as_deref(), &last_resort)
            );
            Ok(0)
        }
        Commands::Run {
            timeout,
            user,
            json,
            args,
        } => {
            let timeout = timeout
                .map(Duration::from_secs)
                .or_else(|| config.execution.default_timeout());
            let mut spec = CommandSpec::new(args).with_optional_timeout(timeout);
            if let Some(user) = user {
                spec = spec.run_as(user);
            }
            if config.execution.suppress_missing_timeout_warning {
                spec = spec.suppress_missing_timeout_warning();
            }

            let executor = ProcessExecutor::with_config(config.execution.executor_config());
            let outcome = executor.run(&spec).await?;
            info!("{}", outcome.summary());

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&outcome).context("Failed to serialize outcome")?
                );
            } else {
                print!("{}", outcome.stdout());
                eprint!("{}", outcome.stderr());
                if let ExecutionOutcome::TimedOut(ref expired) = outcome {
                    eprintln!("Command timed out after {:?}", expired.timeout);
                }
            }
            Ok(outcome_exit_code(&outcome))
        }
    }
}

/// Exit status mirroring the child's
fn outcome_exit_code(outcome: &ExecutionOutcome) -> u8 {
    match outcome {
        ExecutionOutcome::Success(_) => 0,
        ExecutionOutcome::TimedOut(_) => EXIT_TIMEOUT,
        ExecutionOutcome::Failed(process) if process.exit_code < 0 => {
            // Terminated by signal N, reported the way shells do.
            (128 + process.exit_code.saturating_neg()).clamp(1, 255) as u8
        }
        ExecutionOutcome::Failed(process) => process.exit_code.clamp(1, 255) as u8,
    }
}

fn error_exit_code(error: &anyhow::Error) -> u8 {
    if let Some(e) = error.downcast_ref::<ValidationError>() {
        return e.exit_code() as u8;
    }
    if let Some(e) = error.downcast_ref::<ExecError>() {
        return e.exit_code() as u8;
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use execguard::process::CompletedProcess;

    fn failed(exit_code: i32) -> ExecutionOutcome {
        ExecutionOutcome::Failed(CompletedProcess {
            args: vec!["false".to_string()],
            exit_code,
            stdout: String::new(),
            stderr: String::new(),
            elapsed: Duration::from_millis(1),
        })
    }

    #[test]
    fn test_outcome_exit_codes() {
        assert_eq!(outcome_exit_code(&failed(1)), 1);
        assert_eq!(outcome_exit_code(&failed(300)), 255);
        assert_eq!(outcome_exit_code(&failed(-9)), 137);
    }

    #[test]
    fn test_error_exit_codes() {
        let usage = anyhow::Error::new(ValidationError::BadParametrization("x".to_string()));
        assert_eq!(error_exit_code(&usage), 64);
        let other = anyhow::anyhow!("something else");
        assert_eq!(error_exit_code(&other), 1);
    }

    #[test]
    fn test_cli_parses_run_arguments() {
        let args = Args::try_parse_from(["execguard", "run", "--timeout", "5", "--", "ls", "-l"]).unwrap();
        match args.command {
            Commands::Run { timeout, args, .. } => {
                assert_eq!(timeout, Some(5));
                assert_eq!(args, ["ls", "-l"]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
