//! External command execution.
//!
//! Every tool the installer drives (download transports, the runtime
//! installer, conda, pip, the validation command) goes through [`run`], so
//! timeouts, environment handling and failure reporting are uniform.

use std::ffi::OsString;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, trace};

const SIGINT: i32 = 2;

/// A command ready for execution.
///
/// The child's environment is exactly `env_vars`: the run context supplies
/// the full set, so nothing leaks in from the installer's own process.
///
/// # Example
///
/// ```rust
/// use sct_bootstrap::StructuredCommand;
///
/// let cmd = StructuredCommand::new("pip")
///     .args(["install", "-r", "requirements.txt"])
///     .env("PIP_NO_INPUT", "1");
/// assert_eq!(cmd.display(), "pip install -r requirements.txt");
/// ```
#[derive(Debug, Clone)]
pub struct StructuredCommand {
    /// The program to execute, usually an absolute path.
    pub program: PathBuf,

    /// Arguments to pass to the program.
    pub args: Vec<OsString>,

    /// Complete environment of the child process (key, value pairs).
    pub env_vars: Vec<(String, String)>,

    /// Working directory, if different from the installer's.
    pub current_dir: Option<PathBuf>,
}

impl StructuredCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env_vars: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        self.env_vars.retain(|(k, _)| *k != key);
        self.env_vars.push((key, value.into()));
        self
    }

    pub fn envs<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            self = self.env(key, value);
        }
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Command line for logs and error messages.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().map(|a| a.to_string_lossy().into_owned()));
        parts.join(" ")
    }
}

/// Captured output of a successful command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Why a command did not succeed.
#[derive(Debug, Error)]
pub enum CommandFailure {
    /// The program could not be started.
    #[error("could not start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran longer than allowed and was killed.
    #[error("{program} timed out after {duration:?}")]
    Timeout { program: String, duration: Duration },

    /// The program was stopped by an interrupt signal.
    #[error("{program} was interrupted")]
    Interrupted { program: String },

    /// The program exited unsuccessfully.
    #[error("{program} exited with code {code:?}")]
    Exit {
        program: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
}

impl CommandFailure {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exit { code, .. } => *code,
            _ => None,
        }
    }

    /// Standard error, when the program ran at all.
    pub fn stderr(&self) -> Option<String> {
        match self {
            Self::Exit { stderr, .. } if !stderr.is_empty() => Some(stderr.clone()),
            _ => None,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted { .. })
    }
}

/// Run a command to completion within `limit`.
///
/// The child is killed if the limit expires or if the returned future is
/// dropped (an interrupted run drops the stage future). It runs in its own
/// process group, so a terminal Ctrl-C reaches only the installer.
pub async fn run(cmd: &StructuredCommand, limit: Duration) -> Result<CommandOutput, CommandFailure> {
    let program = cmd.display();
    debug!(command = %program, "running");

    let mut command = Command::new(&cmd.program);
    command
        .args(&cmd.args)
        .env_clear()
        .envs(cmd.env_vars.iter().cloned())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0)
        .kill_on_drop(true);
    if let Some(dir) = &cmd.current_dir {
        command.current_dir(dir);
    }

    let output = match timeout(limit, command.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(source)) => {
            return Err(CommandFailure::Spawn {
                program: cmd.program.display().to_string(),
                source,
            })
        }
        Err(_) => {
            return Err(CommandFailure::Timeout {
                program: cmd.program.display().to_string(),
                duration: limit,
            })
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    trace!(%stdout, %stderr, "command output");

    if output.status.signal() == Some(SIGINT) {
        return Err(CommandFailure::Interrupted {
            program: cmd.program.display().to_string(),
        });
    }

    if !output.status.success() {
        return Err(CommandFailure::Exit {
            program: cmd.program.display().to_string(),
            code: output.status.code(),
            stdout,
            stderr,
        });
    }

    Ok(CommandOutput { stdout, stderr })
}
