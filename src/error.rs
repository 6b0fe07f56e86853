//! Error types for bootstrap runs.
//!
//! Every stage failure is fatal to the whole run. Each variant carries a
//! `fix` suggestion so the CLI can tell the user what to try next.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can end a bootstrap run.
///
/// # Example
///
/// ```rust
/// use sct_bootstrap::BootstrapError;
///
/// fn report(error: &BootstrapError) {
///     eprintln!("Installation failed: {}", error);
///     eprintln!("To fix: {}", error.fix_suggestion());
/// }
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BootstrapError {
    /// The host OS family is not supported, or its version is too old.
    #[error("Unsupported platform: {os} {version}")]
    UnsupportedPlatform {
        /// OS name as reported by the host.
        os: String,
        /// Version string found (may be empty when unknown).
        version: String,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// The user's shell could not be mapped to a known dialect.
    #[error("Unable to detect a supported shell (SHELL={shell})")]
    ShellDetection {
        /// Raw value of the shell variable.
        shell: String,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// No download transport could retrieve the resource.
    #[error("Download failed for {url}: {message}")]
    Download {
        /// Resource that was being fetched.
        url: String,
        /// Summary of every attempt made.
        message: String,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// Creating the runtime or the isolated environment failed.
    #[error("Provisioning step '{step}' failed (exit code {exit_code:?})")]
    Provision {
        /// Name of the failing step.
        step: String,
        /// Exit code of the underlying tool, if it ran.
        exit_code: Option<i32>,
        /// Standard error of the underlying tool, if captured.
        stderr: Option<String>,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// The interpreter resolved after activation is not the provisioned one.
    #[error("Environment activation check failed: expected {expected:?}, found {found:?}")]
    EnvironmentActivation {
        /// Interpreter path inside the provisioned environment.
        expected: PathBuf,
        /// Interpreter actually resolved on the search path.
        found: Option<PathBuf>,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// A dependency installation step failed.
    #[error("Dependency installation step '{step}' failed (exit code {exit_code:?})")]
    DependencyInstall {
        /// Name of the failing step.
        step: String,
        /// Exit code of the package tool, if it ran.
        exit_code: Option<i32>,
        /// Standard error of the package tool, if captured.
        stderr: Option<String>,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// A binaries or data bundle could not be installed.
    #[error("Artifact installation failed for {artifact}: {message}")]
    ArtifactInstall {
        /// Bundle name.
        artifact: String,
        /// Description of the failure.
        message: String,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// The post-install self-check failed.
    #[error("Validation failed: '{command}' exited with code {exit_code:?}")]
    Validation {
        /// Validation command line.
        command: String,
        /// Exit code, if the command ran.
        exit_code: Option<i32>,
        /// Output collected from the command.
        details: String,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// A step did not finish within its time limit.
    #[error("Step '{step}' timed out after {duration:?}")]
    Timeout {
        /// Name of the step.
        step: String,
        /// How long the step was allowed to run.
        duration: Duration,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// The configuration file could not be read or parsed.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Description of the problem.
        message: String,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// A filesystem operation failed.
    #[error("Failed to {action} {path:?}: {source}")]
    Io {
        /// What was being done ("create", "remove", ...).
        action: String,
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// The user declined a prompt or interrupted the run.
    #[error("Installation aborted by user")]
    UserAborted {
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },
}

impl BootstrapError {
    /// Get an actionable suggestion for fixing this error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use sct_bootstrap::BootstrapError;
    /// use std::time::Duration;
    ///
    /// let error = BootstrapError::Timeout {
    ///     step: "pip install".to_string(),
    ///     duration: Duration::from_secs(60),
    ///     fix: "Check network connectivity and retry".to_string(),
    /// };
    /// assert!(error.fix_suggestion().contains("network"));
    /// ```
    pub fn fix_suggestion(&self) -> &str {
        match self {
            Self::UnsupportedPlatform { fix, .. } => fix,
            Self::ShellDetection { fix, .. } => fix,
            Self::Download { fix, .. } => fix,
            Self::Provision { fix, .. } => fix,
            Self::EnvironmentActivation { fix, .. } => fix,
            Self::DependencyInstall { fix, .. } => fix,
            Self::ArtifactInstall { fix, .. } => fix,
            Self::Validation { fix, .. } => fix,
            Self::Timeout { fix, .. } => fix,
            Self::Config { fix, .. } => fix,
            Self::Io { fix, .. } => fix,
            Self::UserAborted { fix } => fix,
        }
    }

    /// Process exit code for this error. Every failure, including a user
    /// abort, exits with 1.
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// Whether the run ended because the user asked it to.
    pub fn is_user_abort(&self) -> bool {
        matches!(self, Self::UserAborted { .. })
    }

    /// Shorthand for a filesystem error.
    pub fn io(action: &str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        Self::Io {
            fix: format!(
                "Check that {} is writable and that the disk is not full",
                path.display()
            ),
            action: action.to_string(),
            path,
            source,
        }
    }

    /// Shorthand for an interrupted or declined run.
    pub(crate) fn aborted() -> Self {
        Self::UserAborted {
            fix: "Run the installer again when you are ready".to_string(),
        }
    }
}
