//! Run states reported while bootstrapping.
//!
//! A run moves through the states of [`RunState`] in declaration order and
//! ends in [`RunState::Success`] or [`RunState::Failed`]. Callers receive
//! each state through the callback passed to
//! [`Bootstrap::run`](crate::Bootstrap::run).

/// Stage of a bootstrap run.
///
/// # Example
///
/// ```rust
/// use sct_bootstrap::RunState;
///
/// fn on_progress(state: RunState) {
///     if !state.is_terminal() {
///         println!("{}...", state.description());
///     }
/// }
///
/// on_progress(RunState::Provisioning);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    /// Inspecting the OS and shell.
    Probing,
    /// Resolving flags and prompts into an install plan.
    Planning,
    /// Staging sources and creating the isolated runtime.
    Provisioning,
    /// Installing the dependency manifest and the toolbox.
    DependencyInstall,
    /// Installing binaries and data bundles.
    ArtifactInstall,
    /// Writing activation into the shell rc file.
    ShellIntegration,
    /// Running the self-check.
    Validating,
    Success,
    Failed,
}

impl RunState {
    /// Human-readable description of the stage.
    ///
    /// # Example
    ///
    /// ```rust
    /// use sct_bootstrap::RunState;
    ///
    /// assert_eq!(RunState::Probing.description(), "Checking the platform");
    /// ```
    pub fn description(&self) -> &'static str {
        match self {
            Self::Probing => "Checking the platform",
            Self::Planning => "Planning the installation",
            Self::Provisioning => "Creating the isolated environment",
            Self::DependencyInstall => "Installing dependencies",
            Self::ArtifactInstall => "Installing binaries and data",
            Self::ShellIntegration => "Updating the shell configuration",
            Self::Validating => "Validating the installation",
            Self::Success => "Installation complete",
            Self::Failed => "Installation failed",
        }
    }

    /// Whether the run has ended.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}
