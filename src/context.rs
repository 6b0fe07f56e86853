//! Run context.
//!
//! [`RunContext`] carries everything a stage needs: the plan, the
//! configuration, the time limits, the host snapshot and the scratch
//! directory. Stages never read the installer's own environment or working
//! directory.

use crate::config::BootstrapConfig;
use crate::fetch::Fetcher;
use crate::options::BootstrapOptions;
use crate::plan::InstallPlan;
use crate::platform::HostEnvironment;
use crate::process::StructuredCommand;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Explicit state of one run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub plan: InstallPlan,
    pub config: BootstrapConfig,
    pub options: BootstrapOptions,
    pub host: HostEnvironment,
    scratch: PathBuf,
    child_env: Vec<(String, String)>,
}

impl RunContext {
    /// Build the context. Child processes see the host's variables with the
    /// platform overrides (locale guard) applied on top.
    pub fn new(
        plan: InstallPlan,
        config: BootstrapConfig,
        options: BootstrapOptions,
        host: HostEnvironment,
        scratch: &Path,
    ) -> Self {
        let mut child_env: Vec<(String, String)> = host
            .vars()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (key, value) in &plan.platform.env_overrides {
            child_env.retain(|(k, _)| k != key);
            child_env.push((key.clone(), value.clone()));
        }

        Self {
            plan,
            config,
            options,
            host,
            scratch: scratch.to_path_buf(),
            child_env,
        }
    }

    /// Per-run scratch directory, removed when the run ends.
    pub fn scratch(&self) -> &Path {
        &self.scratch
    }

    pub fn target(&self) -> &Path {
        &self.plan.target_dir
    }

    /// Root of the interpreter distribution.
    pub fn runtime_root(&self) -> PathBuf {
        self.target().join(&self.config.runtime.subdir)
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.target().join(&self.config.artifacts.bin_dir)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.target().join(&self.config.artifacts.data_dir)
    }

    /// The host's `PATH`, as child processes see it.
    pub fn host_path(&self) -> &str {
        self.child_env
            .iter()
            .find(|(k, _)| k == "PATH")
            .map(|(_, v)| v.as_str())
            .unwrap_or_default()
    }

    /// Search path for locating host tools.
    pub fn search_path(&self) -> OsString {
        OsString::from(self.host_path())
    }

    /// `PATH` with `dirs` in front of the host's entries.
    pub fn activated_path(&self, dirs: &[PathBuf]) -> String {
        let mut parts: Vec<String> = dirs.iter().map(|d| d.display().to_string()).collect();
        if !self.host_path().is_empty() {
            parts.push(self.host_path().to_string());
        }
        parts.join(":")
    }

    /// Variables the activation block exports: the install directory and
    /// the plotting backend (host value wins over the default).
    pub fn activation_vars(&self) -> Vec<(String, String)> {
        let shell = &self.config.shell;
        let backend = self
            .host
            .var(&shell.plotting_backend_var)
            .unwrap_or(&shell.plotting_backend)
            .to_string();
        vec![
            (
                self.config.toolbox.home_var.clone(),
                self.target().display().to_string(),
            ),
            (shell.plotting_backend_var.clone(), backend),
        ]
    }

    /// A command carrying the child environment.
    pub fn command(&self, program: impl Into<PathBuf>) -> StructuredCommand {
        StructuredCommand::new(program).envs(self.child_env.iter().cloned())
    }

    /// A fetcher bound to this run's search path and environment.
    pub fn fetcher(&self) -> Fetcher {
        Fetcher::new(
            self.search_path(),
            self.child_env.clone(),
            self.options.download_timeout,
        )
    }
}
