//! Install planning.
//!
//! Command-line flags, probe results and answers to prompts are resolved
//! once into an [`InstallPlan`]. The plan does not change afterwards.

use crate::config::BootstrapConfig;
use crate::platform::{HostEnvironment, PlatformInfo};
use crate::BootstrapError;
use std::path::{Path, PathBuf};
use tracing::info;

/// Where the toolbox is installed relative to its sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallType {
    /// Install into the source checkout itself.
    InPlace,
    /// Copy the sources into a separate target directory.
    Package,
}

/// What the user asked for on the command line.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    /// Toolbox checkout containing the manifests.
    pub source_dir: PathBuf,
    /// Requested target directory (`--prefix`), if any.
    pub target_dir: Option<PathBuf>,
    /// `-i`: force an in-place install.
    pub in_place: bool,
    /// `-y`: never prompt, take every default.
    pub assume_yes: bool,
    /// `-d`: skip the data bundles.
    pub skip_data: bool,
    /// `-b`: skip the binaries archive.
    pub skip_binaries: bool,
}

impl InstallRequest {
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            target_dir: None,
            in_place: false,
            assume_yes: false,
            skip_data: false,
            skip_binaries: false,
        }
    }

    /// Whether prompts should be shown. `-y` or the interactive override
    /// variable set to `no`/`0`/`false` turn them off.
    pub fn is_interactive(&self, host: &HostEnvironment, cfg: &BootstrapConfig) -> bool {
        if self.assume_yes {
            return false;
        }
        !matches!(
            host.var(&cfg.toolbox.interactive_var)
                .map(str::to_ascii_lowercase)
                .as_deref(),
            Some("no" | "0" | "false")
        )
    }
}

/// The resolved choices for one run.
#[derive(Debug, Clone)]
pub struct InstallPlan {
    pub install_type: InstallType,
    pub source_dir: PathBuf,
    pub target_dir: PathBuf,
    pub interactive: bool,
    pub skip_data: bool,
    pub skip_binaries: bool,
    /// Write activation into the user's shell rc file.
    pub update_shell: bool,
    pub platform: PlatformInfo,
}

/// Asks the user questions during planning.
pub trait Prompter: Send + Sync {
    /// Yes/no question.
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, BootstrapError>;

    /// Ask for a directory. Implementations re-ask until the answer is an
    /// absolute path.
    fn directory(&self, prompt: &str, default: &Path) -> Result<PathBuf, BootstrapError>;
}

/// Answers every prompt with its default, without suspending.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAnswers;

impl Prompter for DefaultAnswers {
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, BootstrapError> {
        info!(prompt, answer = default, "non-interactive default");
        Ok(default)
    }

    fn directory(&self, prompt: &str, default: &Path) -> Result<PathBuf, BootstrapError> {
        info!(prompt, answer = %default.display(), "non-interactive default");
        Ok(default.to_path_buf())
    }
}

/// Prompts on the terminal with `dialoguer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompter;

fn prompt_error(e: dialoguer::Error) -> BootstrapError {
    let dialoguer::Error::IO(io) = e;
    if io.kind() == std::io::ErrorKind::Interrupted {
        BootstrapError::aborted()
    } else {
        BootstrapError::io("read answer from", "<terminal>", io)
    }
}

impl Prompter for TerminalPrompter {
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, BootstrapError> {
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(prompt_error)
    }

    fn directory(&self, prompt: &str, default: &Path) -> Result<PathBuf, BootstrapError> {
        let answer: String = dialoguer::Input::new()
            .with_prompt(prompt)
            .default(default.display().to_string())
            .validate_with(|input: &String| -> Result<(), &str> {
                if Path::new(input.trim()).is_absolute() {
                    Ok(())
                } else {
                    Err("Please enter an absolute path")
                }
            })
            .interact_text()
            .map_err(prompt_error)?;
        Ok(PathBuf::from(answer.trim()))
    }
}

/// Default package target: `$HOME/<short_name>_<version>`.
pub fn default_target(host: &HostEnvironment, cfg: &BootstrapConfig) -> Option<PathBuf> {
    host.home().map(|home| {
        home.join(format!(
            "{}_{}",
            cfg.toolbox.short_name, cfg.toolbox.version
        ))
    })
}

/// Resolve the plan.
///
/// `-i` (or a target equal to the source) gives an in-place install. A
/// package install into a non-empty directory asks before overwriting;
/// declining aborts the run.
pub fn resolve_plan(
    request: &InstallRequest,
    platform: PlatformInfo,
    host: &HostEnvironment,
    cfg: &BootstrapConfig,
    prompter: &dyn Prompter,
) -> Result<InstallPlan, BootstrapError> {
    let interactive = request.is_interactive(host, cfg);
    let source_dir = request.source_dir.clone();

    let target_dir = if request.in_place {
        source_dir.clone()
    } else {
        let default = request
            .target_dir
            .clone()
            .or_else(|| default_target(host, cfg))
            .unwrap_or_else(|| source_dir.clone());
        prompter.directory(
            &format!("Where do you want to install {}?", cfg.toolbox.name),
            &default,
        )?
    };

    let install_type = if same_dir(&target_dir, &source_dir) {
        InstallType::InPlace
    } else {
        InstallType::Package
    };

    if install_type == InstallType::Package && is_non_empty_dir(&target_dir) {
        let overwrite = prompter.confirm(
            &format!(
                "{} already exists and is not empty. Overwrite it?",
                target_dir.display()
            ),
            true,
        )?;
        if !overwrite {
            return Err(BootstrapError::aborted());
        }
    }

    let update_shell = prompter.confirm(
        &format!(
            "Add {} to your PATH in {}?",
            cfg.toolbox.name,
            platform.shell.config_path.display()
        ),
        true,
    )?;

    info!(?install_type, target = %target_dir.display(), interactive, update_shell, "install plan resolved");
    Ok(InstallPlan {
        install_type,
        source_dir,
        target_dir,
        interactive,
        skip_data: request.skip_data,
        skip_binaries: request.skip_binaries,
        update_shell,
        platform,
    })
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn is_non_empty_dir(path: &Path) -> bool {
    std::fs::read_dir(path)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}
