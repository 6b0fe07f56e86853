//! Dependency installation.
//!
//! A frozen manifest (exact pins, shipped with releases) always takes
//! precedence over the floating one used by development checkouts.

use crate::config::DependencyConfig;
use crate::context::RunContext;
use crate::process::{self, CommandFailure, StructuredCommand};
use crate::provision::ProvisionedEnvironment;
use crate::BootstrapError;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Which manifest the install uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSelection {
    Frozen(PathBuf),
    Floating(PathBuf),
}

impl ManifestSelection {
    pub fn path(&self) -> &Path {
        match self {
            Self::Frozen(path) | Self::Floating(path) => path,
        }
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self, Self::Frozen(_))
    }
}

/// Pick the manifest in `dir`: frozen if present, else floating.
///
/// # Example
///
/// ```rust,no_run
/// use sct_bootstrap::config::DependencyConfig;
/// use sct_bootstrap::deps::select_manifest;
/// use std::path::Path;
///
/// let selection = select_manifest(Path::new("/opt/sct"), &DependencyConfig::default()).unwrap();
/// println!("installing from {}", selection.path().display());
/// ```
pub fn select_manifest(dir: &Path, cfg: &DependencyConfig) -> Result<ManifestSelection, BootstrapError> {
    let frozen = dir.join(&cfg.frozen_manifest);
    if frozen.is_file() {
        return Ok(ManifestSelection::Frozen(frozen));
    }
    let floating = dir.join(&cfg.floating_manifest);
    if floating.is_file() {
        return Ok(ManifestSelection::Floating(floating));
    }
    Err(BootstrapError::DependencyInstall {
        step: "select manifest".to_string(),
        exit_code: None,
        stderr: None,
        fix: format!(
            "Neither {} nor {} was found in {}; run the installer from a complete checkout",
            cfg.frozen_manifest,
            cfg.floating_manifest,
            dir.display()
        ),
    })
}

fn step_error(step: &str, failure: CommandFailure) -> BootstrapError {
    match failure {
        CommandFailure::Timeout { duration, .. } => BootstrapError::Timeout {
            step: step.to_string(),
            duration,
            fix: "Check your network connection, or raise timeouts.command_secs".to_string(),
        },
        CommandFailure::Interrupted { .. } => BootstrapError::aborted(),
        other => BootstrapError::DependencyInstall {
            step: step.to_string(),
            exit_code: other.exit_code(),
            stderr: other.stderr(),
            fix: "Read the package installer output above; network or proxy problems are the usual cause".to_string(),
        },
    }
}

/// Install the manifest, apply the correction, then install the toolbox
/// itself in editable mode from the target directory.
pub async fn install_dependencies(
    ctx: &RunContext,
    env: &ProvisionedEnvironment,
    selection: &ManifestSelection,
) -> Result<(), BootstrapError> {
    let path = ctx.activated_path(&env.search_dirs());
    let pip = |args: Vec<String>| -> StructuredCommand {
        ctx.command(env.python())
            .args(["-m", "pip"])
            .args(args)
            .env("PATH", path.clone())
            .current_dir(ctx.target())
    };

    let mut steps: Vec<(String, StructuredCommand)> = Vec::new();
    let manifest = selection.path().display().to_string();
    steps.push((
        format!("pip install -r {}", manifest),
        pip(vec!["install".into(), "-r".into(), manifest.clone()]),
    ));

    if let Some(correction) = &ctx.config.dependencies.correction {
        let mut uninstall = vec!["uninstall".to_string(), "-y".to_string()];
        uninstall.extend(correction.uninstall.iter().cloned());
        steps.push((
            format!("pip uninstall {}", correction.uninstall.join(" ")),
            pip(uninstall),
        ));
        steps.push((
            format!("pip install {}", correction.reinstall),
            pip(vec!["install".into(), correction.reinstall.clone()]),
        ));
    }

    let target = ctx.target().display().to_string();
    steps.push((
        format!("pip install -e {}", target),
        pip(vec!["install".into(), "-e".into(), target.clone()]),
    ));

    info!(manifest = %manifest, frozen = selection.is_frozen(), "installing dependencies");
    for (step, cmd) in &steps {
        info!(step = %step, "running");
        process::run(cmd, ctx.options.command_timeout)
            .await
            .map_err(|failure| step_error(step, failure))?;
    }
    Ok(())
}

fn is_executable(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

/// Link the environment's entry points starting with `prefix` into
/// `bin_dir`, replacing whatever is there under the same name.
///
/// Returns the created links, sorted.
pub fn link_entry_points(
    env: &ProvisionedEnvironment,
    bin_dir: &Path,
    prefix: &str,
) -> Result<Vec<PathBuf>, BootstrapError> {
    let env_bin = env.bin_dir();
    fs::create_dir_all(bin_dir).map_err(|e| BootstrapError::io("create", bin_dir, e))?;

    let entries = fs::read_dir(&env_bin).map_err(|e| BootstrapError::io("read", &env_bin, e))?;
    let mut links = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| BootstrapError::io("read", &env_bin, e))?;
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(prefix) || !is_executable(&entry.path()) {
            continue;
        }

        let link = bin_dir.join(&name);
        if fs::symlink_metadata(&link).is_ok() {
            fs::remove_file(&link).map_err(|e| BootstrapError::io("replace", &link, e))?;
        }
        std::os::unix::fs::symlink(entry.path(), &link)
            .map_err(|e| BootstrapError::io("link", &link, e))?;
        debug!(link = %link.display(), "linked entry point");
        links.push(link);
    }

    links.sort();
    info!(count = links.len(), dir = %bin_dir.display(), "linked entry points");
    Ok(links)
}
