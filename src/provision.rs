//! Environment provisioning.
//!
//! The interpreter distribution under `<target>/<runtime subdir>` is always
//! destroyed and recreated; there is no upgrade path. After creating the
//! named environment, [`check_activation`] makes sure its interpreter is the
//! one found first on the activated search path.

use crate::context::RunContext;
use crate::fetch::Fetcher;
use crate::process::{self, CommandFailure, StructuredCommand};
use crate::BootstrapError;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use walkdir::WalkDir;

/// File name of the downloaded runtime installer inside the scratch dir.
const INSTALLER_FILE: &str = "runtime-installer.sh";

/// A created isolated environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedEnvironment {
    /// Root of the interpreter distribution.
    pub root: PathBuf,
    pub env_name: String,
    /// `<root>/envs/<env_name>`.
    pub prefix: PathBuf,
}

impl ProvisionedEnvironment {
    pub fn new(root: impl Into<PathBuf>, env_name: &str) -> Self {
        let root = root.into();
        Self {
            prefix: root.join("envs").join(env_name),
            env_name: env_name.to_string(),
            root,
        }
    }

    /// Executables of the environment.
    pub fn bin_dir(&self) -> PathBuf {
        self.prefix.join("bin")
    }

    pub fn python(&self) -> PathBuf {
        self.bin_dir().join("python")
    }

    pub fn conda(&self) -> PathBuf {
        self.root.join("bin").join("conda")
    }

    /// Directories activation puts in front of `PATH`, highest priority first.
    pub fn search_dirs(&self) -> Vec<PathBuf> {
        vec![self.bin_dir(), self.root.join("bin")]
    }
}

/// Copy the toolbox sources into `target` for a package install.
///
/// Top-level entries named in `skip` (VCS metadata, generated directories)
/// are left out, and so is `target` itself when it lies inside `source`.
/// Returns the number of files copied.
pub fn stage_sources(source: &Path, target: &Path, skip: &[&str]) -> Result<u64, BootstrapError> {
    fs::create_dir_all(target).map_err(|e| BootstrapError::io("create", target, e))?;
    let target_real = target
        .canonicalize()
        .map_err(|e| BootstrapError::io("resolve", target, e))?;

    let mut copied = 0;
    let walker = WalkDir::new(source).min_depth(1).into_iter().filter_entry(|entry| {
        let top_level_skip = entry.depth() == 1
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| skip.contains(&name));
        let is_target = entry
            .path()
            .canonicalize()
            .is_ok_and(|p| p == target_real);
        !top_level_skip && !is_target
    });

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(source).to_path_buf();
            BootstrapError::io("read", path, e.into())
        })?;
        let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let dest = target.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&dest).map_err(|e| BootstrapError::io("create", &dest, e))?;
        } else if file_type.is_symlink() {
            let link = fs::read_link(entry.path())
                .map_err(|e| BootstrapError::io("read link", entry.path(), e))?;
            let _ = fs::remove_file(&dest);
            std::os::unix::fs::symlink(&link, &dest)
                .map_err(|e| BootstrapError::io("link", &dest, e))?;
        } else {
            fs::copy(entry.path(), &dest).map_err(|e| BootstrapError::io("copy", &dest, e))?;
            copied += 1;
        }
    }

    info!(files = copied, from = %source.display(), to = %target.display(), "staged sources");
    Ok(copied)
}

/// Turn a failed provisioning command into a run error.
fn step_error(step: &str, failure: CommandFailure) -> BootstrapError {
    match failure {
        CommandFailure::Timeout { duration, .. } => BootstrapError::Timeout {
            step: step.to_string(),
            duration,
            fix: "Check your network connection, or raise timeouts.command_secs".to_string(),
        },
        CommandFailure::Interrupted { .. } => BootstrapError::aborted(),
        other => BootstrapError::Provision {
            step: step.to_string(),
            exit_code: other.exit_code(),
            stderr: other.stderr(),
            fix: "Check free disk space and write permission on the install directory, then run the installer again".to_string(),
        },
    }
}

async fn run_step(cmd: &StructuredCommand, step: &str, limit: Duration) -> Result<(), BootstrapError> {
    info!(step, "provisioning");
    process::run(cmd, limit)
        .await
        .map(|_| ())
        .map_err(|failure| step_error(step, failure))
}

/// Destroy and recreate the runtime, then create the named environment.
pub async fn provision(ctx: &RunContext, fetcher: &Fetcher) -> Result<ProvisionedEnvironment, BootstrapError> {
    let root = ctx.runtime_root();
    if root.exists() {
        info!(path = %root.display(), "removing previous runtime");
        fs::remove_dir_all(&root).map_err(|e| BootstrapError::io("remove", &root, e))?;
    }

    let runtime = &ctx.config.runtime;
    let installer = ctx.scratch().join(INSTALLER_FILE);
    fetcher
        .fetch(runtime.installer.for_family(ctx.plan.platform.os_family), &installer)
        .await?;

    let bash = which::which_in("bash", Some(ctx.search_path()), ctx.scratch()).map_err(|_| {
        BootstrapError::Provision {
            step: "locate bash".to_string(),
            exit_code: None,
            stderr: None,
            fix: "Install bash; the runtime installer is a bash script".to_string(),
        }
    })?;

    let install = ctx
        .command(bash)
        .arg(&installer)
        .args(["-b", "-p"])
        .arg(&root)
        .current_dir(ctx.scratch());
    run_step(&install, "install runtime", ctx.options.command_timeout).await?;

    let env = ProvisionedEnvironment::new(root, &runtime.env_name);
    let create = ctx
        .command(env.conda())
        .args(["create", "-y", "-n"])
        .arg(&env.env_name)
        .arg(format!("python={}", runtime.python_version));
    run_step(&create, "create environment", ctx.options.command_timeout).await?;

    check_activation(ctx, &env)?;
    Ok(env)
}

/// Verify the environment's interpreter wins on the activated search path.
pub fn check_activation(ctx: &RunContext, env: &ProvisionedEnvironment) -> Result<(), BootstrapError> {
    let expected = env.python();
    let path = ctx.activated_path(&env.search_dirs());
    let found = which::which_in("python", Some(&path), ctx.scratch()).ok();
    debug!(expected = %expected.display(), ?found, "activation check");

    let matches = match (&found, expected.canonicalize()) {
        (Some(found), Ok(expected)) => found.canonicalize().is_ok_and(|f| f == expected),
        _ => false,
    };
    if matches {
        return Ok(());
    }

    Err(BootstrapError::EnvironmentActivation {
        expected,
        found,
        fix: "Remove the runtime directory and run the installer again".to_string(),
    })
}
