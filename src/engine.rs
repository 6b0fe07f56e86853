//! The bootstrap run.
//!
//! [`Bootstrap::run`] drives the stages in order, reporting each
//! [`RunState`] to the caller. Every exit path, including an interrupt,
//! goes through the same finalizer: the run's scratch directory is a
//! [`tempfile::TempDir`] dropped when `run` returns.

use crate::artifacts::{install_artifacts, ArtifactKind};
use crate::config::BootstrapConfig;
use crate::context::RunContext;
use crate::deps::{install_dependencies, link_entry_points, select_manifest, ManifestSelection};
use crate::options::BootstrapOptions;
use crate::plan::{resolve_plan, DefaultAnswers, InstallPlan, InstallRequest, InstallType, Prompter, TerminalPrompter};
use crate::platform::{probe, HostEnvironment};
use crate::progress::RunState;
use crate::provision::{provision, stage_sources, ProvisionedEnvironment};
use crate::shell_integration::{ensure_rc_sourced, write_activation, ActivationBlock};
use crate::validate::{validate, ValidationResult};
use crate::BootstrapError;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// What a successful run did.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub plan: InstallPlan,
    pub environment: ProvisionedEnvironment,
    pub manifest: ManifestSelection,
    /// Entry points linked into the target `bin/`.
    pub entry_points: Vec<PathBuf>,
    /// Login profile changed to source the rc file, if any.
    pub login_profile: Option<PathBuf>,
    pub validation: ValidationResult,
}

/// A configured installer.
///
/// # Example
///
/// ```rust,no_run
/// use sct_bootstrap::{Bootstrap, BootstrapConfig, HostEnvironment, InstallRequest};
/// use std::time::Duration;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let config = BootstrapConfig::default();
///     let host = HostEnvironment::capture(Duration::from_secs(5)).await;
///     let mut request = InstallRequest::new("/home/me/spinalcordtoolbox");
///     request.assume_yes = true;
///
///     let result = Bootstrap::new(config, host)
///         .run(request, |state| println!("{}", state), async {
///             let _ = tokio::signal::ctrl_c().await;
///         })
///         .await;
///
///     match result {
///         Ok(summary) => println!("installed in {}", summary.plan.target_dir.display()),
///         Err(e) => eprintln!("{}\nTo fix: {}", e, e.fix_suggestion()),
///     }
/// }
/// ```
pub struct Bootstrap {
    config: BootstrapConfig,
    options: BootstrapOptions,
    host: HostEnvironment,
    prompter: Arc<dyn Prompter>,
    scratch_parent: Option<PathBuf>,
}

impl Bootstrap {
    /// An installer prompting on the terminal, with time limits taken from
    /// the configuration.
    pub fn new(config: BootstrapConfig, host: HostEnvironment) -> Self {
        Self {
            options: config.options(),
            config,
            host,
            prompter: Arc::new(TerminalPrompter),
            scratch_parent: None,
        }
    }

    /// Use another prompter for interactive runs.
    pub fn with_prompter(mut self, prompter: Arc<dyn Prompter>) -> Self {
        self.prompter = prompter;
        self
    }

    pub fn with_options(mut self, options: BootstrapOptions) -> Self {
        self.options = options;
        self
    }

    /// Create the scratch directory under `dir` instead of the system
    /// temporary directory.
    pub fn with_scratch_parent(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_parent = Some(dir.into());
        self
    }

    /// Run every stage, stopping at the first failure.
    ///
    /// `on_progress` sees each state in order, ending with
    /// [`RunState::Success`] or [`RunState::Failed`]. When `cancel`
    /// completes first, the running stage is dropped (its child process is
    /// killed) and the run fails with [`BootstrapError::UserAborted`].
    pub async fn run<F, C>(
        &self,
        request: InstallRequest,
        on_progress: F,
        cancel: C,
    ) -> Result<RunSummary, BootstrapError>
    where
        F: Fn(RunState) + Send + Sync,
        C: Future<Output = ()>,
    {
        let scratch = self.create_scratch()?;

        let outcome = tokio::select! {
            result = self.stages(request, scratch.path(), &on_progress) => result,
            _ = cancel => {
                warn!("interrupted, cleaning up");
                Err(BootstrapError::aborted())
            }
        };

        if let Err(e) = scratch.close() {
            warn!(error = %e, "could not remove scratch directory");
        }

        match &outcome {
            Ok(summary) => {
                info!(target = %summary.plan.target_dir.display(), "installation complete");
                on_progress(RunState::Success);
            }
            Err(e) => {
                error!(error = %e, "installation failed");
                on_progress(RunState::Failed);
            }
        }
        outcome
    }

    fn create_scratch(&self) -> Result<tempfile::TempDir, BootstrapError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("sct-bootstrap-");
        match &self.scratch_parent {
            Some(parent) => builder
                .tempdir_in(parent)
                .map_err(|e| BootstrapError::io("create scratch directory in", parent, e)),
            None => builder
                .tempdir()
                .map_err(|e| BootstrapError::io("create scratch directory in", std::env::temp_dir(), e)),
        }
    }

    async fn plan(
        &self,
        request: InstallRequest,
        on_progress: &(impl Fn(RunState) + Send + Sync),
    ) -> Result<InstallPlan, BootstrapError> {
        on_progress(RunState::Probing);
        let platform = probe(&self.host, &self.config.platform)?;
        info!(os = %platform.os_family, version = %platform.os_version, shell = %platform.shell.shell_name, "platform supported");

        on_progress(RunState::Planning);
        let prompter: Arc<dyn Prompter> = if request.is_interactive(&self.host, &self.config) {
            Arc::clone(&self.prompter)
        } else {
            Arc::new(DefaultAnswers)
        };
        let host = self.host.clone();
        let config = self.config.clone();

        // Prompts block; an interrupt must still win while one waits.
        tokio::task::spawn_blocking(move || resolve_plan(&request, platform, &host, &config, prompter.as_ref()))
            .await
            .map_err(|e| {
                if e.is_panic() {
                    std::panic::resume_unwind(e.into_panic());
                }
                BootstrapError::aborted()
            })?
    }

    async fn stages(
        &self,
        request: InstallRequest,
        scratch: &Path,
        on_progress: &(impl Fn(RunState) + Send + Sync),
    ) -> Result<RunSummary, BootstrapError> {
        let plan = self.plan(request, on_progress).await?;
        let ctx = RunContext::new(
            plan,
            self.config.clone(),
            self.options.clone(),
            self.host.clone(),
            scratch,
        );
        let fetcher = ctx.fetcher();

        on_progress(RunState::Provisioning);
        if ctx.plan.install_type == InstallType::Package {
            let cfg = &ctx.config;
            let skip = [
                ".git",
                cfg.runtime.subdir.as_str(),
                cfg.artifacts.bin_dir.as_str(),
                cfg.artifacts.data_dir.as_str(),
            ];
            stage_sources(&ctx.plan.source_dir, ctx.target(), &skip)?;
        }
        let environment = provision(&ctx, &fetcher).await?;

        on_progress(RunState::DependencyInstall);
        let manifest = select_manifest(ctx.target(), &ctx.config.dependencies)?;
        install_dependencies(&ctx, &environment, &manifest).await?;

        on_progress(RunState::ArtifactInstall);
        install_artifacts(ArtifactKind::Binaries, &ctx, &fetcher).await?;
        install_artifacts(ArtifactKind::Data, &ctx, &fetcher).await?;
        let entry_points = link_entry_points(
            &environment,
            &ctx.bin_dir(),
            &ctx.config.dependencies.entry_point_prefix,
        )?;

        let mut login_profile = None;
        if ctx.plan.update_shell {
            on_progress(RunState::ShellIntegration);
            let shell = &ctx.plan.platform.shell;
            write_activation(shell, &ActivationBlock::for_run(&ctx))?;
            if shell.is_bashrc() {
                if let Some(home) = ctx.host.home() {
                    login_profile = ensure_rc_sourced(&home, &shell.config_path)?;
                }
            }
        }

        on_progress(RunState::Validating);
        let validation = validate(&ctx, &environment).await?;

        Ok(RunSummary {
            plan: ctx.plan,
            environment,
            manifest,
            entry_points,
            login_profile,
            validation,
        })
    }
}
