//! Post-install self-check.

use crate::context::RunContext;
use crate::process::{self, CommandFailure};
use crate::provision::ProvisionedEnvironment;
use crate::BootstrapError;
use tracing::info;

/// Outcome of a successful validation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub ok: bool,
    /// Combined output of the validation command.
    pub details: String,
}

fn combined(stdout: &str, stderr: &str) -> String {
    let mut details = stdout.trim_end().to_string();
    if !stderr.trim().is_empty() {
        if !details.is_empty() {
            details.push('\n');
        }
        details.push_str(stderr.trim_end());
    }
    details
}

/// Run the validation command the way a freshly activated shell would:
/// the target `bin/` and the environment's `bin/` ahead of the host `PATH`,
/// with the activation variables set.
pub async fn validate(ctx: &RunContext, env: &ProvisionedEnvironment) -> Result<ValidationResult, BootstrapError> {
    let cfg = &ctx.config.validation;
    let mut dirs = vec![ctx.bin_dir()];
    dirs.extend(env.search_dirs());
    let path = ctx.activated_path(&dirs);

    let program = which::which_in(&cfg.command, Some(&path), ctx.scratch()).map_err(|_| {
        BootstrapError::Validation {
            command: cfg.command.clone(),
            exit_code: None,
            details: format!("{} not found on {}", cfg.command, path),
            fix: "The toolbox entry points were not installed; check the dependency installation output".to_string(),
        }
    })?;

    let cmd = ctx
        .command(program)
        .args(cfg.args.iter().cloned())
        .envs(ctx.activation_vars())
        .env("PATH", path)
        .current_dir(ctx.target());

    info!(command = %cmd.display(), "validating installation");
    match process::run(&cmd, ctx.options.command_timeout).await {
        Ok(output) => Ok(ValidationResult {
            ok: true,
            details: combined(&output.stdout, &output.stderr),
        }),
        Err(CommandFailure::Timeout { duration, .. }) => Err(BootstrapError::Timeout {
            step: cfg.command.clone(),
            duration,
            fix: "Run the validation command by hand to see where it hangs".to_string(),
        }),
        Err(CommandFailure::Interrupted { .. }) => Err(BootstrapError::aborted()),
        Err(CommandFailure::Exit { code, stdout, stderr, .. }) => Err(BootstrapError::Validation {
            command: cmd.display(),
            exit_code: code,
            details: combined(&stdout, &stderr),
            fix: "Read the check output above; it names the missing or broken dependency".to_string(),
        }),
        Err(failure @ CommandFailure::Spawn { .. }) => Err(BootstrapError::Validation {
            command: cmd.display(),
            exit_code: None,
            details: failure.to_string(),
            fix: "Check that the validation command is executable".to_string(),
        }),
    }
}
