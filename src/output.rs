//! What the installer prints: numbered stage headers, the closing summary
//! and failure reports with a fix.

use console::style;
use sct_bootstrap::{BootstrapConfig, BootstrapError, RunState, RunSummary};

/// Stages announced with a step counter, in run order.
const STAGES: [RunState; 7] = [
    RunState::Probing,
    RunState::Planning,
    RunState::Provisioning,
    RunState::DependencyInstall,
    RunState::ArtifactInstall,
    RunState::ShellIntegration,
    RunState::Validating,
];

pub fn error(msg: &str) {
    eprintln!("{} {}", style("✗").red().bold(), msg);
}

fn detail(key: &str, value: &str) {
    println!("  {}: {}", style(key).dim(), value);
}

fn error_detail(key: &str, value: &str) {
    eprintln!("  {}: {}", style(key).dim(), value);
}

pub fn banner(toolbox: &str) {
    println!("\n{}", style(format!("{} installer", toolbox)).bold().underlined());
}

/// `[n/7]` for a running stage, `None` for the end states.
fn step_label(state: RunState) -> Option<String> {
    STAGES
        .iter()
        .position(|s| *s == state)
        .map(|i| format!("[{}/{}]", i + 1, STAGES.len()))
}

/// Progress callback: one line per stage. End states are reported by
/// [`summary`] or [`failure`].
pub fn stage(state: RunState) {
    if let Some(label) = step_label(state) {
        println!("\n{} {}", style(label).cyan(), style(state.description()).bold());
    }
}

pub fn summary(summary: &RunSummary, config: &BootstrapConfig) {
    let plan = &summary.plan;
    println!();
    println!(
        "{} {} is installed",
        style("✓").green().bold(),
        config.toolbox.name
    );
    detail("Location", &plan.target_dir.display().to_string());
    detail("Environment", &summary.environment.prefix.display().to_string());
    detail("Dependencies from", &summary.manifest.path().display().to_string());
    if let Some(profile) = &summary.login_profile {
        detail("Login profile updated", &profile.display().to_string());
    }

    let next = if plan.update_shell {
        format!(
            "Open a new terminal, or run: source {}",
            plan.platform.shell.config_path.display()
        )
    } else {
        format!(
            "Your shell was not modified. Add {} to your PATH to use the toolbox",
            plan.target_dir.join(&config.artifacts.bin_dir).display()
        )
    };
    println!("{} {}", style("ℹ").blue().bold(), next);
}

/// Report a failed run. A user abort gets a single warning line.
pub fn failure(error: &BootstrapError, config: &BootstrapConfig) {
    eprintln!();
    if error.is_user_abort() {
        eprintln!("{} {}", style("⚠").yellow().bold(), error);
        return;
    }

    self::error(&format!("Installation failed: {}", error));
    match error {
        BootstrapError::Provision { stderr: Some(stderr), .. }
        | BootstrapError::DependencyInstall { stderr: Some(stderr), .. } => {
            eprintln!("{}", stderr.trim_end());
        }
        BootstrapError::Validation { details, .. } if !details.is_empty() => {
            eprintln!("{}", details);
        }
        _ => {}
    }
    error_detail("To fix", error.fix_suggestion());
    error_detail(
        "Still stuck?",
        &format!(
            "send the full output of this installer to {}",
            config.toolbox.issues_url
        ),
    );
}
