//! End-to-end bootstrap runs against a sandboxed host.
//!
//! Download tools, the runtime installer and the package installer are
//! shell stand-ins (see `tests/fixtures/`), so these tests need no network.

mod common;

use common::{Sandbox, StateLog};
use sct_bootstrap::{BootstrapError, InstallType, Prompter, RunState};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

fn never() -> std::future::Pending<()> {
    std::future::pending()
}

/// Interactive answers: keeps the proposed directory, declines everything.
struct DeclineAll;

impl Prompter for DeclineAll {
    fn confirm(&self, _prompt: &str, _default: bool) -> Result<bool, BootstrapError> {
        Ok(false)
    }

    fn directory(&self, _prompt: &str, default: &Path) -> Result<PathBuf, BootstrapError> {
        Ok(default.to_path_buf())
    }
}

#[tokio::test]
async fn test_package_install_end_to_end() {
    let sb = Sandbox::new();
    let log = StateLog::default();

    let summary = sb
        .bootstrap(sb.host(&[]))
        .run(sb.request(), log.recorder(), never())
        .await
        .unwrap();

    assert_eq!(
        log.states(),
        vec![
            RunState::Probing,
            RunState::Planning,
            RunState::Provisioning,
            RunState::DependencyInstall,
            RunState::ArtifactInstall,
            RunState::ShellIntegration,
            RunState::Validating,
            RunState::Success,
        ]
    );
    assert_eq!(summary.plan.install_type, InstallType::Package);
    assert!(summary.manifest.is_frozen());
    assert!(summary.validation.ok);
    assert!(summary.validation.details.contains("sct_check_dependencies ok"));

    // Sources staged without VCS metadata.
    assert!(sb.target.join("setup.py").is_file());
    assert!(sb.target.join("spinalcordtoolbox/scripts/sct_deepseg.py").is_file());
    assert!(!sb.target.join(".git").exists());

    // Binaries, entry points and data.
    assert!(sb.target.join("bin/isct_propseg").is_file());
    assert!(fs::symlink_metadata(sb.target.join("bin/sct_deepseg"))
        .unwrap()
        .file_type()
        .is_symlink());
    assert!(summary.entry_points.contains(&sb.target.join("bin/sct_check_dependencies")));
    assert!(sb.target.join("data/PAM50/template/PAM50_t2.nii.gz").is_file());
    assert!(sb.target.join("data/deepseg_sc_models/model.h5").is_file());

    // Shell integration.
    let bashrc = fs::read_to_string(sb.home.join(".bashrc")).unwrap();
    assert!(bashrc.contains(&format!("export SCT_DIR=\"{}\"", sb.target.display())));
    assert!(bashrc.contains(&format!("export PATH=\"{}:$PATH\"", sb.target.join("bin").display())));
    assert!(bashrc.contains("export MPLBACKEND=\"Agg\""));
    assert_eq!(summary.login_profile, Some(sb.home.join(".bash_profile")));

    // Frozen manifest, correction, then the editable install.
    let pip = sb.pip_log();
    let steps: Vec<&str> = pip.lines().collect();
    assert_eq!(steps.len(), 4);
    assert!(steps[0].ends_with("requirements-freeze.txt"));
    assert_eq!(steps[3], format!("-m pip install -e {}", sb.target.display()));

    assert!(sb.temp_root_is_empty());
}

#[tokio::test]
async fn test_no_download_tool_fails_before_later_stages() {
    let sb = Sandbox::new();
    let empty = sb.temp_root.parent().unwrap().join("empty-bin");
    fs::create_dir_all(&empty).unwrap();
    let path = empty.display().to_string();
    let host = sb.host(&[("PATH", path.as_str())]);
    let log = StateLog::default();

    let err = sb
        .bootstrap(host)
        .run(sb.request(), log.recorder(), never())
        .await
        .unwrap_err();

    match &err {
        BootstrapError::Download { url, fix, .. } => {
            assert!(url.ends_with("Miniforge3.sh"));
            assert!(fix.contains("curl"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.exit_code(), 1);
    assert_eq!(
        log.states(),
        vec![
            RunState::Probing,
            RunState::Planning,
            RunState::Provisioning,
            RunState::Failed,
        ]
    );
    assert!(!sb.target.join("python").exists());
    assert!(!sb.home.join(".bashrc").exists());
    assert!(sb.temp_root_is_empty());
}

#[tokio::test]
async fn test_interrupt_during_provisioning_cleans_up() {
    let sb = Sandbox::new();
    let host = sb.host(&[("FAKE_INSTALLER_SLEEP", "30")]);
    let log = StateLog::default();
    let provisioning = Arc::new(Notify::new());

    let recorder = log.recorder();
    let notify = Arc::clone(&provisioning);
    let on_progress = move |state: RunState| {
        if state == RunState::Provisioning {
            notify.notify_one();
        }
        recorder(state);
    };
    let cancel = async {
        provisioning.notified().await;
        // Let the runtime installer start.
        tokio::time::sleep(Duration::from_millis(500)).await;
    };

    let started = Instant::now();
    let err = sb
        .bootstrap(host)
        .run(sb.request(), on_progress, cancel)
        .await
        .unwrap_err();

    assert!(err.is_user_abort());
    assert_eq!(err.exit_code(), 1);
    assert!(started.elapsed() < Duration::from_secs(20));
    assert_eq!(log.states().last(), Some(&RunState::Failed));
    assert!(!log.states().contains(&RunState::DependencyInstall));
    assert!(sb.temp_root_is_empty());
}

#[tokio::test]
async fn test_installer_killed_by_interrupt_is_a_user_abort() {
    let sb = Sandbox::new();
    let host = sb.host(&[("FAKE_INSTALLER_SIGINT", "1")]);
    let log = StateLog::default();

    let err = sb
        .bootstrap(host)
        .run(sb.request(), log.recorder(), never())
        .await
        .unwrap_err();

    assert!(err.is_user_abort(), "unexpected error: {:?}", err);
    assert_eq!(err.exit_code(), 1);
    assert_eq!(log.states().last(), Some(&RunState::Failed));
    assert!(!log.states().contains(&RunState::DependencyInstall));
    assert!(sb.temp_root_is_empty());
}

#[tokio::test]
async fn test_second_run_recreates_runtime_and_keeps_rc_clean() {
    let sb = Sandbox::new();
    let bootstrap = sb.bootstrap(sb.host(&[]));

    bootstrap.run(sb.request(), |_| {}, never()).await.unwrap();
    fs::write(sb.target.join("python/leftover"), "x").unwrap();
    bootstrap.run(sb.request(), |_| {}, never()).await.unwrap();

    assert!(!sb.target.join("python/leftover").exists());
    assert!(sb.target.join("python/envs/venv_sct/bin/python").is_file());

    let bashrc = fs::read_to_string(sb.home.join(".bashrc")).unwrap();
    assert_eq!(bashrc.matches("# >>> Spinal Cord Toolbox >>>").count(), 1);
    let profile = fs::read_to_string(sb.home.join(".bash_profile")).unwrap();
    assert_eq!(profile.matches(". ~/.bashrc").count(), 1);
}

#[tokio::test]
async fn test_floating_manifest_when_no_frozen() {
    let sb = Sandbox::new();
    fs::remove_file(sb.source.join("requirements-freeze.txt")).unwrap();

    let summary = sb
        .bootstrap(sb.host(&[]))
        .run(sb.request(), |_| {}, never())
        .await
        .unwrap();

    assert!(!summary.manifest.is_frozen());
    let pip = sb.pip_log();
    assert!(pip.lines().next().unwrap().ends_with("requirements.txt"));
}

#[tokio::test]
async fn test_in_place_skip_flags_and_declined_shell_update() {
    let sb = Sandbox::new();
    fs::create_dir_all(sb.source.join("data/PAM50")).unwrap();
    fs::write(sb.source.join("data/PAM50/mine.nii.gz"), "keep").unwrap();
    let log = StateLog::default();

    let mut request = sb.request();
    request.assume_yes = false;
    request.in_place = true;
    request.skip_data = true;
    request.skip_binaries = true;

    let summary = sb
        .bootstrap(sb.host(&[]))
        .with_prompter(Arc::new(DeclineAll))
        .run(request, log.recorder(), never())
        .await
        .unwrap();

    assert_eq!(summary.plan.install_type, InstallType::InPlace);
    assert!(!summary.plan.update_shell);
    assert!(!log.states().contains(&RunState::ShellIntegration));
    assert!(!sb.home.join(".bashrc").exists());
    assert!(!sb.home.join(".bash_profile").exists());

    assert_eq!(
        fs::read_to_string(sb.source.join("data/PAM50/mine.nii.gz")).unwrap(),
        "keep"
    );
    assert!(!sb.source.join("bin/isct_propseg").exists());
    assert!(sb.source.join("bin/sct_deepseg").exists());
    let fetched = sb.fetched();
    assert_eq!(fetched.len(), 1);
    assert!(fetched[0].ends_with("Miniforge3.sh"));
}

#[tokio::test]
async fn test_non_interactive_variable_skips_prompts() {
    let sb = Sandbox::new();
    let mut request = sb.request();
    request.assume_yes = false;

    let summary = sb
        .bootstrap(sb.host(&[("SCT_INSTALL_INTERACTIVE", "no")]))
        .with_prompter(Arc::new(DeclineAll))
        .run(request, |_| {}, never())
        .await
        .unwrap();

    assert!(!summary.plan.interactive);
    assert!(summary.plan.update_shell);
}

#[tokio::test]
async fn test_declined_overwrite_aborts_without_changes() {
    let sb = Sandbox::new();
    fs::create_dir_all(&sb.target).unwrap();
    fs::write(sb.target.join("notes.txt"), "mine").unwrap();
    let mut request = sb.request();
    request.assume_yes = false;

    let err = sb
        .bootstrap(sb.host(&[]))
        .with_prompter(Arc::new(DeclineAll))
        .run(request, |_| {}, never())
        .await
        .unwrap_err();

    assert!(err.is_user_abort());
    let entries: Vec<_> = fs::read_dir(&sb.target).unwrap().collect();
    assert_eq!(entries.len(), 1);
    assert!(sb.fetched().is_empty());
}

#[tokio::test]
async fn test_failing_validation_is_reported() {
    let sb = Sandbox::new();

    let err = sb
        .bootstrap(sb.host(&[("FAKE_CHECK_EXIT", "3")]))
        .run(sb.request(), |_| {}, never())
        .await
        .unwrap_err();

    match err {
        BootstrapError::Validation { exit_code, details, .. } => {
            assert_eq!(exit_code, Some(3));
            assert!(details.contains("sct_check_dependencies ok"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(sb.temp_root_is_empty());
}

#[tokio::test]
async fn test_unsupported_platform_stops_at_probe() {
    let sb = Sandbox::new();
    let host = sct_bootstrap::HostEnvironment::new("macos", Some("10.12.6".to_string()), sb.host_vars(&[]));
    let log = StateLog::default();

    let err = sb
        .bootstrap(host)
        .run(sb.request(), log.recorder(), never())
        .await
        .unwrap_err();

    assert!(matches!(err, BootstrapError::UnsupportedPlatform { .. }));
    assert_eq!(log.states(), vec![RunState::Probing, RunState::Failed]);
    assert!(!sb.target.exists());
}

#[tokio::test]
async fn test_tcsh_gets_cshell_block_without_login_profile() {
    let sb = Sandbox::new();

    let summary = sb
        .bootstrap(sb.host(&[("SHELL", "/bin/tcsh")]))
        .run(sb.request(), |_| {}, never())
        .await
        .unwrap();

    let rc = fs::read_to_string(sb.home.join(".tcshrc")).unwrap();
    assert!(rc.contains(&format!("setenv SCT_DIR \"{}\"", sb.target.display())));
    assert_eq!(summary.login_profile, None);
    assert!(!sb.home.join(".bash_profile").exists());
}

#[test]
fn test_help_exits_with_usage_code() {
    let home = tempfile::tempdir().unwrap();
    for args in [&["-h"][..], &["-x"][..], &["-y", "--help"][..]] {
        let output = std::process::Command::new(env!("CARGO_BIN_EXE_install-sct"))
            .args(args)
            .env("HOME", home.path())
            .output()
            .unwrap();

        assert_eq!(output.status.code(), Some(99), "args {:?}", args);
        assert!(String::from_utf8_lossy(&output.stdout).contains("Usage"));
    }
    assert!(fs::read_dir(home.path()).unwrap().next().is_none());
}

#[test]
fn test_io_error_names_the_path() {
    let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err = BootstrapError::io("read", "/opt/sct", source);

    assert!(matches!(err, BootstrapError::Io { .. }));
    assert!(err.fix_suggestion().contains("/opt/sct"));
    assert_eq!(err.exit_code(), 1);
}
