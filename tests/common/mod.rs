//! Shared fixtures: a sandboxed host whose download tools, runtime installer
//! and package installer are shell stand-ins serving local files.

#![allow(dead_code)]

mod fixtures;

pub use fixtures::{make_tar_gz, write_executable};

use sct_bootstrap::config::{DataBundle, OsUrls};
use sct_bootstrap::{Bootstrap, BootstrapConfig, BootstrapOptions, HostEnvironment, InstallRequest, RunState};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

const FETCH_TOOL: &str = include_str!("../fixtures/fetch_tool.sh");
const RUNTIME_INSTALLER: &str = include_str!("../fixtures/runtime_installer.sh");

fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}

/// Collects reported states.
#[derive(Clone, Default)]
pub struct StateLog(Arc<Mutex<Vec<RunState>>>);

impl StateLog {
    pub fn recorder(&self) -> impl Fn(RunState) + Send + Sync {
        let states = Arc::clone(&self.0);
        move |state| states.lock().unwrap().push(state)
    }

    pub fn states(&self) -> Vec<RunState> {
        self.0.lock().unwrap().clone()
    }
}

pub struct Sandbox {
    _root: TempDir,
    pub home: PathBuf,
    pub tools: PathBuf,
    pub remote: PathBuf,
    pub source: PathBuf,
    pub target: PathBuf,
    pub temp_root: PathBuf,
    pub fetch_log: PathBuf,
    pub config: BootstrapConfig,
}

impl Sandbox {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let base = root.path().to_path_buf();
        let home = base.join("home");
        let tools = base.join("tools");
        let remote = base.join("remote");
        let source = base.join("src/spinalcordtoolbox");
        let temp_root = base.join("tmp");
        for dir in [&home, &tools, &remote, &source, &temp_root] {
            fs::create_dir_all(dir).unwrap();
        }

        write_executable(&tools.join("curl"), FETCH_TOOL);
        write_executable(&tools.join("wget"), FETCH_TOOL);
        write_executable(&remote.join("Miniforge3.sh"), RUNTIME_INSTALLER);
        make_tar_gz(
            &remote.join("binaries.tar.gz"),
            &[("bin/isct_propseg", "#!/bin/sh\n"), ("bin/isct_spinalcordtoolbox", "#!/bin/sh\n")],
        );
        make_tar_gz(
            &remote.join("PAM50.tar.gz"),
            &[
                ("PAM50-r20230222/template/PAM50_t2.nii.gz", "t2"),
                ("PAM50-r20230222/atlas/info_label.txt", "labels"),
            ],
        );
        make_tar_gz(
            &remote.join("deepseg_sc_models.tar.gz"),
            &[("deepseg_sc_models-r20180610/model.h5", "weights")],
        );

        fs::write(source.join("requirements-freeze.txt"), "numpy==1.26.4\nnibabel==5.2.1\n").unwrap();
        fs::write(source.join("requirements.txt"), "numpy\nnibabel\n").unwrap();
        fs::write(source.join("setup.py"), "from setuptools import setup\nsetup()\n").unwrap();
        fs::create_dir_all(source.join("spinalcordtoolbox/scripts")).unwrap();
        fs::write(source.join("spinalcordtoolbox/__init__.py"), "").unwrap();
        fs::write(source.join("spinalcordtoolbox/scripts/sct_deepseg.py"), "").unwrap();
        fs::create_dir_all(source.join(".git")).unwrap();
        fs::write(source.join(".git/HEAD"), "ref: refs/heads/master\n").unwrap();

        let installer = file_url(&remote.join("Miniforge3.sh"));
        let binaries = file_url(&remote.join("binaries.tar.gz"));
        let mut config = BootstrapConfig::default();
        config.runtime.installer = OsUrls {
            linux: installer.clone(),
            macos: installer,
        };
        config.artifacts.binaries = OsUrls {
            linux: binaries.clone(),
            macos: binaries,
        };
        config.artifacts.data = vec![
            DataBundle::new("PAM50", &file_url(&remote.join("PAM50.tar.gz"))),
            DataBundle::new("deepseg_sc_models", &file_url(&remote.join("deepseg_sc_models.tar.gz"))),
        ];

        Self {
            target: base.join("opt/sct_6.5"),
            fetch_log: base.join("fetch.log"),
            _root: root,
            home,
            tools,
            remote,
            source,
            temp_root,
            config,
        }
    }

    /// Host variables for a Linux box running bash; `extra` overrides.
    pub fn host_vars(&self, extra: &[(&str, &str)]) -> Vec<(String, String)> {
        let mut vars = vec![
            ("SHELL".to_string(), "/bin/bash".to_string()),
            ("HOME".to_string(), self.home.display().to_string()),
            ("PATH".to_string(), format!("{}:/usr/bin:/bin", self.tools.display())),
            ("FETCH_LOG".to_string(), self.fetch_log.display().to_string()),
        ];
        for (key, value) in extra {
            vars.retain(|(k, _)| k != key);
            vars.push((key.to_string(), value.to_string()));
        }
        vars
    }

    pub fn host(&self, extra: &[(&str, &str)]) -> HostEnvironment {
        HostEnvironment::new("linux", Some("5.15.0-105-generic".to_string()), self.host_vars(extra))
    }

    pub fn bootstrap(&self, host: HostEnvironment) -> Bootstrap {
        Bootstrap::new(self.config.clone(), host)
            .with_options(BootstrapOptions {
                download_timeout: Duration::from_secs(30),
                command_timeout: Duration::from_secs(30),
                probe_timeout: Duration::from_secs(5),
            })
            .with_scratch_parent(&self.temp_root)
    }

    /// Non-interactive package install into `self.target`.
    pub fn request(&self) -> InstallRequest {
        let mut request = InstallRequest::new(&self.source);
        request.target_dir = Some(self.target.clone());
        request.assume_yes = true;
        request
    }

    pub fn fetched(&self) -> Vec<String> {
        fs::read_to_string(&self.fetch_log)
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn pip_log(&self) -> String {
        fs::read_to_string(self.target.join("python/envs/venv_sct/pip.log")).unwrap_or_default()
    }

    pub fn temp_root_is_empty(&self) -> bool {
        fs::read_dir(&self.temp_root).unwrap().next().is_none()
    }
}
