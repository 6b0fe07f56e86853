//! Fixtures shared by unit tests: a sandbox with fake download tools, a
//! fake runtime installer and local bundles served over `file://`.

use crate::config::{BootstrapConfig, DataBundle, OsUrls};
use crate::context::RunContext;
use crate::options::BootstrapOptions;
use crate::plan::{InstallPlan, InstallType};
use crate::platform::{probe, HostEnvironment};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

#[path = "../tests/common/fixtures.rs"]
mod fixtures;

pub(crate) use fixtures::{make_tar_gz, write_executable};

const FETCH_TOOL: &str = include_str!("../tests/fixtures/fetch_tool.sh");
const RUNTIME_INSTALLER: &str = include_str!("../tests/fixtures/runtime_installer.sh");

fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}

/// A throwaway host with everything a run needs.
pub(crate) struct Sandbox {
    _root: TempDir,
    pub home: PathBuf,
    pub tools: PathBuf,
    pub remote: PathBuf,
    pub source: PathBuf,
    pub target: PathBuf,
    pub scratch: PathBuf,
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
        let source = base.join("src/sct");
        let scratch = base.join("scratch");
        for dir in [&home, &tools, &remote, &source, &scratch] {
            fs::create_dir_all(dir).unwrap();
        }

        write_executable(&tools.join("curl"), FETCH_TOOL);
        write_executable(&remote.join("runtime_installer.sh"), RUNTIME_INSTALLER);
        make_tar_gz(
            &remote.join("binaries.tar.gz"),
            &[("bin/isct_propseg", "#!/bin/sh\n"), ("bin/isct_dice", "#!/bin/sh\n")],
        );
        make_tar_gz(
            &remote.join("PAM50.tar.gz"),
            &[("PAM50-r20230222/template/PAM50_t2.nii.gz", "t2")],
        );
        make_tar_gz(
            &remote.join("gm_model.tar.gz"),
            &[("gm_model-r20180926/model.h5", "gm")],
        );

        fs::write(source.join("requirements-freeze.txt"), "numpy==1.26.4\n").unwrap();
        fs::write(source.join("requirements.txt"), "numpy\n").unwrap();
        fs::write(source.join("setup.py"), "from setuptools import setup\n").unwrap();
        fs::create_dir_all(source.join("spinalcordtoolbox")).unwrap();
        fs::write(source.join("spinalcordtoolbox/__init__.py"), "").unwrap();
        fs::create_dir_all(source.join(".git")).unwrap();
        fs::write(source.join(".git/HEAD"), "ref: refs/heads/master\n").unwrap();

        let installer = file_url(&remote.join("runtime_installer.sh"));
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
            DataBundle::new("gm_model", &file_url(&remote.join("gm_model.tar.gz"))),
        ];

        Self {
            target: base.join("install/sct_6.5"),
            fetch_log: base.join("fetch.log"),
            _root: root,
            home,
            tools,
            remote,
            source,
            scratch,
            config,
        }
    }

    pub fn host(&self, extra: &[(&str, &str)]) -> HostEnvironment {
        let mut vars = vec![
            ("SHELL".to_string(), "/bin/bash".to_string()),
            ("HOME".to_string(), self.home.display().to_string()),
            ("PATH".to_string(), format!("{}:/usr/bin:/bin", self.tools.display())),
            ("FETCH_LOG".to_string(), self.fetch_log.display().to_string()),
        ];
        vars.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        HostEnvironment::new("linux", Some("6.1.0".to_string()), vars)
    }

    /// Context for a package install into `self.target`.
    pub fn context(&self) -> RunContext {
        self.context_with(self.host(&[]), |_| {})
    }

    pub fn context_with(&self, host: HostEnvironment, edit: impl FnOnce(&mut InstallPlan)) -> RunContext {
        let platform = probe(&host, &self.config.platform).unwrap();
        let mut plan = InstallPlan {
            install_type: InstallType::Package,
            source_dir: self.source.clone(),
            target_dir: self.target.clone(),
            interactive: false,
            skip_data: false,
            skip_binaries: false,
            update_shell: true,
            platform,
        };
        edit(&mut plan);
        let options = BootstrapOptions {
            download_timeout: Duration::from_secs(30),
            command_timeout: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(5),
        };
        RunContext::new(plan, self.config.clone(), options, host, &self.scratch)
    }

    /// URLs fetched so far, in order.
    pub fn fetched(&self) -> Vec<String> {
        fs::read_to_string(&self.fetch_log)
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}
