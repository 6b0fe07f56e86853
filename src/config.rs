//! Bootstrap configuration.
//!
//! Defaults describe the Spinal Cord Toolbox. A TOML file passed with
//! `--config` can override any subset of the sections below; missing keys
//! keep their defaults.

use crate::platform::OsFamily;
use crate::{BootstrapError, BootstrapOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub toolbox: ToolboxConfig,
    pub platform: PlatformConfig,
    pub runtime: RuntimeConfig,
    pub dependencies: DependencyConfig,
    pub artifacts: ArtifactConfig,
    pub shell: ShellConfig,
    pub validation: ValidationConfig,
    pub timeouts: TimeoutConfig,
}

impl BootstrapConfig {
    /// Load a configuration file, filling unspecified keys with defaults.
    pub fn from_file(path: &Path) -> Result<Self, BootstrapError> {
        let text = std::fs::read_to_string(path).map_err(|e| BootstrapError::Config {
            message: format!("cannot read {}: {}", path.display(), e),
            fix: "Check the path given to --config".to_string(),
        })?;
        Self::from_toml(&text)
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, BootstrapError> {
        toml::from_str(text).map_err(|e| BootstrapError::Config {
            message: e.to_string(),
            fix: "Fix the TOML syntax or remove the offending key".to_string(),
        })
    }

    /// Time limits as run options.
    pub fn options(&self) -> BootstrapOptions {
        BootstrapOptions {
            download_timeout: Duration::from_secs(self.timeouts.download_secs),
            command_timeout: Duration::from_secs(self.timeouts.command_secs),
            probe_timeout: Duration::from_secs(self.timeouts.probe_secs),
        }
    }
}

/// Identity of the toolbox being installed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolboxConfig {
    /// Human-readable name used in messages and rc-file markers.
    pub name: String,
    /// Short name used for default directories and variables.
    pub short_name: String,
    /// Version, used for the default package install directory.
    pub version: String,
    /// Variable holding the install directory in the user's shell.
    pub home_var: String,
    /// Variable that, when set to `no`, `0` or `false`, forces non-interactive mode.
    pub interactive_var: String,
    /// Where users should report failed installs.
    pub issues_url: String,
}

impl Default for ToolboxConfig {
    fn default() -> Self {
        Self {
            name: "Spinal Cord Toolbox".to_string(),
            short_name: "sct".to_string(),
            version: "6.5".to_string(),
            home_var: "SCT_DIR".to_string(),
            interactive_var: "SCT_INSTALL_INTERACTIVE".to_string(),
            issues_url: "https://forum.spinalcordmri.org/c/sct".to_string(),
        }
    }
}

/// Minimum supported OS versions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Minimum Linux kernel release.
    pub linux_min_version: String,
    /// Minimum macOS product version.
    pub macos_min_version: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            linux_min_version: "3.10".to_string(),
            macos_min_version: "10.13".to_string(),
        }
    }
}

impl PlatformConfig {
    pub fn min_version(&self, family: OsFamily) -> &str {
        match family {
            OsFamily::Linux => &self.linux_min_version,
            OsFamily::MacOS => &self.macos_min_version,
        }
    }
}

/// A URL per supported OS family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsUrls {
    pub linux: String,
    pub macos: String,
}

impl OsUrls {
    pub fn for_family(&self, family: OsFamily) -> &str {
        match family {
            OsFamily::Linux => &self.linux,
            OsFamily::MacOS => &self.macos,
        }
    }
}

/// Interpreter distribution and isolated environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Directory under the target that holds the distribution.
    pub subdir: String,
    /// Name of the isolated environment.
    pub env_name: String,
    /// Interpreter minor version the environment is pinned to.
    pub python_version: String,
    /// Self-contained installer per OS family.
    pub installer: OsUrls,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            subdir: "python".to_string(),
            env_name: "venv_sct".to_string(),
            python_version: "3.9".to_string(),
            installer: OsUrls {
                linux: "https://github.com/conda-forge/miniforge/releases/download/24.3.0-0/Miniforge3-Linux-x86_64.sh".to_string(),
                macos: "https://github.com/conda-forge/miniforge/releases/download/24.3.0-0/Miniforge3-MacOSX-x86_64.sh".to_string(),
            },
        }
    }
}

/// Narrow fix for two conflicting transitive packages: remove both, then
/// reinstall the right one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostInstallCorrection {
    pub uninstall: Vec<String>,
    pub reinstall: String,
}

/// Dependency manifests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DependencyConfig {
    /// Pinned manifest shipped with releases.
    pub frozen_manifest: String,
    /// Loosely constrained manifest used by development checkouts.
    pub floating_manifest: String,
    pub correction: Option<PostInstallCorrection>,
    /// Entry points in the environment's `bin/` starting with this prefix
    /// are linked into the target `bin/` directory.
    pub entry_point_prefix: String,
}

impl Default for DependencyConfig {
    fn default() -> Self {
        Self {
            frozen_manifest: "requirements-freeze.txt".to_string(),
            floating_manifest: "requirements.txt".to_string(),
            correction: Some(PostInstallCorrection {
                uninstall: vec![
                    "opencv-python".to_string(),
                    "opencv-python-headless".to_string(),
                ],
                reinstall: "opencv-python-headless".to_string(),
            }),
            entry_point_prefix: "sct_".to_string(),
        }
    }
}

/// A named data bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataBundle {
    pub name: String,
    pub url: String,
}

impl DataBundle {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

/// Binaries and data bundles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    pub bin_dir: String,
    pub data_dir: String,
    pub binaries: OsUrls,
    /// Installed in this order.
    pub data: Vec<DataBundle>,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        const GH: &str = "https://github.com/spinalcordtoolbox";
        Self {
            bin_dir: "bin".to_string(),
            data_dir: "data".to_string(),
            binaries: OsUrls {
                linux: format!("{GH}/spinalcordtoolbox-binaries/releases/download/r20231004/binaries_linux.tar.gz"),
                macos: format!("{GH}/spinalcordtoolbox-binaries/releases/download/r20231004/binaries_osx.tar.gz"),
            },
            data: vec![
                DataBundle::new("PAM50", &format!("{GH}/PAM50/archive/refs/tags/r20230222.tar.gz")),
                DataBundle::new("gm_model", &format!("{GH}/gm_model/archive/refs/tags/r20180926.tar.gz")),
                DataBundle::new("optic_models", &format!("{GH}/optic_models/archive/refs/tags/r20170413.tar.gz")),
                DataBundle::new("pmj_models", &format!("{GH}/pmj_models/archive/refs/tags/r20210812.tar.gz")),
                DataBundle::new("deepseg_sc_models", &format!("{GH}/deepseg_sc_models/archive/refs/tags/r20180610.tar.gz")),
                DataBundle::new("deepseg_gm_models", &format!("{GH}/deepseg_gm_models/archive/refs/tags/r20180205.tar.gz")),
                DataBundle::new("deepseg_lesion_models", &format!("{GH}/deepseg_lesion_models/archive/refs/tags/r20180613.tar.gz")),
                DataBundle::new("c2c3_disc_models", &format!("{GH}/c2c3_disc_models/archive/refs/tags/r20190117.tar.gz")),
            ],
        }
    }
}

/// Shell activation block contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Variable selecting a headless plotting backend.
    pub plotting_backend_var: String,
    /// Used unless the host environment already sets the variable.
    pub plotting_backend: String,
    /// Variable written by older installers; lines assigning it are dropped.
    pub legacy_var: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            plotting_backend_var: "MPLBACKEND".to_string(),
            plotting_backend: "Agg".to_string(),
            legacy_var: "SPINALCORDTOOLBOX".to_string(),
        }
    }
}

/// Final self-check command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub command: String,
    pub args: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            command: "sct_check_dependencies".to_string(),
            args: vec![],
        }
    }
}

/// Time limits in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub download_secs: u64,
    pub command_secs: u64,
    pub probe_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        let defaults = BootstrapOptions::default();
        Self {
            download_secs: defaults.download_timeout.as_secs(),
            command_secs: defaults.command_timeout.as_secs(),
            probe_secs: defaults.probe_timeout.as_secs(),
        }
    }
}
