//! Host probing.
//!
//! The host is captured once into a [`HostEnvironment`] snapshot; [`probe`]
//! turns that snapshot into a [`PlatformInfo`] or rejects the host. Later
//! stages read environment variables from the run context, never from the
//! installer's own process.

mod os;
mod shell;
mod version;

pub use os::OsFamily;
pub use shell::{ActivationRenderer, ShellDialect, ShellProfile};

pub(crate) use version::parse_version;

use crate::config::PlatformConfig;
use crate::BootstrapError;
use semver::Version;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Locale forced into child processes on families that need it.
const LOCALE_GUARD: &str = "en_US.UTF-8";

/// Snapshot of the host the installer runs on.
#[derive(Debug, Clone)]
pub struct HostEnvironment {
    os: String,
    os_version: Option<String>,
    vars: BTreeMap<String, String>,
}

impl HostEnvironment {
    /// Build a snapshot from explicit values.
    ///
    /// # Example
    ///
    /// ```rust
    /// use sct_bootstrap::HostEnvironment;
    ///
    /// let host = HostEnvironment::new(
    ///     "linux",
    ///     Some("6.8.0-45-generic".to_string()),
    ///     [("SHELL", "/bin/bash"), ("HOME", "/home/u")],
    /// );
    /// assert_eq!(host.var("SHELL"), Some("/bin/bash"));
    /// ```
    pub fn new<I, K, V>(os: &str, os_version: Option<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            os: os.to_string(),
            os_version,
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Capture the current process's host: OS, OS version and environment.
    pub async fn capture(probe_timeout: Duration) -> Self {
        let os = std::env::consts::OS;
        let os_version = read_os_version(os, probe_timeout).await;
        debug!(os, ?os_version, "captured host");
        Self::new(os, os_version, std::env::vars())
    }

    pub fn os(&self) -> &str {
        &self.os
    }

    pub fn os_version(&self) -> Option<&str> {
        self.os_version.as_deref()
    }

    /// Value of an environment variable, if set and non-empty.
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn home(&self) -> Option<PathBuf> {
        self.var("HOME").map(PathBuf::from)
    }

    /// All captured variables.
    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }
}

/// Read the OS release: kernel release on Linux, product version on macOS.
async fn read_os_version(os: &str, probe_timeout: Duration) -> Option<String> {
    match os {
        "linux" => std::fs::read_to_string("/proc/sys/kernel/osrelease")
            .ok()
            .map(|s| s.trim().to_string()),
        "macos" => {
            let mut cmd = Command::new("sw_vers");
            cmd.arg("-productVersion").kill_on_drop(true);
            match timeout(probe_timeout, cmd.output()).await {
                Ok(Ok(output)) if output.status.success() => {
                    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
                }
                _ => {
                    warn!("sw_vers did not report a product version");
                    None
                }
            }
        }
        _ => None,
    }
}

/// What the probe found out about the host.
#[derive(Debug, Clone)]
pub struct PlatformInfo {
    pub os_family: OsFamily,
    pub os_version: Version,
    pub shell: ShellProfile,
    /// Variables every child process must see (locale guard).
    pub env_overrides: Vec<(String, String)>,
}

/// Probe the host.
///
/// Fails with [`BootstrapError::UnsupportedPlatform`] when the OS is not
/// Linux or macOS or is older than the configured minimum, and with
/// [`BootstrapError::ShellDetection`] when the shell is unknown.
pub fn probe(host: &HostEnvironment, cfg: &PlatformConfig) -> Result<PlatformInfo, BootstrapError> {
    let raw_version = host.os_version().unwrap_or_default().to_string();

    let os_family = OsFamily::from_os_name(host.os()).ok_or_else(|| {
        BootstrapError::UnsupportedPlatform {
            os: host.os().to_string(),
            version: raw_version.clone(),
            fix: "Use Linux or macOS (on Windows, install inside WSL)".to_string(),
        }
    })?;

    let minimum = parse_version(cfg.min_version(os_family)).ok_or_else(|| BootstrapError::Config {
        message: format!(
            "invalid minimum version '{}' for {}",
            cfg.min_version(os_family),
            os_family
        ),
        fix: "Use a major.minor version in the [platform] section".to_string(),
    })?;

    let os_version = match parse_version(&raw_version) {
        Some(v) if v >= minimum => v,
        _ => {
            return Err(BootstrapError::UnsupportedPlatform {
                os: os_family.display_name().to_string(),
                version: raw_version,
                fix: format!(
                    "{} {} or later is required",
                    os_family.display_name(),
                    cfg.min_version(os_family)
                ),
            })
        }
    };

    let home = host.home().ok_or_else(|| BootstrapError::ShellDetection {
        shell: host.var("SHELL").unwrap_or_default().to_string(),
        fix: "Set HOME so the shell configuration file can be located".to_string(),
    })?;
    let shell = shell::detect_shell(host.var("SHELL"), &home)?;

    let env_overrides = if os_family.needs_locale_guard() {
        vec![
            ("LC_ALL".to_string(), LOCALE_GUARD.to_string()),
            ("LANG".to_string(), LOCALE_GUARD.to_string()),
        ]
    } else {
        Vec::new()
    };

    debug!(%os_family, %os_version, shell = %shell.shell_name, "probe succeeded");
    Ok(PlatformInfo {
        os_family,
        os_version,
        shell,
        env_overrides,
    })
}
