//! Artifact fetching.
//!
//! [`Fetcher::fetch`] tries each [`Transport`] in priority order and stops at
//! the first one that exists on the search path and completes. The
//! destination is either absent or fully written: data lands in a `.part`
//! file that is renamed only after the transport succeeds.

mod transport;

pub use transport::Transport;

use crate::process::{self, StructuredCommand};
use crate::BootstrapError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// One download: where from, where to, and how it went.
#[derive(Debug, Clone)]
pub struct DownloadTask {
    pub url: String,
    pub dest: PathBuf,
    /// One line per transport tried, in order.
    pub attempts: Vec<String>,
}

impl DownloadTask {
    fn new(url: &str, dest: &Path) -> Self {
        Self {
            url: url.to_string(),
            dest: dest.to_path_buf(),
            attempts: Vec::new(),
        }
    }

    fn partial_path(&self) -> PathBuf {
        let mut name = self
            .dest
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| OsString::from("download"));
        name.push(".part");
        self.dest.with_file_name(name)
    }
}

/// Downloads files with external transports.
#[derive(Debug, Clone)]
pub struct Fetcher {
    transports: Vec<Transport>,
    search_path: OsString,
    env_vars: Vec<(String, String)>,
    timeout: Duration,
}

impl Fetcher {
    /// A fetcher using every transport, resolving programs on `search_path`
    /// and running them with `env_vars`.
    pub fn new(search_path: OsString, env_vars: Vec<(String, String)>, timeout: Duration) -> Self {
        Self {
            transports: Transport::all().collect(),
            search_path,
            env_vars,
            timeout,
        }
    }

    /// Restrict or reorder the transports.
    pub fn with_transports(mut self, transports: Vec<Transport>) -> Self {
        self.transports = transports;
        self
    }

    /// Fetch `url` into `dest`.
    ///
    /// Fails with [`BootstrapError::Download`] once every transport is
    /// absent or has failed.
    pub async fn fetch(&self, url: &str, dest: &Path) -> Result<(), BootstrapError> {
        let mut task = DownloadTask::new(url, dest);
        let partial = task.partial_path();
        let cwd = dest.parent().unwrap_or_else(|| Path::new("/"));

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BootstrapError::io("create", parent, e))?;
        }

        info!(%url, dest = %dest.display(), "downloading");
        for transport in &self.transports {
            let Some(program) = transport.locate(&self.search_path, cwd) else {
                debug!(%transport, "transport not available");
                task.attempts.push(format!("{}: not installed", transport));
                continue;
            };

            let cmd: StructuredCommand = transport
                .command(&program, url, &partial)
                .envs(self.env_vars.iter().cloned());

            match process::run(&cmd, self.timeout).await {
                Ok(_) if partial.is_file() => {
                    std::fs::rename(&partial, dest)
                        .map_err(|e| BootstrapError::io("move into place", dest, e))?;
                    debug!(%transport, "download complete");
                    return Ok(());
                }
                Ok(_) => {
                    warn!(%transport, "transport reported success but wrote nothing");
                    task.attempts.push(format!("{}: no file written", transport));
                }
                Err(failure) if failure.is_interrupted() => {
                    let _ = std::fs::remove_file(&partial);
                    return Err(BootstrapError::aborted());
                }
                Err(failure) => {
                    warn!(%transport, error = %failure, "download attempt failed");
                    let _ = std::fs::remove_file(&partial);
                    task.attempts.push(format!("{}: {}", transport, failure));
                }
            }
        }

        Err(BootstrapError::Download {
            url: task.url.clone(),
            message: task.attempts.join("; "),
            fix: format!(
                "Check your network connection and make sure curl or wget is installed and can reach {}",
                task.url
            ),
        })
    }
}
