//! Run options configuration.
//!
//! This module provides the [`BootstrapOptions`] struct for the time limits
//! applied to downloads, install commands and host probes.

use std::time::Duration;

/// Time limits for a bootstrap run.
///
/// Downloads and install commands have no limit of their own (curl, pip and
/// the runtime installer would wait forever on a stalled connection), so the
/// engine applies these.
///
/// # Example
///
/// ```rust
/// use sct_bootstrap::BootstrapOptions;
/// use std::time::Duration;
///
/// let opts = BootstrapOptions {
///     download_timeout: Duration::from_secs(600),
///     ..Default::default()
/// };
/// assert_eq!(opts.command_timeout, Duration::from_secs(3600));
/// ```
#[derive(Debug, Clone)]
pub struct BootstrapOptions {
    /// Limit for a single download attempt with one transport.
    ///
    /// Default: 30 minutes
    pub download_timeout: Duration,

    /// Limit for one install command (runtime installer, pip, conda).
    ///
    /// Default: 60 minutes
    pub command_timeout: Duration,

    /// Limit for quick host queries such as `sw_vers`.
    ///
    /// Default: 5 seconds
    pub probe_timeout: Duration,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            download_timeout: Duration::from_secs(30 * 60),
            command_timeout: Duration::from_secs(60 * 60),
            probe_timeout: Duration::from_secs(5),
        }
    }
}
