//! # sct-bootstrap
//!
//! Reproducible installation of a scientific toolbox (by default the Spinal
//! Cord Toolbox) into an isolated interpreter environment.
//!
//! A run probes the host, resolves an install plan, provisions a fresh
//! conda-style environment, installs the pinned dependencies and the toolbox
//! itself, fetches the binaries and data bundles, optionally wires the
//! environment into the user's shell, and finally runs a self-check. Each
//! stage is a gate: the first failure ends the run.
//!
//! ## Example
//!
//! ```rust,no_run
//! use sct_bootstrap::{Bootstrap, BootstrapConfig, HostEnvironment, InstallRequest, RunState};
//! use std::time::Duration;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let config = BootstrapConfig::default();
//!     let host = HostEnvironment::capture(Duration::from_secs(5)).await;
//!
//!     let mut request = InstallRequest::new("/home/me/spinalcordtoolbox");
//!     request.in_place = true;
//!     request.skip_data = true;
//!
//!     let on_progress = |state: RunState| println!("{}", state.description());
//!     match Bootstrap::new(config, host)
//!         .run(request, on_progress, std::future::pending())
//!         .await
//!     {
//!         Ok(summary) => println!("validation: {}", summary.validation.details),
//!         Err(e) => eprintln!("{} ({})", e, e.fix_suggestion()),
//!     }
//! }
//! ```

pub mod archive;
pub mod artifacts;
pub mod config;
pub mod context;
pub mod deps;
mod engine;
mod error;
pub mod fetch;
mod options;
pub mod plan;
pub mod platform;
pub mod process;
mod progress;
pub mod provision;
pub mod shell_integration;
pub mod validate;

#[cfg(test)]
mod testing;

pub use config::BootstrapConfig;
pub use engine::{Bootstrap, RunSummary};
pub use error::BootstrapError;
pub use options::BootstrapOptions;
pub use plan::{DefaultAnswers, InstallPlan, InstallRequest, InstallType, Prompter, TerminalPrompter};
pub use platform::{probe, HostEnvironment, OsFamily, PlatformInfo};
pub use process::StructuredCommand;
pub use progress::RunState;
