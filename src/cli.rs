//! Command-line interface.
//!
//! Help and malformed arguments both print usage and exit with
//! [`USAGE_EXIT_CODE`], so clap's own help and version flags are disabled.

use clap::{CommandFactory, Parser};
use sct_bootstrap::InstallRequest;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Exit code after printing usage.
pub const USAGE_EXIT_CODE: u8 = 99;

#[derive(Debug, Parser)]
#[command(
    name = "install-sct",
    about = "Install the Spinal Cord Toolbox into an isolated environment",
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct Cli {
    /// Install in place, in the source directory
    #[arg(short = 'i', long)]
    pub in_place: bool,

    /// Non-interactive: accept every default
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Do not download the data bundles
    #[arg(short = 'd', long)]
    pub skip_data: bool,

    /// Do not download the binaries archive
    #[arg(short = 'b', long)]
    pub skip_binaries: bool,

    /// Show every step, including command output
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Print this help and exit
    #[arg(short = 'h', long)]
    pub help: bool,

    /// Install into DIR instead of asking
    #[arg(long, value_name = "DIR")]
    pub prefix: Option<PathBuf>,

    /// Toolbox checkout to install from (default: current directory)
    #[arg(long, value_name = "DIR")]
    pub source: Option<PathBuf>,

    /// TOML file overriding the built-in configuration
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// What `main` should do.
#[derive(Debug)]
pub enum CliAction {
    Run(Cli),
    /// Print usage, after `message` if the arguments were malformed.
    Usage { message: Option<String> },
}

pub fn parse_args<I, T>(args: I) -> CliAction
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) if cli.help => CliAction::Usage { message: None },
        Ok(cli) => CliAction::Run(cli),
        Err(e) => CliAction::Usage {
            message: Some(e.kind().as_str().unwrap_or("invalid arguments").to_string()),
        },
    }
}

pub fn usage() -> String {
    Cli::command().render_help().to_string()
}

fn absolute(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

impl Cli {
    /// Turn the flags into a request, resolving relative paths against `cwd`.
    pub fn to_request(&self, cwd: &Path) -> InstallRequest {
        let source = self.source.as_deref().unwrap_or(cwd);
        let mut request = InstallRequest::new(absolute(source, cwd));
        request.target_dir = self.prefix.as_deref().map(|p| absolute(p, cwd));
        request.in_place = self.in_place;
        request.assume_yes = self.yes;
        request.skip_data = self.skip_data;
        request.skip_binaries = self.skip_binaries;
        request
    }
}
