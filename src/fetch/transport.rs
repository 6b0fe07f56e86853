//! Download transports.

use crate::process::StructuredCommand;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;

/// A command-line tool able to fetch a URL into a file.
///
/// Transports are tried in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
pub enum Transport {
    Curl,
    Wget,
}

impl Transport {
    /// Program name searched on the run's search path.
    pub fn program_name(&self) -> &'static str {
        match self {
            Self::Curl => "curl",
            Self::Wget => "wget",
        }
    }

    /// All transports in priority order.
    pub fn all() -> impl Iterator<Item = Self> {
        <Self as IntoEnumIterator>::iter()
    }

    /// Locate the program, if this transport is available at all.
    pub fn locate(&self, search_path: &OsStr, cwd: &Path) -> Option<PathBuf> {
        which::which_in(self.program_name(), Some(search_path), cwd).ok()
    }

    /// Command fetching `url` into `dest`. The URL always comes last.
    pub fn command(&self, program: &Path, url: &str, dest: &Path) -> StructuredCommand {
        let cmd = StructuredCommand::new(program);
        match self {
            Self::Curl => cmd
                .args(["-fsSL", "--retry", "3", "--connect-timeout", "30", "-o"])
                .arg(dest)
                .arg(url),
            Self::Wget => cmd
                .args(["-q", "--tries=3", "--timeout=30", "-O"])
                .arg(dest)
                .arg(url),
        }
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.program_name())
    }
}
