//! Operating system families.

use serde::{Deserialize, Serialize};

/// A supported operating system family.
///
/// # Example
///
/// ```rust
/// use sct_bootstrap::OsFamily;
///
/// assert_eq!(OsFamily::from_os_name("linux"), Some(OsFamily::Linux));
/// assert_eq!(OsFamily::from_os_name("windows"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OsFamily {
    /// Any Linux distribution.
    Linux,
    /// Apple macOS.
    MacOS,
}

impl OsFamily {
    /// Map a Rust target OS name (`std::env::consts::OS`) to a family.
    pub fn from_os_name(os: &str) -> Option<Self> {
        match os {
            "linux" => Some(Self::Linux),
            "macos" => Some(Self::MacOS),
            _ => None,
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Linux => "Linux",
            Self::MacOS => "macOS",
        }
    }

    /// Whether child processes need a fixed UTF-8 locale on this family.
    ///
    /// macOS terminals often export `LC_CTYPE=UTF-8`, which Python's locale
    /// module rejects.
    pub fn needs_locale_guard(&self) -> bool {
        matches!(self, Self::MacOS)
    }
}

impl std::fmt::Display for OsFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}
