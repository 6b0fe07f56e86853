//! Shell dialects and their activation syntax.

use crate::BootstrapError;
use std::path::{Path, PathBuf};

/// Syntax family of the user's login shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShellDialect {
    /// sh, bash, zsh, dash, ksh: `export NAME="value"`.
    Posix,
    /// csh, tcsh: `setenv NAME "value"`.
    CShell,
}

/// Renders environment changes in a shell's own syntax.
pub trait ActivationRenderer {
    /// A line setting `name` to `value`.
    fn set_var(&self, name: &str, value: &str) -> String;

    /// A line prepending `dir` to `PATH`.
    fn prepend_path(&self, dir: &Path) -> String;

    /// All lines for `vars` followed by the `PATH` prefix.
    fn render_activation(&self, vars: &[(String, String)], path_dirs: &[PathBuf]) -> String {
        let mut lines: Vec<String> = vars
            .iter()
            .map(|(name, value)| self.set_var(name, value))
            .collect();
        // Prepending in reverse keeps the first directory first on PATH.
        lines.extend(path_dirs.iter().rev().map(|dir| self.prepend_path(dir)));
        let mut text = lines.join("\n");
        text.push('\n');
        text
    }
}

impl ActivationRenderer for ShellDialect {
    fn set_var(&self, name: &str, value: &str) -> String {
        match self {
            Self::Posix => format!("export {}=\"{}\"", name, value),
            Self::CShell => format!("setenv {} \"{}\"", name, value),
        }
    }

    fn prepend_path(&self, dir: &Path) -> String {
        match self {
            Self::Posix => format!("export PATH=\"{}:$PATH\"", dir.display()),
            Self::CShell => format!("setenv PATH \"{}:$PATH\"", dir.display()),
        }
    }
}

/// The user's shell and the rc file activation goes into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellProfile {
    /// Shell basename, e.g. `bash`.
    pub shell_name: String,
    pub dialect: ShellDialect,
    /// Interactive rc file, e.g. `~/.bashrc`.
    pub config_path: PathBuf,
}

impl ShellProfile {
    /// Whether this profile's rc file is bash's `~/.bashrc`, which login
    /// shells do not read on their own.
    pub fn is_bashrc(&self) -> bool {
        self.shell_name == "bash"
    }
}

/// Map the `SHELL` value to a profile under `home`.
pub(crate) fn detect_shell(shell: Option<&str>, home: &Path) -> Result<ShellProfile, BootstrapError> {
    let raw = shell.unwrap_or_default();
    let name = Path::new(raw)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    let (dialect, rc) = match name {
        "bash" => (ShellDialect::Posix, ".bashrc"),
        "zsh" => (ShellDialect::Posix, ".zshrc"),
        "sh" | "dash" | "ksh" => (ShellDialect::Posix, ".profile"),
        "csh" => (ShellDialect::CShell, ".cshrc"),
        "tcsh" => (ShellDialect::CShell, ".tcshrc"),
        _ => {
            return Err(BootstrapError::ShellDetection {
                shell: raw.to_string(),
                fix: "Set SHELL to bash, zsh, sh, csh or tcsh, or add the toolbox to PATH yourself"
                    .to_string(),
            })
        }
    };

    Ok(ShellProfile {
        shell_name: name.to_string(),
        dialect,
        config_path: home.join(rc),
    })
}
