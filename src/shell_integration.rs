//! Shell rc file integration.
//!
//! Activation lives in a marker-delimited block; writing it again replaces
//! the old block instead of appending a second one. Bash login shells read
//! `~/.bash_profile` (or `~/.bash_login`, `~/.profile`) rather than
//! `~/.bashrc`, so [`ensure_rc_sourced`] makes one of them source it.

use crate::context::RunContext;
use crate::platform::{ActivationRenderer, ShellDialect, ShellProfile};
use crate::BootstrapError;
use regex::Regex;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Login files bash reads, in the order it looks for them.
const LOGIN_FILES: [&str; 3] = [".bash_profile", ".bash_login", ".profile"];

/// Environment changes written into the rc file.
#[derive(Debug, Clone)]
pub struct ActivationBlock {
    /// Toolbox name used in the markers.
    pub toolbox: String,
    pub vars: Vec<(String, String)>,
    /// Prepended to `PATH`, highest priority first.
    pub path_dirs: Vec<PathBuf>,
    /// Variable older installers wrote; lines mentioning it are removed.
    pub legacy_var: String,
}

impl ActivationBlock {
    /// Block for a run: install directory variable, plotting backend, and
    /// the target `bin/` on `PATH`.
    pub fn for_run(ctx: &RunContext) -> Self {
        Self {
            toolbox: ctx.config.toolbox.name.clone(),
            vars: ctx.activation_vars(),
            path_dirs: vec![ctx.bin_dir()],
            legacy_var: ctx.config.shell.legacy_var.clone(),
        }
    }

    fn start_marker(&self) -> String {
        format!("# >>> {} >>>", self.toolbox)
    }

    fn end_marker(&self) -> String {
        format!("# <<< {} <<<", self.toolbox)
    }

    /// The block text, markers included.
    pub fn render(&self, dialect: ShellDialect, installed_at: &str) -> String {
        format!(
            "{}\n# Installed on {}\n{}{}\n",
            self.start_marker(),
            installed_at,
            dialect.render_activation(&self.vars, &self.path_dirs),
            self.end_marker()
        )
    }

    /// `existing` without a previous block or legacy lines, with the fresh
    /// block appended. Lines after a start marker that is never closed are
    /// kept.
    fn merge(&self, existing: &str, block: &str) -> String {
        let start = self.start_marker();
        let end = self.end_marker();
        let legacy = Regex::new(&format!(r"\b{}\b", regex::escape(&self.legacy_var)))
            .expect("escaped pattern is valid");

        let mut kept = Vec::new();
        let mut open_block: Option<Vec<&str>> = None;
        for line in existing.lines() {
            let trimmed = line.trim();
            if trimmed == start {
                if let Some(orphaned) = open_block.replace(Vec::new()) {
                    warn!("activation block without end marker, keeping its lines");
                    kept.extend(orphaned);
                }
            } else if trimmed == end && open_block.is_some() {
                open_block = None;
            } else if let Some(lines) = open_block.as_mut() {
                lines.push(line);
            } else {
                kept.push(line);
            }
        }
        if let Some(orphaned) = open_block {
            warn!("activation block without end marker, keeping its lines");
            kept.extend(orphaned);
        }

        kept.retain(|line| {
            let drop = !self.legacy_var.is_empty() && legacy.is_match(line);
            if drop {
                debug!(line, "dropping legacy line");
            }
            !drop
        });

        let mut text = kept.join("\n").trim_end().to_string();
        if !text.is_empty() {
            text.push_str("\n\n");
        }
        text.push_str(block);
        text
    }
}

/// Replace `path` with `text` without ever leaving it half written.
///
/// The text goes to a temporary file next to the real one, which is then
/// renamed over it. A symlinked rc file is followed, and the old
/// permissions are kept.
fn replace_file(path: &Path, text: &str) -> Result<(), BootstrapError> {
    let path = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| BootstrapError::io("create", &dir, e))?;

    let mut temp = NamedTempFile::new_in(&dir).map_err(|e| BootstrapError::io("create", &dir, e))?;
    temp.write_all(text.as_bytes())
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| BootstrapError::io("write", temp.path(), e))?;
    if let Ok(metadata) = fs::metadata(&path) {
        fs::set_permissions(temp.path(), metadata.permissions())
            .map_err(|e| BootstrapError::io("set permissions on", temp.path(), e))?;
    }
    temp.persist(&path)
        .map_err(|e| BootstrapError::io("replace", &path, e.error))?;
    Ok(())
}

/// Write `block` into the profile's rc file, replacing any earlier block.
pub fn write_activation(profile: &ShellProfile, block: &ActivationBlock) -> Result<(), BootstrapError> {
    let rc = &profile.config_path;
    let existing = match fs::read_to_string(rc) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(BootstrapError::io("read", rc, e)),
    };

    let installed_at = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let text = block.merge(&existing, &block.render(profile.dialect, &installed_at));

    replace_file(rc, &text)?;
    info!(rc = %rc.display(), "wrote shell activation");
    Ok(())
}

/// How `rc` is spelled in the source line: `~/...` when under `home`.
fn display_rc(home: &Path, rc: &Path) -> String {
    match rc.strip_prefix(home) {
        Ok(relative) => format!("~/{}", relative.display()),
        Err(_) => rc.display().to_string(),
    }
}

/// Matches an existing line that sources `rc`, however `$HOME` is spelled.
fn source_line_pattern(home: &Path, rc: &Path) -> Regex {
    let location = match rc.strip_prefix(home) {
        Ok(relative) => format!(
            r#"(?:~|\$HOME|\$\{{HOME\}}|{})/{}"#,
            regex::escape(&home.display().to_string()),
            regex::escape(&relative.display().to_string())
        ),
        Err(_) => regex::escape(&rc.display().to_string()),
    };
    Regex::new(&format!(
        r#"(?m)(?:^|[;&|{{(\s])(?:source|\.)\s+["']?{}["']?(?:\s|;|$)"#,
        location
    ))
    .expect("escaped pattern is valid")
}

/// Make sure a login profile sources `rc`.
///
/// The first existing candidate among `~/.bash_profile`, `~/.bash_login` and
/// `~/.profile` is used; when none exists `~/.bash_profile` is created.
/// Returns the file that was changed, or `None` when it already sourced
/// `rc`.
pub fn ensure_rc_sourced(home: &Path, rc: &Path) -> Result<Option<PathBuf>, BootstrapError> {
    let profile = LOGIN_FILES
        .iter()
        .map(|name| home.join(name))
        .find(|path| path.exists())
        .unwrap_or_else(|| home.join(LOGIN_FILES[0]));

    let existing = match fs::read_to_string(&profile) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(BootstrapError::io("read", &profile, e)),
    };

    if source_line_pattern(home, rc).is_match(&existing) {
        debug!(profile = %profile.display(), "rc file already sourced");
        return Ok(None);
    }

    let rc_text = display_rc(home, rc);
    let mut text = existing;
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text.push_str(&format!(
        "\n# Load {rc} in login shells\nif [ -f {rc} ]; then\n    . {rc}\nfi\n",
        rc = rc_text
    ));
    replace_file(&profile, &text)?;

    info!(profile = %profile.display(), "login profile now sources {}", rc_text);
    Ok(Some(profile))
}
