//! Lenient version parsing for OS release strings.

use regex::Regex;
use semver::Version;

/// Parse a `major.minor[.patch]` version out of arbitrary text.
///
/// OS release strings rarely are valid semver on their own:
///
/// - `10.13` (macOS `sw_vers`) -> 10.13.0
/// - `14.2.1` -> 14.2.1
/// - `6.8.0-45-generic` (Linux kernel) -> 6.8.0
///
/// Returns `None` when no `major.minor` pattern is present.
pub(crate) fn parse_version(text: &str) -> Option<Version> {
    let re = Regex::new(r"(\d+)\.(\d+)(?:\.(\d+))?").expect("Invalid regex pattern");
    let caps = re.captures(text)?;

    let major = caps.get(1)?.as_str().parse().ok()?;
    let minor = caps.get(2)?.as_str().parse().ok()?;
    let patch = caps
        .get(3)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);

    Some(Version::new(major, minor, patch))
}
