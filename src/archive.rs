//! Extraction of `.tar.gz` bundles.

use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::debug;

/// Extract `archive` so that its contents end up directly in `dest`.
///
/// Archives built from a repository snapshot wrap everything in a single
/// top-level directory (`PAM50-r20230222/...`); that directory is stripped.
/// The archive is unpacked into a staging directory next to `dest` first, so
/// a corrupt archive never leaves a half-populated `dest` behind. Any
/// existing `dest` is replaced.
pub fn extract_tar_gz(archive: &Path, dest: &Path) -> io::Result<()> {
    let parent = dest
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "destination has no parent"))?;
    fs::create_dir_all(parent)?;

    let staging = tempfile::Builder::new()
        .prefix(".extract-")
        .tempdir_in(parent)?;

    let mut tar = tar::Archive::new(GzDecoder::new(File::open(archive)?));
    tar.set_preserve_permissions(true);
    tar.unpack(staging.path())?;

    let entries: Vec<_> = fs::read_dir(staging.path())?.collect::<Result<_, _>>()?;
    if dest.exists() {
        fs::remove_dir_all(dest)?;
    }

    match entries.as_slice() {
        [single] if single.file_type()?.is_dir() => {
            debug!(root = ?single.file_name(), "stripping top-level directory");
            fs::rename(single.path(), dest)?;
        }
        _ => {
            fs::create_dir_all(dest)?;
            for entry in &entries {
                fs::rename(entry.path(), dest.join(entry.file_name()))?;
            }
        }
    }

    Ok(())
}
