//! Binaries and data bundle installation.

use crate::archive::extract_tar_gz;
use crate::context::RunContext;
use crate::fetch::Fetcher;
use crate::BootstrapError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Kind of artifact, each independently skippable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Prebuilt native helpers, one archive per OS family.
    Binaries,
    /// Ordered list of named data bundles.
    Data,
}

impl ArtifactKind {
    fn is_skipped(&self, ctx: &RunContext) -> bool {
        match self {
            Self::Binaries => ctx.plan.skip_binaries,
            Self::Data => ctx.plan.skip_data,
        }
    }

    fn install_dir(&self, ctx: &RunContext) -> PathBuf {
        match self {
            Self::Binaries => ctx.bin_dir(),
            Self::Data => ctx.data_dir(),
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Binaries => f.write_str("binaries"),
            Self::Data => f.write_str("data"),
        }
    }
}

/// Install one kind of artifact.
///
/// A skipped kind returns at once without touching the filesystem or the
/// network. Otherwise its directory is wiped and rebuilt; the first bundle
/// that fails to download or extract ends the run.
pub async fn install_artifacts(
    kind: ArtifactKind,
    ctx: &RunContext,
    fetcher: &Fetcher,
) -> Result<(), BootstrapError> {
    if kind.is_skipped(ctx) {
        info!(%kind, "skipped");
        return Ok(());
    }

    let dir = kind.install_dir(ctx);
    if dir.exists() {
        fs::remove_dir_all(&dir).map_err(|e| BootstrapError::io("remove", &dir, e))?;
    }

    let artifacts = &ctx.config.artifacts;
    match kind {
        ArtifactKind::Binaries => {
            let url = artifacts.binaries.for_family(ctx.plan.platform.os_family);
            install_bundle("binaries", url, &dir, ctx.scratch(), fetcher).await?;
        }
        ArtifactKind::Data => {
            fs::create_dir_all(&dir).map_err(|e| BootstrapError::io("create", &dir, e))?;
            for bundle in &artifacts.data {
                install_bundle(&bundle.name, &bundle.url, &dir.join(&bundle.name), ctx.scratch(), fetcher)
                    .await?;
            }
        }
    }
    Ok(())
}

async fn install_bundle(
    name: &str,
    url: &str,
    dest: &Path,
    scratch: &Path,
    fetcher: &Fetcher,
) -> Result<(), BootstrapError> {
    info!(bundle = name, "installing");
    let archive = scratch.join(format!("{}.tar.gz", name));
    fetcher.fetch(url, &archive).await?;

    extract_tar_gz(&archive, dest).map_err(|e| BootstrapError::ArtifactInstall {
        artifact: name.to_string(),
        message: e.to_string(),
        fix: format!("The archive from {} may be corrupt; run the installer again", url),
    })?;
    let _ = fs::remove_file(&archive);
    Ok(())
}
