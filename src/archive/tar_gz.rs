use crate::cleanup::SharedCleanupContext;
use crate::runtime::{Runtime, is_path_under};
use anyhow::{Context, Result, anyhow};
use flate2::read::GzDecoder;
use log::debug;
use std::path::Path;
use tar::Archive;

use super::{Extractor, extract_via_stage};

/// Extractor for .tar.gz / .tgz archives
pub struct TarGzExtractor;

impl Extractor for TarGzExtractor {
    fn can_handle(&self, archive_path: &Path) -> bool {
        let name = archive_path.to_string_lossy().to_lowercase();
        name.ends_with(".tar.gz") || name.ends_with(".tgz")
    }

    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<()> {
        self.extract_impl(runtime, archive_path, extract_to, None)
    }

    fn extract_with_cleanup<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
        cleanup_ctx: SharedCleanupContext,
    ) -> Result<()> {
        self.extract_impl(runtime, archive_path, extract_to, Some(cleanup_ctx))
    }
}

impl TarGzExtractor {
    fn extract_impl<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
        cleanup_ctx: Option<SharedCleanupContext>,
    ) -> Result<()> {
        debug!("Extracting tar.gz archive to {:?}...", extract_to);
        let file = runtime
            .open(archive_path)
            .with_context(|| format!("Failed to open archive at {:?}", archive_path))?;

        extract_via_stage(runtime, extract_to, cleanup_ctx, |runtime, stage| {
            let mut archive = Archive::new(GzDecoder::new(file));
            unpack_entries(runtime, &mut archive, stage)
        })
    }
}

fn unpack_entries<R: Runtime, T: std::io::Read>(
    runtime: &R,
    archive: &mut Archive<T>,
    stage: &Path,
) -> Result<()> {
    for entry in archive
        .entries()
        .with_context(|| "Failed to parse tar archive")?
    {
        let mut entry = entry.with_context(|| "Failed to read tar entry")?;
        let entry_path = entry
            .path()
            .with_context(|| "Tar entry has an invalid path")?
            .into_owned();

        let full_path = stage.join(&entry_path);
        // Reject entries that escape the extraction directory
        if !is_path_under(&full_path, stage) {
            debug!("Skipping entry with invalid path: {:?}", entry_path);
            continue;
        }

        let entry_type = entry.header().entry_type();
        if entry_type.is_dir() {
            runtime.create_dir_all(&full_path)?;
        } else if entry_type.is_symlink() {
            let target = entry
                .link_name()
                .with_context(|| "Tar symlink entry has an invalid target")?
                .ok_or_else(|| anyhow!("Tar symlink entry has no target: {:?}", entry_path))?;
            // A link target leaving the extraction dir would let later
            // entries write through it to arbitrary locations
            let resolved = match full_path.parent() {
                Some(parent) => parent.join(&target),
                None => target.to_path_buf(),
            };
            if target.is_absolute() || !is_path_under(&resolved, stage) {
                debug!(
                    "Skipping symlink with escaping target: {:?} -> {:?}",
                    entry_path, target
                );
                continue;
            }
            if let Some(parent) = full_path.parent() {
                runtime.create_dir_all(parent)?;
            }
            runtime.symlink(&target, &full_path)?;
        } else if entry_type.is_file() {
            if let Some(parent) = full_path.parent() {
                runtime.create_dir_all(parent)?;
            }
            let mut dest_file = runtime.create_file(&full_path)?;
            std::io::copy(&mut entry, &mut dest_file)
                .with_context(|| format!("Failed to extract file {:?}", full_path))?;

            // Carry over file modes from the archive (Unix only)
            #[cfg(unix)]
            if let Ok(mode) = entry.header().mode()
                && let Err(e) = runtime.set_permissions(&full_path, mode)
            {
                debug!("Failed to set permissions on {:?}: {}", full_path, e);
            }
        } else {
            debug!("Skipping unsupported entry type: {:?}", entry_path);
        }
    }
    Ok(())
}
