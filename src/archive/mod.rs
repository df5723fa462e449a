//! Archive extraction for source release tarballs and zips.

mod tar_gz;
mod zip;

use crate::cleanup::SharedCleanupContext;
use crate::runtime::Runtime;
use anyhow::{Result, anyhow};
use log::{debug, info};
use std::path::{Path, PathBuf};

pub use tar_gz::TarGzExtractor;
pub use zip::ZipExtractor;

/// Trait for format-specific archive extractors
#[cfg_attr(test, mockall::automock)]
pub trait Extractor: Send + Sync {
    /// Check if this extractor can handle the given archive format
    fn can_handle(&self, archive_path: &Path) -> bool;

    /// Extract the archive to the specified directory
    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<()>;

    /// Extract the archive with cleanup context for interruption handling
    fn extract_with_cleanup<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
        cleanup_ctx: SharedCleanupContext,
    ) -> Result<()>;
}

/// Dispatcher that selects the appropriate extractor based on archive format.
/// Holds all available extractors and dispatches to the correct one.
pub struct ArchiveExtractor {
    tar_gz: TarGzExtractor,
    zip: ZipExtractor,
}

impl Default for ArchiveExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveExtractor {
    pub fn new() -> Self {
        Self {
            tar_gz: TarGzExtractor,
            zip: ZipExtractor,
        }
    }
}

impl Extractor for ArchiveExtractor {
    fn can_handle(&self, archive_path: &Path) -> bool {
        self.tar_gz.can_handle(archive_path) || self.zip.can_handle(archive_path)
    }

    #[tracing::instrument(skip(self, runtime, archive_path, extract_to))]
    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<()> {
        if self.tar_gz.can_handle(archive_path) {
            return self.tar_gz.extract(runtime, archive_path, extract_to);
        }
        if self.zip.can_handle(archive_path) {
            return self.zip.extract(runtime, archive_path, extract_to);
        }
        Err(anyhow!(
            "Unsupported archive format: {}",
            archive_path.display()
        ))
    }

    #[tracing::instrument(skip(self, runtime, archive_path, extract_to, cleanup_ctx))]
    fn extract_with_cleanup<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
        cleanup_ctx: SharedCleanupContext,
    ) -> Result<()> {
        if self.tar_gz.can_handle(archive_path) {
            return self.tar_gz.extract_with_cleanup(
                runtime,
                archive_path,
                extract_to,
                cleanup_ctx,
            );
        }
        if self.zip.can_handle(archive_path) {
            return self
                .zip
                .extract_with_cleanup(runtime, archive_path, extract_to, cleanup_ctx);
        }
        Err(anyhow!(
            "Unsupported archive format: {}",
            archive_path.display()
        ))
    }
}

/// Staging directory used to discover a single top-level archive directory
/// before promoting contents into the destination.
pub(crate) fn stage_dir_for(extract_to: &Path) -> Result<PathBuf> {
    let name = extract_to
        .file_name()
        .ok_or_else(|| anyhow!("Extraction target has no directory name"))?;
    Ok(extract_to.with_file_name(format!("{}_temp_extract", name.to_string_lossy())))
}

/// Run `unpack` into a fresh staging directory, then move the unpacked
/// tree into `extract_to`. Source archives conventionally wrap everything
/// in a single top-level directory; that wrapper is stripped.
pub(crate) fn extract_via_stage<R, F>(
    runtime: &R,
    extract_to: &Path,
    cleanup_ctx: Option<SharedCleanupContext>,
    unpack: F,
) -> Result<()>
where
    R: Runtime + 'static,
    F: FnOnce(&R, &Path) -> Result<()>,
{
    let stage = stage_dir_for(extract_to)?;
    if runtime.exists(&stage) {
        runtime.remove_dir_all(&stage)?;
    }
    runtime.create_dir_all(&stage)?;

    // Register the staging dir for cleanup on interruption
    if let Some(ref ctx) = cleanup_ctx {
        let mut guard = ctx.lock().unwrap();
        guard.add(stage.clone());
    }

    debug!("Unpacking to staging dir: {:?}", stage);
    unpack(runtime, &stage)?;

    let entries = runtime.read_dir(&stage)?;
    if entries.is_empty() {
        return Err(anyhow!("Archive appears to be empty."));
    }

    // A single top-level directory is the conventional wrapper; move its
    // contents. Anything else is moved as-is.
    let source_dir = match entries.first() {
        Some(entry) if entries.len() == 1 && runtime.is_dir(entry) => entry.clone(),
        _ => stage.clone(),
    };

    debug!("Moving contents from {:?} to {:?}", source_dir, extract_to);
    for item in runtime.read_dir(&source_dir)? {
        let dest_path = extract_to.join(
            item.file_name()
                .ok_or_else(|| anyhow!("Extracted entry has no file name: {:?}", item))?,
        );
        runtime.rename(&item, &dest_path)?;
    }

    // Clean up the staging directory
    runtime.remove_dir_all(&stage)?;
    if let Some(ref ctx) = cleanup_ctx {
        let mut guard = ctx.lock().unwrap();
        guard.remove(&stage);
    }

    info!("Extraction complete.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RealRuntime;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::fs::{self, File};
    use tar::Builder;
    use tempfile::tempdir;

    fn create_tar_gz(path: &Path, entries: &[(&str, &str)]) -> Result<()> {
        let file = File::create(path)?;
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = Builder::new(encoder);
        for (name, content) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, content.as_bytes())?;
        }
        builder.into_inner()?.finish()?;
        Ok(())
    }

    #[test]
    fn test_dispatcher_can_handle() {
        let extractor = ArchiveExtractor::new();
        assert!(extractor.can_handle(Path::new("pkg-v1.tar.gz")));
        assert!(extractor.can_handle(Path::new("pkg-v1.tgz")));
        assert!(extractor.can_handle(Path::new("pkg-v1.zip")));
        assert!(!extractor.can_handle(Path::new("pkg-v1.tar.xz")));
    }

    #[test]
    fn test_dispatcher_rejects_unknown_format() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("pkg.tar.xz");
        fs::write(&archive, "data").unwrap();

        let result = ArchiveExtractor::new().extract(&RealRuntime, &archive, dir.path());
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Unsupported archive format")
        );
    }

    #[test]
    fn test_dispatcher_extracts_tar_gz() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("pkg-v1.tar.gz");
        let dest = dir.path().join("dest");
        fs::create_dir(&dest).unwrap();

        create_tar_gz(&archive, &[("pkg-v1/main.c", "int main(){}")]).unwrap();

        ArchiveExtractor::new()
            .extract(&RealRuntime, &archive, &dest)
            .unwrap();

        assert_eq!(
            fs::read_to_string(dest.join("main.c")).unwrap(),
            "int main(){}"
        );
    }

    #[test]
    fn test_stage_dir_for() {
        let stage = stage_dir_for(Path::new("/root/pkg/v1")).unwrap();
        assert_eq!(stage, PathBuf::from("/root/pkg/v1_temp_extract"));
    }
}
