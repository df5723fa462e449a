use anyhow::{Context, Result, bail};
use log::debug;
use std::path::Path;

use crate::runtime::Runtime;

/// Update the 'current' symlink to point to the specified version prefix
#[tracing::instrument(skip(runtime, target_dir))]
pub fn update_current_symlink<R: Runtime>(runtime: &R, target_dir: &Path) -> Result<()> {
    let current_link = target_dir
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Failed to get parent directory"))?
        .join("current");

    let link_target = target_dir
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Failed to get target directory name"))?;

    let mut create_symlink = true;

    if runtime.exists(&current_link) {
        if !runtime.is_symlink(&current_link) {
            bail!("'current' exists but is not a symlink");
        }

        match runtime.read_link(&current_link) {
            Ok(target) => {
                // Normalize paths for comparison to handle minor differences like trailing slashes
                let existing_target_path = Path::new(&target).components().as_path();
                let new_target_path = Path::new(link_target).components().as_path();

                if existing_target_path == new_target_path {
                    debug!("'current' symlink already points to the correct version");
                    create_symlink = false;
                } else {
                    debug!(
                        "'current' symlink points to {:?}, but should point to {:?}. Updating...",
                        existing_target_path, new_target_path
                    );
                    runtime.remove_symlink(&current_link)?;
                }
            }
            Err(_) => {
                debug!("'current' symlink is unreadable, recreating...");
                runtime.remove_symlink(&current_link)?;
            }
        }
    }

    if create_symlink {
        runtime
            .symlink(Path::new(link_target), &current_link)
            .with_context(|| format!("Failed to update 'current' symlink to {:?}", target_dir))?;
    }

    Ok(())
}
