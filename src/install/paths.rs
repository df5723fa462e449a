use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use crate::formula::Formula;
use crate::runtime::Runtime;

/// Get the installation prefix for a formula version
#[tracing::instrument(skip(runtime, formula, install_root))]
pub fn get_target_prefix<R: Runtime>(
    runtime: &R,
    formula: &Formula,
    install_root: Option<PathBuf>,
) -> Result<PathBuf> {
    let root = match install_root {
        Some(path) => path,
        None => default_install_root(runtime)?,
    };

    info!("Using install root: {}", root.display());

    Ok(root.join(&formula.name).join(formula.version()?))
}

/// Get the default installation root directory
#[tracing::instrument(skip(runtime))]
pub fn default_install_root<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    if runtime.is_privileged() {
        Ok(system_install_root(runtime))
    } else {
        let home_dir = runtime
            .home_dir()
            .context("Could not find home directory")?;
        Ok(home_dir.join(".sfi"))
    }
}

#[cfg(target_os = "macos")]
#[tracing::instrument(skip(_runtime))]
fn system_install_root<R: Runtime>(_runtime: &R) -> PathBuf {
    PathBuf::from("/opt/sfi")
}

#[cfg(target_os = "windows")]
#[tracing::instrument(skip(_runtime))]
fn system_install_root<R: Runtime>(_runtime: &R) -> PathBuf {
    PathBuf::from(r"C:\ProgramData\sfi")
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
#[tracing::instrument(skip(_runtime))]
fn system_install_root<R: Runtime>(_runtime: &R) -> PathBuf {
    PathBuf::from("/usr/local/sfi")
}
