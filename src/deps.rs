//! Build-dependency presence checks.
//!
//! Dependencies are declared by the formula and resolved by an external
//! package manager; this module only confirms that declared build tools
//! are actually present before any install step runs. A missing build
//! dependency aborts the install before configure is invoked. Runtime
//! dependencies are never probed.

use log::debug;
use std::path::PathBuf;

use crate::formula::Formula;
use crate::runtime::Runtime;

/// One or more declared build dependencies could not be found on PATH.
#[derive(Debug, PartialEq)]
pub struct MissingDependencies {
    pub missing: Vec<String>,
}

impl std::fmt::Display for MissingDependencies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "missing build dependencies: {}. Install them with your package manager and retry.",
            self.missing.join(", ")
        )
    }
}

impl std::error::Error for MissingDependencies {}

/// Locate an executable on PATH through the runtime.
pub fn find_executable<R: Runtime>(runtime: &R, name: &str) -> Option<PathBuf> {
    let path_var = runtime.env_var("PATH").ok()?;

    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(name);
        if runtime.exists(&candidate) && !runtime.is_dir(&candidate) {
            return Some(candidate);
        }

        #[cfg(windows)]
        {
            let candidate = dir.join(format!("{}.exe", name));
            if runtime.exists(&candidate) && !runtime.is_dir(&candidate) {
                return Some(candidate);
            }
        }
    }
    None
}

/// Check that every declared build dependency resolves to an executable.
/// Reports all missing tools at once rather than the first one.
#[tracing::instrument(skip(runtime, formula))]
pub fn check_build_dependencies<R: Runtime>(
    runtime: &R,
    formula: &Formula,
) -> Result<(), MissingDependencies> {
    let mut missing = Vec::new();

    for dep in &formula.dependencies.build {
        match find_executable(runtime, dep) {
            Some(path) => debug!("Build dependency '{}' found at {:?}", dep, path),
            None => missing.push(dep.clone()),
        }
    }

    if !formula.dependencies.runtime.is_empty() {
        debug!(
            "Runtime dependencies declared (resolution is external): {}",
            formula.dependencies.runtime.join(", ")
        );
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(MissingDependencies { missing })
    }
}
