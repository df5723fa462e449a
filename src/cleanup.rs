use log::debug;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Paths created by an in-flight install that must be removed if the
/// user interrupts it: the target prefix, the downloaded archive, and
/// the extraction staging directory.
#[derive(Default)]
pub struct CleanupContext {
    #[cfg(test)]
    pub paths: Vec<PathBuf>,
    #[cfg(not(test))]
    paths: Vec<PathBuf>,
}

impl CleanupContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a path for removal on interruption
    pub fn add(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    /// Deregister a path once the step that created it has completed
    pub fn remove(&mut self, path: &Path) {
        self.paths.retain(|p| p != path);
    }

    /// Remove every registered path from disk
    pub fn cleanup(&self) {
        for path in &self.paths {
            debug!("Removing leftover install path: {:?}", path);
            if path.is_dir() {
                let _ = std::fs::remove_dir_all(path);
            } else {
                let _ = std::fs::remove_file(path);
            }
        }
    }
}

/// Cleanup context shared between the installer and the Ctrl-C handler
pub type SharedCleanupContext = Arc<Mutex<CleanupContext>>;

pub fn new_shared() -> SharedCleanupContext {
    Arc::new(Mutex::new(CleanupContext::new()))
}
