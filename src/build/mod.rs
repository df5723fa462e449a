//! Fixed three-step build pipeline: configure, build, install.
//!
//! Each step shells out to the formula's build tool and must exit
//! successfully before the next step runs.

use crate::runtime::Runtime;
use anyhow::Result;
use log::{debug, info};
use std::path::{Path, PathBuf};

/// The three pipeline steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Configure,
    Build,
    Install,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Configure => write!(f, "configure"),
            Step::Build => write!(f, "build"),
            Step::Install => write!(f, "install"),
        }
    }
}

/// A build step exited with a non-zero status (or was killed by a signal).
/// The tool's stderr is carried verbatim so the user sees the real failure.
#[derive(Debug)]
pub struct StepError {
    pub step: Step,
    pub status: Option<i32>,
    pub stderr: String,
}

impl std::fmt::Display for StepError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(code) => write!(f, "{} step failed with exit code {}", self.step, code)?,
            None => write!(f, "{} step terminated by signal", self.step)?,
        }
        if !self.stderr.is_empty() {
            write!(f, "\n{}", self.stderr)?;
        }
        Ok(())
    }
}

impl std::error::Error for StepError {}

/// Invocation plan for the build tool over an unpacked source tree.
pub struct BuildPlan {
    pub tool: String,
    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
    pub prefix: PathBuf,
    pub extra_configure_args: Vec<String>,
}

impl BuildPlan {
    pub fn new(tool: &str, source_dir: &Path, prefix: &Path) -> Self {
        Self {
            tool: tool.to_string(),
            source_dir: source_dir.to_path_buf(),
            build_dir: source_dir.join("build"),
            prefix: prefix.to_path_buf(),
            extra_configure_args: Vec::new(),
        }
    }

    /// Arguments for the configure step. Mirrors the conventional
    /// out-of-tree cmake invocation with a standard argument set.
    pub fn configure_args(&self) -> Vec<String> {
        let mut args = vec![
            "-S".to_string(),
            self.source_dir.to_string_lossy().into_owned(),
            "-B".to_string(),
            self.build_dir.to_string_lossy().into_owned(),
            format!("-DCMAKE_INSTALL_PREFIX={}", self.prefix.display()),
            "-DCMAKE_BUILD_TYPE=Release".to_string(),
            "-DBUILD_TESTING=OFF".to_string(),
            "-Wno-dev".to_string(),
        ];
        args.extend(self.extra_configure_args.iter().cloned());
        args
    }

    /// Arguments for the build step.
    pub fn build_args(&self) -> Vec<String> {
        vec![
            "--build".to_string(),
            self.build_dir.to_string_lossy().into_owned(),
        ]
    }

    /// Arguments for the install step.
    pub fn install_args(&self) -> Vec<String> {
        vec![
            "--install".to_string(),
            self.build_dir.to_string_lossy().into_owned(),
            "--prefix".to_string(),
            self.prefix.to_string_lossy().into_owned(),
        ]
    }

    /// Run configure, build, and install in order. The first step that
    /// exits non-zero aborts the pipeline; later steps are never started.
    /// Steps are never retried.
    #[tracing::instrument(skip(self, runtime))]
    pub fn run<R: Runtime>(&self, runtime: &R) -> Result<()> {
        let steps = [
            (Step::Configure, self.configure_args()),
            (Step::Build, self.build_args()),
            (Step::Install, self.install_args()),
        ];

        for (step, args) in steps {
            info!("Running {} step: {} {}", step, self.tool, args.join(" "));
            let output = runtime.run_command(&self.tool, &args, &self.source_dir)?;

            if !output.success() {
                return Err(StepError {
                    step,
                    status: output.status,
                    stderr: output.stderr_lossy(),
                }
                .into());
            }
            debug!("{} step finished.", step);
        }

        Ok(())
    }
}
