//! Install orchestration: validate the formula, check build tools,
//! download and verify the source archive, unpack it, run the three
//! build steps, and record the result.

use anyhow::{Context, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::{
    archive::Extractor,
    build::BuildPlan,
    checksum,
    cleanup::{self, SharedCleanupContext},
    deps::check_build_dependencies,
    download::fetch_source_archive,
    formula::{Formula, validate::validate},
    http::HttpClient,
    runtime::Runtime,
};

pub mod config;
mod paths;
pub mod receipt;
mod symlink;

use config::Config;
use paths::{default_install_root, get_target_prefix};
use receipt::{RECEIPT_FILE, Receipt, find_all_receipts};
use symlink::update_current_symlink;

#[tracing::instrument(skip(runtime, install_root, prefix_override))]
pub async fn install<R: Runtime + 'static>(
    runtime: R,
    formula_path: &Path,
    install_root: Option<PathBuf>,
    prefix_override: Option<PathBuf>,
) -> Result<()> {
    let config = Config::new(install_root)?;
    let installer = Installer::new(runtime, config.http, config.extractor);
    installer
        .install(formula_path, config.install_root, prefix_override)
        .await
}

/// Load and validate a formula without installing anything.
#[tracing::instrument(skip(runtime))]
pub fn check<R: Runtime>(runtime: &R, formula_path: &Path) -> Result<()> {
    let formula = Formula::load(runtime, formula_path)?;
    validate(runtime, &formula)?;
    println!("{} {} is well-formed", formula.name, formula.version()?);
    Ok(())
}

/// Print the contents of a formula in a human-readable form.
#[tracing::instrument(skip(runtime))]
pub fn show<R: Runtime>(runtime: &R, formula_path: &Path) -> Result<()> {
    let formula = Formula::load(runtime, formula_path)?;

    println!("name:     {}", formula.name);
    if let Some(description) = &formula.description {
        println!("desc:     {}", description);
    }
    if let Some(homepage) = &formula.homepage {
        println!("homepage: {}", homepage);
    }
    println!("version:  {}", formula.version()?);
    println!("source:   {}", formula.source.url);
    println!("sha256:   {}", formula.source.sha256);
    if !formula.dependencies.build.is_empty() {
        println!("build:    {}", formula.dependencies.build.join(", "));
    }
    if !formula.dependencies.runtime.is_empty() {
        println!("runtime:  {}", formula.dependencies.runtime.join(", "));
    }
    println!("tool:     {}", formula.recipe.tool);

    Ok(())
}

/// List all installed packages
#[tracing::instrument(skip(runtime, install_root))]
pub fn list<R: Runtime>(runtime: R, install_root: Option<PathBuf>) -> Result<()> {
    let root = match install_root {
        Some(path) => path,
        None => default_install_root(&runtime)?,
    };

    debug!("Listing packages from {:?}", root);

    let receipt_files = find_all_receipts(&runtime, &root)?;
    if receipt_files.is_empty() {
        println!("No packages installed.");
        return Ok(());
    }

    for receipt_path in receipt_files {
        match Receipt::load(&runtime, &receipt_path) {
            Ok(receipt) => println!("{} {}", receipt.name, receipt.version),
            Err(e) => debug!("Failed to load receipt from {:?}: {}", receipt_path, e),
        }
    }

    Ok(())
}

pub struct Installer<R: Runtime, E: Extractor> {
    pub runtime: R,
    pub http: HttpClient,
    pub extractor: E,
}

impl<R: Runtime + 'static, E: Extractor> Installer<R, E> {
    pub fn new(runtime: R, http: HttpClient, extractor: E) -> Self {
        Self {
            runtime,
            http,
            extractor,
        }
    }

    #[tracing::instrument(skip(self, formula_path, install_root, prefix_override))]
    pub async fn install(
        &self,
        formula_path: &Path,
        install_root: Option<PathBuf>,
        prefix_override: Option<PathBuf>,
    ) -> Result<()> {
        let formula = Formula::load(&self.runtime, formula_path)?;
        validate(&self.runtime, &formula)?;
        check_build_dependencies(&self.runtime, &formula)?;

        let version = formula.version()?;
        // An explicit prefix bypasses the {root}/{name}/{version} layout,
        // so the per-package 'current' link is not maintained for it.
        let custom_prefix = prefix_override.is_some();
        let prefix = match prefix_override {
            Some(path) => path,
            None => get_target_prefix(&self.runtime, &formula, install_root)?,
        };

        if self.runtime.exists(&prefix) {
            info!(
                "{} {} is already installed at {:?}. Nothing to do.",
                formula.name, version, prefix
            );
            if !custom_prefix {
                update_current_symlink(&self.runtime, &prefix)?;
            }
            return Ok(());
        }

        // Set up cleanup context for Ctrl-C handling
        let cleanup_ctx = cleanup::new_shared();
        let cleanup_ctx_clone = Arc::clone(&cleanup_ctx);

        // Register Ctrl-C handler
        let ctrl_c_handler = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nInterrupted, cleaning up...");
                cleanup_ctx_clone.lock().unwrap().cleanup();
                std::process::exit(130); // Standard exit code for Ctrl-C
            }
        });

        let result = self
            .build_and_install(&formula, &prefix, Arc::clone(&cleanup_ctx))
            .await;

        // Abort the Ctrl-C handler since installation completed (successfully or with error)
        ctrl_c_handler.abort();

        result?;

        if !custom_prefix {
            update_current_symlink(&self.runtime, &prefix)?;
        }

        let receipt = Receipt::from_formula(&formula, &prefix)?;
        receipt.save(&self.runtime, &prefix.join(RECEIPT_FILE))?;

        println!(
            "   installed {} {} {}",
            formula.name,
            version,
            prefix.display()
        );

        Ok(())
    }

    #[tracing::instrument(skip(self, formula, prefix, cleanup_ctx))]
    async fn build_and_install(
        &self,
        formula: &Formula,
        prefix: &Path,
        cleanup_ctx: SharedCleanupContext,
    ) -> Result<()> {
        debug!("Creating install prefix: {:?}", prefix);
        self.runtime
            .create_dir_all(prefix)
            .with_context(|| format!("Failed to create install prefix at {:?}", prefix))?;

        // Register prefix for cleanup on Ctrl-C
        {
            let mut ctx = cleanup_ctx.lock().unwrap();
            ctx.add(prefix.to_path_buf());
        }

        let temp_dir = self.runtime.temp_dir();
        let archive_path = temp_dir.join(formula.archive_file_name()?);

        println!(" downloading {} {}", formula.name, formula.version()?);
        if let Err(e) = fetch_source_archive(
            &self.runtime,
            &formula.source.url,
            &archive_path,
            &self.http,
        )
        .await
        {
            debug!("Download failed, cleaning up prefix: {:?}", prefix);
            let _ = self.runtime.remove_dir_all(prefix);
            return Err(e);
        }

        // Register the downloaded archive for cleanup
        {
            let mut ctx = cleanup_ctx.lock().unwrap();
            ctx.add(archive_path.clone());
        }

        // The archive must hash to the declared checksum before a single
        // byte of it is unpacked.
        println!("   verifying {}", formula.name);
        if let Err(e) = checksum::verify_file(&self.runtime, &archive_path, &formula.source.sha256)
        {
            let _ = self.runtime.remove_file(&archive_path);
            let _ = self.runtime.remove_dir_all(prefix);
            return Err(e);
        }

        let work_dir = temp_dir.join(format!("{}-{}-src", formula.name, formula.version()?));
        if self.runtime.exists(&work_dir) {
            self.runtime.remove_dir_all(&work_dir)?;
        }
        self.runtime.create_dir_all(&work_dir)?;
        {
            let mut ctx = cleanup_ctx.lock().unwrap();
            ctx.add(work_dir.clone());
        }

        println!("  extracting {}", formula.name);
        self.extractor.extract_with_cleanup(
            &self.runtime,
            &archive_path,
            &work_dir,
            Arc::clone(&cleanup_ctx),
        )?;

        println!("    building {}", formula.name);
        let mut plan = BuildPlan::new(&formula.recipe.tool, &work_dir, prefix);
        plan.extra_configure_args = formula.recipe.configure_args.clone();
        if let Err(e) = plan.run(&self.runtime) {
            let _ = self.runtime.remove_dir_all(prefix);
            return Err(e);
        }

        // Build artifacts are no longer needed once installed
        let _ = self.runtime.remove_file(&archive_path);
        let _ = self.runtime.remove_dir_all(&work_dir);
        {
            let mut ctx = cleanup_ctx.lock().unwrap();
            ctx.remove(&archive_path);
            ctx.remove(&work_dir);
            ctx.remove(prefix);
        }

        Ok(())
    }
}
