use anyhow::Result;
use clap::Parser;
use sfi::install;
use std::path::PathBuf;

/// sfi - Source Formula Installer
///
/// Build and install software from source, driven by declarative
/// formula files (TOML): a source URL, a SHA-256 checksum, the
/// dependencies, and a fixed configure/build/install recipe.
///
/// Examples:
///   sfi install qvm-ffmpeg.toml    # Build and install from a formula
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Install root directory (overrides defaults; also via SFI_ROOT)
    #[arg(
        long = "root",
        short = 'r',
        env = "SFI_ROOT",
        value_name = "PATH",
        global = true
    )]
    pub install_root: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Build and install a package from a formula file
    Install(InstallArgs),

    /// Check that a formula file is well-formed
    Validate(FormulaArgs),

    /// Print the contents of a formula file
    Show(FormulaArgs),

    /// List installed packages
    List(ListArgs),
}

#[derive(clap::Args, Debug)]
pub struct InstallArgs {
    /// Path to the formula file
    #[arg(value_name = "FORMULA")]
    pub formula: PathBuf,

    /// Install into this exact prefix instead of {root}/{name}/{version}
    #[arg(long, value_name = "PATH")]
    pub prefix: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct FormulaArgs {
    /// Path to the formula file
    #[arg(value_name = "FORMULA")]
    pub formula: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = sfi::runtime::RealRuntime;

    match cli.command {
        Commands::Install(args) => {
            install::install(runtime, &args.formula, cli.install_root, args.prefix).await?
        }
        Commands::Validate(args) => install::check(&runtime, &args.formula)?,
        Commands::Show(args) => install::show(&runtime, &args.formula)?,
        Commands::List(_args) => install::list(runtime, cli.install_root)?,
    }
    Ok(())
}
