use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crosspatch_core::metadata::CountScope;
use crosspatch_core::output::write_manifest;
use crosspatch_core::provider::IndexLimits;
use crosspatch_core::{build_manifest, BuildConfig, ModIdentity};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Scope {
    /// Every record describes the whole mounted package
    Provider,
    /// Each record counts only its own container's entries
    Container,
}

impl From<Scope> for CountScope {
    fn from(s: Scope) -> Self {
        match s {
            Scope::Provider => CountScope::Provider,
            Scope::Container => CountScope::Container,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "crosspatch-parser",
    version,
    about = "CrossPatch Mod Parser - Analyzes UE4/5 pak files and generates mod info"
)]
struct Cli {
    /// Mod name
    #[arg(long)]
    mod_name: Option<String>,
    /// Mod author
    #[arg(long)]
    mod_author: Option<String>,
    /// Mod version
    #[arg(long)]
    mod_version: Option<String>,
    /// Mod path containing pak, ucas, and utoc
    #[arg(long)]
    path: PathBuf,
    /// Output file path (defaults to stdout)
    #[arg(long)]
    output: Option<PathBuf>,
    /// Mount point for pak files
    #[arg(long)]
    mount_point: Option<String>,
    /// What file_count/total_size/files describe on each pak_files record
    #[arg(long, value_enum, default_value_t = Scope::Provider)]
    scope: Scope,
    /// Refuse container indices larger than this many bytes
    #[arg(long, default_value_t = IndexLimits::default().max_index_bytes)]
    max_index_bytes: u64,
    /// Debug-level diagnostics
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,
    /// Only warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(cli: &Cli) {
    let default = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = if cli.verbose || cli.quiet {
        EnvFilter::new(default)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let identity =
        ModIdentity { name: cli.mod_name, author: cli.mod_author, version: cli.mod_version };
    let cfg = BuildConfig {
        mount_point: cli.mount_point,
        scope: cli.scope.into(),
        limits: IndexLimits { max_index_bytes: cli.max_index_bytes, ..IndexLimits::default() },
    };
    let manifest = build_manifest(&cli.path, identity, &cfg)
        .with_context(|| format!("analyze {}", cli.path.display()))?;
    write_manifest(&manifest, cli.output.as_deref(), std::io::stdout().lock())?;
    Ok(())
}
