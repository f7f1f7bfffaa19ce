//! rpmorder CLI - build order resolution from RPM repository metadata.
//!
//! Loads a release's repository metadata into a local cache and answers
//! package, file and capability questions against it, or orders a set of
//! source packages into build waves.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rpmorder_config::{Config, Overrides};
use tracing_subscriber::EnvFilter;

mod cli;
mod error;

/// rpmorder: RPM build order resolution.
#[derive(Parser)]
#[command(name = "rpmorder")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (defaults to rpmorder.toml in the user configuration directory)
    #[arg(short, long, global = true, env = "RPMORDER_CONFIG")]
    config: Option<PathBuf>,

    /// Base URI releases are published under
    #[arg(long, global = true)]
    uri: Option<String>,

    /// Release version ("mash" for the floating snapshot)
    #[arg(short, long, global = true)]
    release: Option<String>,

    /// Local metadata cache directory
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Maximum simultaneous downloads
    #[arg(short = 'j', long, global = true)]
    max_concurrent: Option<usize>,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download any missing metadata for the release and open it
    Load,

    #[command(flatten)]
    Query(cli::query::Query),

    /// Order source packages into build waves
    Order {
        #[arg(required = true)]
        packages: Vec<String>,
    },
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            uri: self.uri.clone(),
            version: self.release.clone(),
            cache_dir: self.cache_dir.clone(),
            max_concurrent: self.max_concurrent,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::load(cli.config.as_deref(), &cli.overrides()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {}", error::ErrorKind::Config);
            eprintln!("{err:?}");
            return ExitCode::FAILURE;
        },
    };
    tracing::debug!(?config, "configuration loaded");

    let result = match cli.command {
        Commands::Load => cli::load::run(&config).await,
        Commands::Query(query) => cli::query::run(&config, query).await,
        Commands::Order { packages } => cli::order::run(&config, packages).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", *err);
            if err.is_retryable() {
                eprintln!("the failure may be transient; running the command again resumes where it stopped");
            }
            // Full error tree with locations.
            eprintln!("{err:?}");
            ExitCode::FAILURE
        },
    }
}
