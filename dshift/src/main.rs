//! The dshift command line.
//!
//! `dshift insert` appends the rows each source table gained since the last run, `dshift
//! update` revisits every row and upserts the changed ones. Both resume from the offsets kept
//! in the target database.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Once;

use clap::{Parser, Subcommand};
use config::load_config_from_path;
use config::shared::ShiftConfig;
use shift::engine::WriteMode;
use telemetry::tracing::init_tracing;
use tracing::error;

use crate::core::start_shift;
use crate::error::{DshiftError, DshiftResult};

mod core;
mod error;

#[derive(Parser)]
#[command(name = "dshift")]
#[command(about = "Shift data from one database to another")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert data from one database into another
    Insert {
        /// Absolute or relative path to the config file
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Bring the target database up-to-date with the source database
    Update {
        /// Absolute or relative path to the config file
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Print dshift version information
    Version,
}

static INIT_CRYPTO: Once = Once::new();

fn install_crypto_provider() {
    INIT_CRYPTO.call_once(|| {
        // Errors when a provider is already installed.
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    });
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let (config_path, mode) = match cli.command {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            return ExitCode::SUCCESS;
        }
        Commands::Insert { config } => (config, WriteMode::Append),
        Commands::Update { config } => (config, WriteMode::Merge),
    };

    match run(&config_path, mode) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprint!("{}", err.render_report());
            ExitCode::from(err.exit_code())
        }
    }
}

fn load_shift_config(path: &Path) -> DshiftResult<ShiftConfig> {
    let config = load_config_from_path::<ShiftConfig>(path)?;
    config.validate()?;

    Ok(config)
}

fn run(config_path: &Path, mode: WriteMode) -> DshiftResult<()> {
    install_crypto_provider();

    let config = load_shift_config(config_path)?;

    let _log_flusher = init_tracing(env!("CARGO_BIN_NAME")).map_err(DshiftError::config)?;

    // Tables are shifted one after the other, a single thread is enough.
    let result = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(start_shift(config, mode));

    if let Err(err) = &result {
        error!(%mode, "{err}");
    }

    result.map(|_| ())
}
