//! Multisig Signer CLI Application
//!
//! Signs transfers from a threshold composite key and broadcasts them.

use clap::{Parser, Subcommand};
use multisig_signer::cli::{self, AppState};
use multisig_signer::config::DEFAULT_CONFIG_FILE;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "multisig")]
#[command(version = "0.1.0")]
#[command(about = "Threshold-signed Terra transfers with a remote signer and a Cloud KMS key", long_about = None)]
struct Cli {
    /// Key-info config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the composite key and its address
    Address,

    /// Sign and broadcast a transfer
    Send {
        /// Recipient address
        #[arg(short, long)]
        to: String,

        /// Amount with denom, e.g. 1000uluna or 1uluna,20uusd
        #[arg(short, long)]
        amount: String,

        /// Transaction memo
        #[arg(short, long, default_value = "")]
        memo: String,

        /// Print the signed transaction instead of broadcasting it
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let state = AppState::new(&cli.config)?;

    match cli.command {
        Commands::Address => {
            cli::cmd_address(&state)?;
        }

        Commands::Send {
            to,
            amount,
            memo,
            dry_run,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(cli::cmd_send(&state, &to, &amount, &memo, dry_run))?;
        }
    }

    Ok(())
}
