//! ClawMiner CLI
//!
//! Process entry point: argument parsing, config loading, signal-driven
//! shutdown, and the wallet maintenance subcommands that operate on the
//! config store without booting the full daemon.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use clawminer_daemon::{AppConfig, Daemon};
use clawminer_wallet::Wallet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const WALLET_WIF_KEY: &str = "wallet_wif";

#[derive(Parser)]
#[command(name = "clawminer")]
#[command(about = "ClawMiner node daemon", version)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long = "config", value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Boot the full daemon (mining, gossip, HTTP API). Default if no subcommand is given.
    Run,
    /// Wallet maintenance: generate, import, or print the active address.
    Wallet {
        #[command(subcommand)]
        action: WalletAction,
    },
}

#[derive(Subcommand)]
enum WalletAction {
    /// Generate a fresh wallet and persist it as the active one.
    Generate,
    /// Import a wallet from a WIF-encoded secret key.
    Import {
        wif: String,
    },
    /// Print the active wallet's address without booting the daemon.
    Address,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "failed to load config");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(config),
        Commands::Wallet { action } => wallet_command(config, action),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fatal error");
            ExitCode::FAILURE
        }
    }
}

fn run(config: AppConfig) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let daemon = Daemon::bootstrap(config)?;
        let shutdown = CancellationToken::new();

        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("received shutdown signal");
                signal_token.cancel();
            }
        });

        daemon.run(shutdown).await?;
        Ok(())
    })
}

fn wallet_command(config: AppConfig, action: WalletAction) -> anyhow::Result<()> {
    let store = clawminer_store::Store::open(&config.data_dir)?;

    match action {
        WalletAction::Generate => {
            let wallet = Wallet::generate();
            store.set_config(WALLET_WIF_KEY, &wallet.wif())?;
            println!("{}", wallet.address());
        }
        WalletAction::Import { wif } => {
            let wallet = Wallet::load(&wif)?;
            store.set_config(WALLET_WIF_KEY, &wallet.wif())?;
            println!("{}", wallet.address());
        }
        WalletAction::Address => {
            let wif = store
                .get_config(WALLET_WIF_KEY)?
                .ok_or_else(|| anyhow::anyhow!("no wallet configured for this data directory"))?;
            let wallet = Wallet::load(&wif)?;
            println!("{}", wallet.address());
        }
    }

    Ok(())
}
