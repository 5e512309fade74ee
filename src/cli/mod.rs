use crate::errors::AppResult;
use clap::{Parser, Subcommand};

pub mod commands;

/// P2FMS Ticket Transport and Registry
#[derive(Parser)]
#[command(name = "ticket-carry")]
#[command(about = "P2FMS ticket transport and registry")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Decode the embedded ticket payload from a raw transaction
    DecodeTx(commands::decode::DecodeTxCommand),
    /// Look up an identity registration by identity string
    FindIdentity(commands::registry::FindIdentityCommand),
    /// List all registered identity strings
    ListIdentities(commands::registry::ListIdentitiesCommand),
    /// Check ticket existence by primary or secondary key
    Exists(commands::registry::ExistsCommand),
}

pub fn run() -> AppResult<()> {
    // Initialise tracing subscriber to capture info!() macros
    // Uses RUST_LOG environment variable (defaults to "error" if not set)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("error")),
        )
        .try_init();

    let cli = Cli::parse();

    match cli.command {
        Commands::DecodeTx(command) => command.run(),
        Commands::FindIdentity(command) => command.run(),
        Commands::ListIdentities(command) => command.run(),
        Commands::Exists(command) => command.run(),
    }
}
