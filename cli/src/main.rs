use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod input;
mod network;
mod request;
mod script;
mod signer;
mod tx;

#[derive(Parser)]
#[command(name = "wasm-txbuilder-cli")]
#[command(about = "Build, sign and estimate UTXO transactions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transaction building commands
    Tx {
        #[command(subcommand)]
        command: tx::TxCommand,
    },
    /// Script inspection commands
    Script {
        #[command(subcommand)]
        command: script::ScriptCommand,
    },
}

/// Logs go to stderr so that stdout stays machine-readable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Tx { command } => tx::handle_command(command),
        Commands::Script { command } => script::handle_command(command),
    }
}
