use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use wasm_txbuilder::bitcoin::consensus::encode::serialize_hex;
use wasm_txbuilder::bitcoin::Transaction;
use wasm_txbuilder::{build_transaction, Network};

use crate::input::read_json;
use crate::network::{resolve_network, NetworkArg};
use crate::request::RequestJson;
use crate::signer::KeySigner;

#[derive(Subcommand)]
pub enum TxCommand {
    /// Build and sign a transaction from a JSON request
    Build {
        /// Path to the request JSON (use '-' to read from stdin)
        request: PathBuf,
        /// JSON array of private keys (WIF or 32-byte hex)
        #[arg(long, short)]
        keys: PathBuf,
        /// Overrides the request's network
        #[arg(long, short, value_enum)]
        network: Option<NetworkArg>,
    },
    /// Estimate the size of a transaction without signing it
    Estimate {
        /// Path to the request JSON (use '-' to read from stdin)
        request: PathBuf,
        /// Overrides the request's network
        #[arg(long, short, value_enum)]
        network: Option<NetworkArg>,
    },
}

#[derive(Debug, Serialize)]
pub struct BuiltTransaction {
    pub tx: String,
    pub txid: String,
    pub size: usize,
    pub vsize: usize,
}

impl From<&Transaction> for BuiltTransaction {
    fn from(tx: &Transaction) -> Self {
        BuiltTransaction {
            tx: serialize_hex(tx),
            txid: tx.compute_txid().to_string(),
            size: tx.total_size(),
            vsize: tx.vsize(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SizeEstimate {
    pub size: usize,
    pub vsize: usize,
}

fn build(request: PathBuf, keys: PathBuf, network: Option<Network>) -> Result<BuiltTransaction> {
    let request = read_json::<RequestJson>(&request, "request")?.to_request(network)?;
    let keys: Vec<String> = read_json(&keys, "keys")?;
    let signer = KeySigner::from_strings(&keys)?;
    for public_key in signer.public_keys() {
        tracing::debug!(%public_key, "loaded signing key");
    }
    let tx = build_transaction(&request, &signer)?;
    tracing::info!(txid = %tx.compute_txid(), "built transaction");
    Ok(BuiltTransaction::from(&tx))
}

fn estimate(request: PathBuf, network: Option<Network>) -> Result<SizeEstimate> {
    let request = read_json::<RequestJson>(&request, "request")?.to_request(network)?;
    Ok(SizeEstimate {
        size: request.estimate_size()?,
        vsize: request.estimate_vsize()?,
    })
}

pub fn handle_command(command: TxCommand) -> Result<()> {
    let output = match command {
        TxCommand::Build {
            request,
            keys,
            network,
        } => serde_json::to_string_pretty(&build(request, keys, resolve_network(network)?)?)?,
        TxCommand::Estimate { request, network } => {
            serde_json::to_string_pretty(&estimate(request, resolve_network(network)?)?)?
        }
    };
    println!("{}", output);
    Ok(())
}
