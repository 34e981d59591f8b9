use tracing::debug;

use crate::bitcoin::consensus::encode::serialize;
use crate::bitcoin::Transaction;
use crate::error::TxBuilderError;
use crate::networks::Network;
use crate::ordering::OrderingPolicy;
use crate::signer::PlaceholderSigner;
use crate::utxo::{OutputSpec, Utxo};

use super::{build_transaction, BuildRequest};

/// Total supply in base units. Used as the fee of estimation drafts so that
/// no real fee can exceed it.
pub const PLACEHOLDER_FEE: u64 = 21_000_000 * 100_000_000;

/// Estimation variant of a request: dry run with the placeholder fee and the
/// caller's order kept so the result is reproducible.
pub fn placeholder_request(request: &BuildRequest) -> BuildRequest {
    BuildRequest {
        fee: PLACEHOLDER_FEE,
        dry_run: true,
        input_ordering: OrderingPolicy::AsGiven,
        output_ordering: OrderingPolicy::AsGiven,
        ..request.clone()
    }
}

fn placeholder_transaction(request: &BuildRequest) -> Result<Transaction, TxBuilderError> {
    build_transaction(&placeholder_request(request), &PlaceholderSigner)
}

/// Serialized size in bytes of the transaction with filler signatures.
pub fn estimate_size(
    utxos: &[Utxo],
    outputs: &[OutputSpec],
    network: Network,
) -> Result<usize, TxBuilderError> {
    BuildRequest::new(utxos.to_vec(), outputs.to_vec(), 0, network).estimate_size()
}

/// Virtual size (weight / 4, rounded up) of the transaction with filler
/// signatures.
pub fn estimate_vsize(
    utxos: &[Utxo],
    outputs: &[OutputSpec],
    network: Network,
) -> Result<usize, TxBuilderError> {
    BuildRequest::new(utxos.to_vec(), outputs.to_vec(), 0, network).estimate_vsize()
}

impl BuildRequest {
    /// Size estimate that also accounts for memo, lock time and version.
    pub fn estimate_size(&self) -> Result<usize, TxBuilderError> {
        let size = serialize(&placeholder_transaction(self)?).len();
        debug!(size, "estimated size");
        Ok(size)
    }

    pub fn estimate_vsize(&self) -> Result<usize, TxBuilderError> {
        let vsize = placeholder_transaction(self)?.vsize();
        debug!(vsize, "estimated vsize");
        Ok(vsize)
    }
}
