//! Input and output ordering policies and sequence assignment.

use std::cmp::Ordering;
use std::str::FromStr;

use rand::seq::SliceRandom;

use crate::bitcoin::hashes::Hash;
use crate::bitcoin::{OutPoint, Sequence};
use crate::error::TxBuilderError;
use crate::opcodes::{DEFAULT_SEQUENCE, LOCKTIME_SEQUENCE, RBF_SEQUENCE};
use crate::utxo::{OutputSpec, Utxo};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum OrderingPolicy {
    /// BIP-69
    #[default]
    Lexicographic,
    /// Uniform random permutation. Never used for estimation.
    Randomized,
    AsGiven,
}

impl FromStr for OrderingPolicy {
    type Err = TxBuilderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lexicographic" | "bip69" => Ok(OrderingPolicy::Lexicographic),
            "randomized" | "random" => Ok(OrderingPolicy::Randomized),
            "asGiven" | "none" => Ok(OrderingPolicy::AsGiven),
            _ => Err(TxBuilderError::InvalidArgument(format!(
                "Unknown ordering '{}'. Expected: lexicographic, randomized, asGiven",
                s
            ))),
        }
    }
}

/// BIP-69 input order: previous txid as displayed (reversed wire bytes),
/// then output index.
pub fn compare_outpoints(a: &OutPoint, b: &OutPoint) -> Ordering {
    let mut a_txid = a.txid.to_byte_array();
    let mut b_txid = b.txid.to_byte_array();
    a_txid.reverse();
    b_txid.reverse();
    a_txid.cmp(&b_txid).then(a.vout.cmp(&b.vout))
}

/// Returns a new ordered list; `utxos` is left untouched.
pub fn order_inputs(utxos: &[Utxo], policy: OrderingPolicy) -> Vec<Utxo> {
    let mut ordered = utxos.to_vec();
    match policy {
        OrderingPolicy::Lexicographic => {
            ordered.sort_by(|a, b| compare_outpoints(&a.outpoint, &b.outpoint))
        }
        OrderingPolicy::Randomized => ordered.shuffle(&mut rand::thread_rng()),
        OrderingPolicy::AsGiven => {}
    }
    ordered
}

/// BIP-69 output order: value, then serialized locking bytecode compared
/// byte-wise. Token prefixes are part of the compared bytes.
pub fn order_outputs(
    outputs: &[OutputSpec],
    policy: OrderingPolicy,
) -> Result<Vec<OutputSpec>, TxBuilderError> {
    match policy {
        OrderingPolicy::Lexicographic => {
            let mut keyed = outputs
                .iter()
                .map(|output| Ok((output.script_pubkey()?, output.clone())))
                .collect::<Result<Vec<_>, TxBuilderError>>()?;
            keyed.sort_by(|(a_script, a), (b_script, b)| {
                a.value
                    .cmp(&b.value)
                    .then_with(|| a_script.as_bytes().cmp(b_script.as_bytes()))
            });
            Ok(keyed.into_iter().map(|(_, output)| output).collect())
        }
        OrderingPolicy::Randomized => {
            let mut ordered = outputs.to_vec();
            ordered.shuffle(&mut rand::thread_rng());
            Ok(ordered)
        }
        OrderingPolicy::AsGiven => Ok(outputs.to_vec()),
    }
}

/// Sequence numbers for already ordered inputs.
///
/// Inputs default to final, or to lock-time enabling when a lock time is set.
/// With RBF the first input signals replaceability.
pub fn sequences(input_count: usize, lock_time: bool, rbf: bool) -> Vec<Sequence> {
    let default = if lock_time {
        LOCKTIME_SEQUENCE
    } else {
        DEFAULT_SEQUENCE
    };
    let mut sequences = vec![Sequence::from_consensus(u32::from_le_bytes(default)); input_count];
    if rbf {
        if let Some(first) = sequences.first_mut() {
            *first = Sequence::from_consensus(u32::from_le_bytes(RBF_SEQUENCE));
        }
    }
    sequences
}
