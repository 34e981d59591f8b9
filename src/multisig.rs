//! Weighted multisignature descriptors.
//!
//! A weighted descriptor is expressed with plain `OP_CHECKMULTISIG` by
//! repeating each public key once per unit of weight. A signer with weight
//! `w` therefore contributes its signature `w` times.

use crate::bitcoin::blockdata::opcodes::all::OP_CHECKMULTISIG;
use crate::bitcoin::blockdata::script::Builder;
use crate::bitcoin::{PublicKey, ScriptBuf};
use crate::error::TxBuilderError;

/// Consensus limit on keys in a single `OP_CHECKMULTISIG`.
pub const MAX_MULTISIG_KEYS: u32 = 20;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MultisigEntry {
    pub public_key: PublicKey,
    pub weight: u32,
}

/// Ordered (public key, weight) pairs and a threshold. The multisig script is
/// built once at construction.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MultisigDescriptor {
    entries: Vec<MultisigEntry>,
    threshold: u32,
    script: ScriptBuf,
}

impl MultisigDescriptor {
    pub fn new(entries: Vec<MultisigEntry>, threshold: u32) -> Result<Self, TxBuilderError> {
        if threshold == 0 {
            return Err(TxBuilderError::InvalidMultisigDescriptor(
                "threshold must be at least 1".to_string(),
            ));
        }
        if let Some(index) = entries.iter().position(|e| e.weight == 0) {
            return Err(TxBuilderError::InvalidMultisigDescriptor(format!(
                "entry {} has zero weight",
                index
            )));
        }
        let total_weight = entries
            .iter()
            .try_fold(0u32, |total, e| total.checked_add(e.weight))
            .ok_or_else(|| {
                TxBuilderError::InvalidMultisigDescriptor("total weight overflows".to_string())
            })?;
        if total_weight < threshold {
            return Err(TxBuilderError::InvalidMultisigDescriptor(format!(
                "total weight {} is below threshold {}",
                total_weight, threshold
            )));
        }
        if total_weight > MAX_MULTISIG_KEYS {
            return Err(TxBuilderError::InvalidMultisigDescriptor(format!(
                "total weight {} exceeds {} keys",
                total_weight, MAX_MULTISIG_KEYS
            )));
        }
        let script = build_weighted_multisig_script(&entries, threshold, total_weight);
        Ok(MultisigDescriptor {
            entries,
            threshold,
            script,
        })
    }

    /// Unweighted m-of-n descriptor.
    pub fn m_of_n(public_keys: Vec<PublicKey>, threshold: u32) -> Result<Self, TxBuilderError> {
        let entries = public_keys
            .into_iter()
            .map(|public_key| MultisigEntry {
                public_key,
                weight: 1,
            })
            .collect();
        MultisigDescriptor::new(entries, threshold)
    }

    pub fn entries(&self) -> &[MultisigEntry] {
        &self.entries
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn total_weight(&self) -> u32 {
        self.entries.iter().map(|e| e.weight).sum()
    }

    /// The `OP_CHECKMULTISIG` script (redeem or witness script).
    pub fn script(&self) -> &ScriptBuf {
        &self.script
    }
}

fn build_weighted_multisig_script(
    entries: &[MultisigEntry],
    threshold: u32,
    total_weight: u32,
) -> ScriptBuf {
    let mut builder = Builder::new().push_int(threshold as i64);
    for entry in entries {
        for _ in 0..entry.weight {
            builder = builder.push_key(&entry.public_key);
        }
    }
    builder
        .push_int(total_weight as i64)
        .push_opcode(OP_CHECKMULTISIG)
        .into_script()
}

/// Accumulates signatures in descriptor order until the threshold weight is
/// reached.
///
/// Empty signatures mean the signer declined and contribute nothing. Each
/// non-empty signature is appended once per unit of weight, capped at
/// `threshold` signatures in total.
#[derive(Debug)]
pub struct SignatureCollector<'a> {
    descriptor: &'a MultisigDescriptor,
    weight: u32,
    signatures: Vec<Vec<u8>>,
}

impl<'a> SignatureCollector<'a> {
    pub fn new(descriptor: &'a MultisigDescriptor) -> Self {
        SignatureCollector {
            descriptor,
            weight: 0,
            signatures: Vec::with_capacity(descriptor.threshold as usize),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.weight >= self.descriptor.threshold
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// Record the response for the entry with the given weight.
    pub fn offer(&mut self, weight: u32, signature: Vec<u8>) {
        if signature.is_empty() {
            return;
        }
        self.weight += weight;
        for _ in 0..weight {
            if self.signatures.len() >= self.descriptor.threshold as usize {
                break;
            }
            self.signatures.push(signature.clone());
        }
    }

    pub fn finish(self, input_index: usize) -> Result<Vec<Vec<u8>>, TxBuilderError> {
        if !self.is_complete() {
            return Err(TxBuilderError::InsufficientMultisigWeight {
                input_index,
                collected: self.weight,
                threshold: self.descriptor.threshold,
            });
        }
        Ok(self.signatures)
    }
}
