//! Taproot control blocks for script-path spends.

use crate::bitcoin::secp256k1::{Parity, XOnlyPublicKey};
use crate::bitcoin::taproot::LeafVersion;
use crate::bitcoin::PublicKey;
use crate::error::TxBuilderError;

/// `leaf version | parity`, x-only internal key, merkle path.
///
/// The merkle path is taken verbatim; checking its structure is up to the
/// caller. An empty path means the key's script is the only leaf.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ControlBlock {
    leaf_version: LeafVersion,
    output_key_parity: Parity,
    internal_key: XOnlyPublicKey,
    merkle_path: Vec<u8>,
}

impl ControlBlock {
    pub fn new(internal_key: XOnlyPublicKey, merkle_path: Vec<u8>) -> Self {
        ControlBlock {
            leaf_version: LeafVersion::TapScript,
            output_key_parity: Parity::Even,
            internal_key,
            merkle_path,
        }
    }

    pub fn from_public_key(public_key: &PublicKey, merkle_path: Vec<u8>) -> Self {
        ControlBlock::new(XOnlyPublicKey::from(public_key.inner), merkle_path)
    }

    /// Accepts a 33 byte compressed key or a 32 byte x-only key.
    pub fn from_key_bytes(key: &[u8], merkle_path: Vec<u8>) -> Result<Self, TxBuilderError> {
        let internal_key = match key.len() {
            32 => XOnlyPublicKey::from_slice(key)
                .map_err(|e| TxBuilderError::InvalidPublicKey(e.to_string()))?,
            _ => {
                let public_key = PublicKey::from_slice(key)
                    .map_err(|e| TxBuilderError::InvalidPublicKey(e.to_string()))?;
                XOnlyPublicKey::from(public_key.inner)
            }
        };
        Ok(ControlBlock::new(internal_key, merkle_path))
    }

    pub fn with_output_key_parity(mut self, parity: Parity) -> Self {
        self.output_key_parity = parity;
        self
    }

    pub fn with_leaf_version(mut self, leaf_version: LeafVersion) -> Self {
        self.leaf_version = leaf_version;
        self
    }

    pub fn serialized_len(&self) -> usize {
        1 + 32 + self.merkle_path.len()
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.serialized_len());
        out.push(self.leaf_version.to_consensus() | self.output_key_parity.to_u8());
        out.extend_from_slice(&self.internal_key.serialize());
        out.extend_from_slice(&self.merkle_path);
        out
    }
}

/// Control block with the tapscript leaf version and even output key parity.
pub fn build(public_key: &PublicKey, merkle_path: &[u8]) -> Vec<u8> {
    ControlBlock::from_public_key(public_key, merkle_path.to_vec()).serialize()
}
