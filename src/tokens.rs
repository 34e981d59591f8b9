//! CashTokens payloads carried by UTXOs and token-aware outputs.
//!
//! Tokens are serialized as a prefix in front of the locking bytecode:
//! `0xef || category || bitfield || [commitment] || [amount]`.

use std::fmt;
use std::str::FromStr;

use crate::bitcoin::consensus::encode::serialize;
use crate::bitcoin::hashes::Hash;
use crate::bitcoin::{Script, ScriptBuf, Txid, VarInt};
use crate::error::TxBuilderError;

pub const PREFIX_TOKEN: u8 = 0xef;
pub const TOKEN_HAS_AMOUNT: u8 = 0x10;
pub const TOKEN_HAS_NFT: u8 = 0x20;
pub const TOKEN_HAS_COMMITMENT: u8 = 0x40;
pub const MAX_COMMITMENT_LENGTH: usize = 40;
pub const MAX_FUNGIBLE_AMOUNT: u64 = i64::MAX as u64;

/// Token category id: the txid of the genesis transaction.
///
/// Stored in serialization byte order; parsed and displayed reversed like txids.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TokenCategory([u8; 32]);

impl TokenCategory {
    pub fn from_wire_bytes(bytes: [u8; 32]) -> Self {
        TokenCategory(bytes)
    }

    pub fn from_genesis_txid(txid: Txid) -> Self {
        TokenCategory(txid.to_byte_array())
    }

    pub fn wire_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TokenCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut display = self.0;
        display.reverse();
        write!(f, "{}", hex::encode(display))
    }
}

impl FromStr for TokenCategory {
    type Err = TxBuilderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes: [u8; 32] = hex::decode(s)
            .ok()
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| {
                TxBuilderError::InvalidTokenCategory(format!("expected 32 byte hex, got '{}'", s))
            })?;
        bytes.reverse();
        Ok(TokenCategory(bytes))
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum NftCapability {
    None,
    Mutable,
    Minting,
}

impl NftCapability {
    fn bits(self) -> u8 {
        match self {
            NftCapability::None => 0x00,
            NftCapability::Mutable => 0x01,
            NftCapability::Minting => 0x02,
        }
    }
}

impl FromStr for NftCapability {
    type Err = TxBuilderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(NftCapability::None),
            "mutable" => Ok(NftCapability::Mutable),
            "minting" => Ok(NftCapability::Minting),
            _ => Err(TxBuilderError::InvalidArgument(format!(
                "Unknown NFT capability '{}'. Expected: none, mutable, minting",
                s
            ))),
        }
    }
}

/// Token payload of a UTXO or output. Absence of tokens is `Option::None`
/// at the use site.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum TokenPayload {
    Fungible {
        category: TokenCategory,
        amount: u64,
    },
    Nft {
        category: TokenCategory,
        capability: NftCapability,
        commitment: Vec<u8>,
    },
}

impl TokenPayload {
    pub fn category(&self) -> &TokenCategory {
        match self {
            TokenPayload::Fungible { category, .. } => category,
            TokenPayload::Nft { category, .. } => category,
        }
    }

    /// Fungible amount, zero for NFTs.
    pub fn fungible_amount(&self) -> u64 {
        match self {
            TokenPayload::Fungible { amount, .. } => *amount,
            TokenPayload::Nft { .. } => 0,
        }
    }

    pub fn is_nft(&self) -> bool {
        matches!(self, TokenPayload::Nft { .. })
    }

    pub fn check(&self) -> Result<(), TxBuilderError> {
        match self {
            TokenPayload::Fungible { category, amount } => {
                if *amount == 0 || *amount > MAX_FUNGIBLE_AMOUNT {
                    return Err(TxBuilderError::InvalidArgument(format!(
                        "Fungible amount {} of category {} out of range",
                        amount, category
                    )));
                }
            }
            TokenPayload::Nft {
                category,
                commitment,
                ..
            } => {
                if commitment.len() > MAX_COMMITMENT_LENGTH {
                    return Err(TxBuilderError::InvalidArgument(format!(
                        "NFT commitment of category {} is {} bytes, at most {} allowed",
                        category,
                        commitment.len(),
                        MAX_COMMITMENT_LENGTH
                    )));
                }
            }
        }
        Ok(())
    }

    /// Serialized token prefix.
    pub fn prefix(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + 32 + 1 + 9 + MAX_COMMITMENT_LENGTH);
        out.push(PREFIX_TOKEN);
        out.extend_from_slice(self.category().wire_bytes());
        match self {
            TokenPayload::Fungible { amount, .. } => {
                out.push(TOKEN_HAS_AMOUNT);
                out.extend(serialize(&VarInt(*amount)));
            }
            TokenPayload::Nft {
                capability,
                commitment,
                ..
            } => {
                if commitment.is_empty() {
                    out.push(TOKEN_HAS_NFT | capability.bits());
                } else {
                    out.push(TOKEN_HAS_NFT | TOKEN_HAS_COMMITMENT | capability.bits());
                    out.extend(serialize(&VarInt(commitment.len() as u64)));
                    out.extend_from_slice(commitment);
                }
            }
        }
        out
    }
}

/// Locking bytecode as it appears on the wire: token prefix, if any,
/// followed by the script.
pub fn token_prefixed_script(token: Option<&TokenPayload>, script: &Script) -> ScriptBuf {
    match token {
        Some(token) => {
            let mut bytes = token.prefix();
            bytes.extend_from_slice(script.as_bytes());
            ScriptBuf::from_bytes(bytes)
        }
        None => script.to_owned(),
    }
}

/// Explicit declaration that tokens of a category are destroyed.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct TokenBurn {
    pub category: TokenCategory,
    /// Fungible amount destroyed.
    pub amount: u64,
    /// Transaction that created the NFT being destroyed, if any.
    pub nft_source: Option<Txid>,
}
