//! Signature digests.
//!
//! Three schemes are produced:
//! - `Legacy`: the original sighash algorithm, for non-segwit inputs on chains
//!   without a fork id.
//! - `WitnessV0`: BIP143, for segwit inputs on chains without a fork id.
//! - `ForkId`: BIP143 with the fork bits in the sighash value, for every input
//!   on replay-protected chains. Token prefixes of the spent output are
//!   committed ahead of the script code.

use std::fmt;
use std::str::FromStr;

use crate::bitcoin::consensus::encode::serialize;
use crate::bitcoin::hashes::{sha256d, Hash};
use crate::bitcoin::sighash::{EcdsaSighashType, SighashCache};
use crate::bitcoin::{Amount, Script, Transaction, VarInt};
use crate::error::TxBuilderError;
use crate::networks::NetworkCapabilities;
use crate::opcodes::{
    SIGHASH_ALL, SIGHASH_ANYONECANPAY, SIGHASH_BASE_MASK, SIGHASH_NONE, SIGHASH_SINGLE,
};
use crate::script_type::ScriptType;
use crate::tokens::TokenPayload;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum SighashBase {
    #[default]
    All,
    None,
    Single,
}

/// Base flag plus ANYONECANPAY. Fork bits are added per network by
/// [`SighashType::to_u32`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct SighashType {
    pub base: SighashBase,
    pub anyone_can_pay: bool,
}

impl SighashType {
    pub const ALL: SighashType = SighashType {
        base: SighashBase::All,
        anyone_can_pay: false,
    };

    /// Sighash value for the network. Identical for every input of a
    /// transaction.
    pub fn to_u32(&self, capabilities: &NetworkCapabilities) -> u32 {
        let base = match self.base {
            SighashBase::All => SIGHASH_ALL,
            SighashBase::None => SIGHASH_NONE,
            SighashBase::Single => SIGHASH_SINGLE,
        };
        let acp = if self.anyone_can_pay {
            SIGHASH_ANYONECANPAY
        } else {
            0
        };
        base | acp | capabilities.sighash_fork_bits()
    }
}

impl fmt::Display for SighashType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = match self.base {
            SighashBase::All => "ALL",
            SighashBase::None => "NONE",
            SighashBase::Single => "SINGLE",
        };
        if self.anyone_can_pay {
            write!(f, "{}|ANYONECANPAY", base)
        } else {
            write!(f, "{}", base)
        }
    }
}

impl FromStr for SighashType {
    type Err = TxBuilderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        let (base, anyone_can_pay) = match upper.strip_suffix("|ANYONECANPAY") {
            Some(base) => (base, true),
            None => (upper.as_str(), false),
        };
        let base = match base {
            "ALL" => SighashBase::All,
            "NONE" => SighashBase::None,
            "SINGLE" => SighashBase::Single,
            _ => {
                return Err(TxBuilderError::InvalidArgument(format!(
                    "Unknown sighash type '{}'. Expected: ALL, NONE, SINGLE, optionally with |ANYONECANPAY",
                    s
                )))
            }
        };
        Ok(SighashType {
            base,
            anyone_can_pay,
        })
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DigestScheme {
    Legacy,
    WitnessV0,
    ForkId,
}

impl DigestScheme {
    pub fn select(script_type: ScriptType, capabilities: &NetworkCapabilities) -> DigestScheme {
        if capabilities.uses_fork_id() {
            DigestScheme::ForkId
        } else if script_type.is_segwit() {
            DigestScheme::WitnessV0
        } else {
            DigestScheme::Legacy
        }
    }
}

/// What the signature commits to about the output being spent.
#[derive(Debug, Clone, Copy)]
pub struct SpentOutput<'a> {
    pub script_code: &'a Script,
    pub value: u64,
    pub token: Option<&'a TokenPayload>,
}

/// Digest of input `input_index` of `tx`.
///
/// `tx` must already carry its final input order, sequences and outputs.
/// Unlocking data of other inputs is ignored by every scheme.
pub fn signature_hash(
    tx: &Transaction,
    input_index: usize,
    spent: &SpentOutput,
    sighash: u32,
    scheme: DigestScheme,
) -> Result<[u8; 32], TxBuilderError> {
    if input_index >= tx.input.len() {
        return Err(TxBuilderError::Sighash(format!(
            "input index {} out of range (tx has {} inputs)",
            input_index,
            tx.input.len()
        )));
    }
    match scheme {
        DigestScheme::Legacy => {
            let cache = SighashCache::new(tx);
            let hash = cache
                .legacy_signature_hash(input_index, spent.script_code, sighash)
                .map_err(|e| TxBuilderError::Sighash(e.to_string()))?;
            Ok(hash.to_byte_array())
        }
        DigestScheme::WitnessV0 => {
            let mut cache = SighashCache::new(tx);
            let hash = cache
                .p2wsh_signature_hash(
                    input_index,
                    spent.script_code,
                    Amount::from_sat(spent.value),
                    EcdsaSighashType::from_consensus(sighash),
                )
                .map_err(|e| TxBuilderError::Sighash(e.to_string()))?;
            Ok(hash.to_byte_array())
        }
        DigestScheme::ForkId => {
            let preimage = fork_id_preimage(tx, input_index, spent, sighash);
            Ok(sha256d::Hash::hash(&preimage).to_byte_array())
        }
    }
}

/// BIP143 layout with the full sighash value (fork bits included) and the
/// spent output's token prefix ahead of the script code. Callers check
/// `input_index`.
fn fork_id_preimage(
    tx: &Transaction,
    input_index: usize,
    spent: &SpentOutput,
    sighash: u32,
) -> Vec<u8> {
    let base = sighash & SIGHASH_BASE_MASK;
    let anyone_can_pay = sighash & SIGHASH_ANYONECANPAY != 0;
    let input = &tx.input[input_index];

    let hash_prevouts = if anyone_can_pay {
        [0u8; 32]
    } else {
        let mut data = Vec::with_capacity(tx.input.len() * 36);
        for txin in &tx.input {
            data.extend(serialize(&txin.previous_output));
        }
        sha256d::Hash::hash(&data).to_byte_array()
    };

    let hash_sequence = if anyone_can_pay || base == SIGHASH_SINGLE || base == SIGHASH_NONE {
        [0u8; 32]
    } else {
        let mut data = Vec::with_capacity(tx.input.len() * 4);
        for txin in &tx.input {
            data.extend(serialize(&txin.sequence));
        }
        sha256d::Hash::hash(&data).to_byte_array()
    };

    let hash_outputs = if base != SIGHASH_SINGLE && base != SIGHASH_NONE {
        let mut data = Vec::new();
        for txout in &tx.output {
            data.extend(serialize(txout));
        }
        sha256d::Hash::hash(&data).to_byte_array()
    } else if base == SIGHASH_SINGLE && input_index < tx.output.len() {
        sha256d::Hash::hash(&serialize(&tx.output[input_index])).to_byte_array()
    } else {
        [0u8; 32]
    };

    let mut preimage = Vec::with_capacity(256);
    preimage.extend(serialize(&tx.version));
    preimage.extend_from_slice(&hash_prevouts);
    preimage.extend_from_slice(&hash_sequence);
    preimage.extend(serialize(&input.previous_output));
    if let Some(token) = spent.token {
        preimage.extend(token.prefix());
    }
    preimage.extend(serialize(&VarInt(spent.script_code.len() as u64)));
    preimage.extend_from_slice(spent.script_code.as_bytes());
    preimage.extend_from_slice(&spent.value.to_le_bytes());
    preimage.extend(serialize(&input.sequence));
    preimage.extend_from_slice(&hash_outputs);
    preimage.extend(serialize(&tx.lock_time));
    preimage.extend_from_slice(&sighash.to_le_bytes());
    preimage
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitcoin::absolute::LockTime;
    use crate::bitcoin::sighash::EcdsaSighashType;
    use crate::bitcoin::transaction::Version;
    use crate::bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, TxIn, TxOut, Txid, Witness};
    use crate::networks::Network;
    use crate::tokens::TokenCategory;
    use rstest::rstest;

    fn sample_tx() -> Transaction {
        let input = |byte: u8, sequence: u32| TxIn {
            previous_output: OutPoint::new(Txid::from_byte_array([byte; 32]), byte as u32),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::from_consensus(sequence),
            witness: Witness::new(),
        };
        Transaction {
            version: Version::TWO,
            lock_time: LockTime::from_consensus(650_000),
            input: vec![input(1, 0xfffffffd), input(2, 0xfffffffe)],
            output: vec![
                TxOut {
                    value: Amount::from_sat(40_000),
                    script_pubkey: ScriptBuf::from_hex(
                        "76a9141d0f172a0ecb48aee1be1f2687d2963ae33f71a188ac",
                    )
                    .unwrap(),
                },
                TxOut {
                    value: Amount::from_sat(55_000),
                    script_pubkey: ScriptBuf::from_bytes(vec![0x51]),
                },
            ],
        }
    }

    fn script_code() -> ScriptBuf {
        ScriptBuf::from_hex("76a91479091972186c449eb1ded22b78e40d009bdf008988ac").unwrap()
    }

    #[rstest]
    #[case(EcdsaSighashType::All)]
    #[case(EcdsaSighashType::None)]
    #[case(EcdsaSighashType::Single)]
    #[case(EcdsaSighashType::AllPlusAnyoneCanPay)]
    #[case(EcdsaSighashType::SinglePlusAnyoneCanPay)]
    fn test_fork_id_layout_without_fork_bits_is_bip143(#[case] sighash_type: EcdsaSighashType) {
        let tx = sample_tx();
        let script = script_code();
        let spent = SpentOutput {
            script_code: &script,
            value: 100_000,
            token: None,
        };
        for index in 0..tx.input.len() {
            let ours = signature_hash(
                &tx,
                index,
                &spent,
                sighash_type.to_u32(),
                DigestScheme::ForkId,
            )
            .unwrap();
            let witness = signature_hash(
                &tx,
                index,
                &spent,
                sighash_type.to_u32(),
                DigestScheme::WitnessV0,
            )
            .unwrap();
            assert_eq!(ours, witness, "input {}", index);
        }
    }

    /// Unsigned transaction and input 1 of the BIP143 native P2WPKH example.
    const BIP143_TX: &str = "0100000002fff7f7881a8099afa6940d42d1e7f6362bec38171ea3edf433541db4e4ad969f0000000000eeffffffef51e1b804cc89d182d279655c3aa89e815b1b309fe287d9b2b55d57b90ec68a0100000000ffffffff02202cb206000000001976a9148280b37df378db99f66f85c95a783a76ac7a6d5988ac9093510d000000001976a9143bde42dbee7e4dbe6a21b2d50ce2f0167faa815988ac11000000";
    const BIP143_SCRIPT_CODE: &str = "76a9141d0f172a0ecb48aee1be1f2687d2963ae33f71a188ac";
    const BIP143_VALUE: u64 = 600_000_000;

    fn fungible_token() -> TokenPayload {
        TokenPayload::Fungible {
            category: TokenCategory::from_wire_bytes([7; 32]),
            amount: 1000,
        }
    }

    fn minting_nft() -> TokenPayload {
        TokenPayload::Nft {
            category: TokenCategory::from_wire_bytes([7; 32]),
            capability: crate::tokens::NftCapability::Minting,
            commitment: vec![0xca, 0xfe],
        }
    }

    // Digests in hash byte order (as signed), not reversed for display.
    #[rstest]
    #[case::bip143_all(
        DigestScheme::WitnessV0,
        0x01,
        None,
        "c37af31116d1b27caf68aae9e3ac82f1477929014d5b917657d0eb49478cb670"
    )]
    #[case::bch_all_forkid(
        DigestScheme::ForkId,
        0x41,
        None,
        "467f411d178762db122a6aced76370a1c8324355bf0796502bf82eeaeda86a35"
    )]
    #[case::btg_all_forkid(
        DigestScheme::ForkId,
        0x4f41,
        None,
        "ea17a12fdb294cec9fa3c005e453b62ac6c3d68c87d1f9b8a7baaf7f5170751a"
    )]
    #[case::bch_fungible_token(
        DigestScheme::ForkId,
        0x41,
        Some(fungible_token()),
        "dafdc6d8e1925feb4194bde2ece55405e5001b3be15d0355d8c09850c6ac51a9"
    )]
    #[case::bch_nft_anyonecanpay(
        DigestScheme::ForkId,
        0xc1,
        Some(minting_nft()),
        "6b6a887146d3b1a8b5289187220f015b31be18f28b365c61623f6ac03a426ada"
    )]
    fn test_known_digests(
        #[case] scheme: DigestScheme,
        #[case] sighash: u32,
        #[case] token: Option<TokenPayload>,
        #[case] expected: &str,
    ) {
        let tx: Transaction =
            crate::bitcoin::consensus::encode::deserialize(&hex::decode(BIP143_TX).unwrap())
                .unwrap();
        let script = ScriptBuf::from_hex(BIP143_SCRIPT_CODE).unwrap();
        let spent = SpentOutput {
            script_code: &script,
            value: BIP143_VALUE,
            token: token.as_ref(),
        };
        let digest = signature_hash(&tx, 1, &spent, sighash, scheme).unwrap();
        assert_eq!(hex::encode(digest), expected);
    }

    #[test]
    fn test_token_prefixes_match_wire_format() {
        assert_eq!(
            hex::encode(fungible_token().prefix()),
            format!("ef{}10fde803", "07".repeat(32))
        );
        assert_eq!(
            hex::encode(minting_nft().prefix()),
            format!("ef{}6202cafe", "07".repeat(32))
        );
    }

    #[test]
    fn test_fork_id_preimage_layout() {
        let tx = sample_tx();
        let script = script_code();
        let caps = Network::BitcoinCash.capabilities().unwrap();
        let sighash = SighashType::ALL.to_u32(&caps);
        assert_eq!(sighash, 0x41);

        let token = fungible_token();
        let spent = SpentOutput {
            script_code: &script,
            value: 100_000,
            token: Some(&token),
        };
        let with_token = fork_id_preimage(&tx, 0, &spent, sighash);
        let without = fork_id_preimage(&tx, 0, &SpentOutput { token: None, ..spent }, sighash);
        assert_eq!(&with_token[with_token.len() - 4..], &[0x41, 0, 0, 0]);

        let prefix = token.prefix();
        assert_eq!(with_token.len(), without.len() + prefix.len());
        // version, hashPrevouts, hashSequence, outpoint
        let offset = 4 + 32 + 32 + 36;
        assert_eq!(&with_token[offset..offset + prefix.len()], prefix.as_slice());

        // witness digests on non-fork chains never commit tokens
        let a = signature_hash(&tx, 0, &spent, 0x01, DigestScheme::WitnessV0).unwrap();
        let b = signature_hash(
            &tx,
            0,
            &SpentOutput {
                token: None,
                ..spent
            },
            0x01,
            DigestScheme::WitnessV0,
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_scheme_selection() {
        let btc = Network::Bitcoin.capabilities().unwrap();
        let btg = Network::BitcoinGold.capabilities().unwrap();
        assert_eq!(
            DigestScheme::select(ScriptType::P2pkh, &btc),
            DigestScheme::Legacy
        );
        assert_eq!(
            DigestScheme::select(ScriptType::P2shP2wsh, &btc),
            DigestScheme::WitnessV0
        );
        assert_eq!(
            DigestScheme::select(ScriptType::P2pkh, &btg),
            DigestScheme::ForkId
        );
        assert_eq!(SighashType::ALL.to_u32(&btg), 0x4f41);
    }

    #[rstest]
    #[case("ALL", SighashBase::All, false)]
    #[case("single|anyonecanpay", SighashBase::Single, true)]
    #[case("NONE", SighashBase::None, false)]
    fn test_sighash_from_str(
        #[case] s: &str,
        #[case] base: SighashBase,
        #[case] anyone_can_pay: bool,
    ) {
        assert_eq!(
            SighashType::from_str(s).unwrap(),
            SighashType {
                base,
                anyone_can_pay
            }
        );
    }

    #[test]
    fn test_index_out_of_range() {
        let tx = sample_tx();
        let script = script_code();
        let spent = SpentOutput {
            script_code: &script,
            value: 0,
            token: None,
        };
        assert!(matches!(
            signature_hash(&tx, 5, &spent, 0x01, DigestScheme::WitnessV0),
            Err(TxBuilderError::Sighash(_))
        ));
    }
}
