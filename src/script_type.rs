//! Script types a UTXO can be locked with, and the templates that spend them.

use std::fmt;
use std::str::FromStr;

use crate::bitcoin::blockdata::opcodes::all::OP_CHECKSIG;
use crate::bitcoin::blockdata::script::{Builder, PushBytesBuf};
use crate::bitcoin::{PublicKey, ScriptBuf, Witness};
use crate::error::TxBuilderError;
use crate::networks::NetworkCapabilities;
use crate::opcodes::{
    MAX_SCRIPT_ELEMENT_SIZE, TAG_P2PK, TAG_P2PKH, TAG_P2SH, TAG_P2SH_P2PK, TAG_P2SH_P2PKH, TAG_P2SH_P2WPKH,
    TAG_P2SH_P2WSH, TAG_P2WPKH, TAG_P2WSH,
};
use crate::utxo::{KeyMaterial, Utxo};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ScriptType {
    /// Bare public key.
    P2pk,
    /// Pay to public key hash.
    P2pkh,
    /// P2PK redeem script wrapped in P2SH.
    P2shP2pk,
    /// P2PKH redeem script wrapped in P2SH.
    P2shP2pkh,
    /// Native segwit v0 key hash.
    P2wpkh,
    /// P2WPKH program wrapped in P2SH.
    P2shP2wpkh,
    /// Multisig redeem script in P2SH.
    P2sh,
    /// Multisig witness script in P2WSH.
    P2wsh,
    /// Multisig witness script in P2WSH wrapped in P2SH.
    P2shP2wsh,
}

const ALL_SCRIPT_TYPES: [ScriptType; 9] = [
    ScriptType::P2pk,
    ScriptType::P2pkh,
    ScriptType::P2shP2pk,
    ScriptType::P2shP2pkh,
    ScriptType::P2wpkh,
    ScriptType::P2shP2wpkh,
    ScriptType::P2sh,
    ScriptType::P2wsh,
    ScriptType::P2shP2wsh,
];

/// Unlocking data for one input.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Unlocking {
    pub script_sig: ScriptBuf,
    pub witness: Witness,
}

impl ScriptType {
    pub fn all() -> &'static [ScriptType; 9] {
        &ALL_SCRIPT_TYPES
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptType::P2pk => TAG_P2PK,
            ScriptType::P2pkh => TAG_P2PKH,
            ScriptType::P2shP2pk => TAG_P2SH_P2PK,
            ScriptType::P2shP2pkh => TAG_P2SH_P2PKH,
            ScriptType::P2wpkh => TAG_P2WPKH,
            ScriptType::P2shP2wpkh => TAG_P2SH_P2WPKH,
            ScriptType::P2sh => TAG_P2SH,
            ScriptType::P2wsh => TAG_P2WSH,
            ScriptType::P2shP2wsh => TAG_P2SH_P2WSH,
        }
    }

    /// Spent through the witness, signed with the BIP143 digest.
    pub fn is_segwit(&self) -> bool {
        matches!(
            self,
            ScriptType::P2wpkh | ScriptType::P2shP2wpkh | ScriptType::P2wsh | ScriptType::P2shP2wsh
        )
    }

    /// Script-hash wraps that a multisig descriptor can be spent through.
    pub fn is_multisig_wrap(&self) -> bool {
        matches!(
            self,
            ScriptType::P2sh | ScriptType::P2wsh | ScriptType::P2shP2wsh
        )
    }

    /// Fails when the network cannot spend this type.
    pub fn check_supported(&self, capabilities: &NetworkCapabilities) -> Result<(), TxBuilderError> {
        if self.is_segwit() && !capabilities.segwit {
            return Err(TxBuilderError::UnsupportedScriptType {
                script_type: self.to_string(),
                reason: "network does not support segwit".to_string(),
            });
        }
        Ok(())
    }

    /// The script the signature commits to: the redeem script for P2SH
    /// wraps, the witness script for P2WSH, the P2PKH template for key-hash
    /// types.
    pub fn spending_script(&self, keys: &KeyMaterial) -> Result<ScriptBuf, TxBuilderError> {
        match keys {
            KeyMaterial::Single(public_key) => self.single_key_script(public_key),
            KeyMaterial::Multisig(descriptor) => {
                let script = descriptor.script();
                // only P2SH pushes the redeem script as a single scriptSig element
                if *self == ScriptType::P2sh && script.len() > MAX_SCRIPT_ELEMENT_SIZE {
                    return Err(TxBuilderError::InvalidMultisigDescriptor(format!(
                        "redeem script is {} bytes, p2sh allows at most {}; use p2wsh or p2shP2wsh",
                        script.len(),
                        MAX_SCRIPT_ELEMENT_SIZE
                    )));
                }
                if self.is_multisig_wrap() {
                    Ok(script.clone())
                } else {
                    Err(TxBuilderError::UnsupportedMultisigWrap {
                        script_type: self.to_string(),
                    })
                }
            }
        }
    }

    fn single_key_script(&self, public_key: &PublicKey) -> Result<ScriptBuf, TxBuilderError> {
        match self {
            ScriptType::P2pk => Ok(build_p2pk_script(public_key)),
            ScriptType::P2pkh => Ok(ScriptBuf::new_p2pkh(&public_key.pubkey_hash())),
            ScriptType::P2shP2pk => ScriptType::P2pk.single_key_script(public_key),
            ScriptType::P2shP2pkh => ScriptType::P2pkh.single_key_script(public_key),
            ScriptType::P2wpkh => {
                require_compressed(public_key)?;
                ScriptType::P2pkh.single_key_script(public_key)
            }
            ScriptType::P2shP2wpkh => ScriptType::P2wpkh.single_key_script(public_key),
            ScriptType::P2sh | ScriptType::P2wsh | ScriptType::P2shP2wsh => {
                Err(TxBuilderError::UnsupportedScriptType {
                    script_type: self.to_string(),
                    reason: "requires a multisig descriptor".to_string(),
                })
            }
        }
    }

    /// The locking script of an output of this type.
    pub fn output_script(&self, keys: &KeyMaterial) -> Result<ScriptBuf, TxBuilderError> {
        let spending_script = self.spending_script(keys)?;
        Ok(match self {
            ScriptType::P2pk | ScriptType::P2pkh => spending_script,
            ScriptType::P2shP2pk | ScriptType::P2shP2pkh | ScriptType::P2sh => {
                spending_script.to_p2sh()
            }
            ScriptType::P2wpkh => p2wpkh_program(keys)?,
            ScriptType::P2shP2wpkh => p2wpkh_program(keys)?.to_p2sh(),
            ScriptType::P2wsh => spending_script.to_p2wsh(),
            ScriptType::P2shP2wsh => spending_script.to_p2wsh().to_p2sh(),
        })
    }

    /// Assemble the unlocking data from collected signatures.
    ///
    /// Single-key types take exactly one signature. Multisig types always
    /// start with an empty element for the `OP_CHECKMULTISIG` dummy pop.
    pub fn unlocking(
        &self,
        keys: &KeyMaterial,
        signatures: &[Vec<u8>],
    ) -> Result<Unlocking, TxBuilderError> {
        let spending_script = self.spending_script(keys)?;
        let (script_sig, witness) = match keys {
            KeyMaterial::Single(public_key) => {
                let signature = match signatures {
                    [signature] => signature.clone(),
                    _ => {
                        return Err(TxBuilderError::invalid_argument(
                            "single-key input requires exactly one signature",
                        ))
                    }
                };
                let public_key = public_key.to_bytes();
                match self {
                    ScriptType::P2pk => (vec![signature], vec![]),
                    ScriptType::P2pkh => (vec![signature, public_key], vec![]),
                    ScriptType::P2shP2pkh => {
                        (vec![signature, public_key, spending_script.to_bytes()], vec![])
                    }
                    ScriptType::P2shP2pk => (vec![signature, spending_script.to_bytes()], vec![]),
                    ScriptType::P2wpkh => (vec![], vec![signature, public_key]),
                    // spending_script has already rejected the multisig wraps
                    _ => (
                        vec![p2wpkh_program(keys)?.to_bytes()],
                        vec![signature, public_key],
                    ),
                }
            }
            KeyMaterial::Multisig(_) => {
                let mut elements = Vec::with_capacity(signatures.len() + 2);
                elements.push(vec![]);
                elements.extend(signatures.iter().cloned());
                elements.push(spending_script.to_bytes());
                match self {
                    ScriptType::P2wsh => (vec![], elements),
                    ScriptType::P2shP2wsh => {
                        (vec![spending_script.to_p2wsh().to_bytes()], elements)
                    }
                    _ => (elements, vec![]),
                }
            }
        };
        Ok(Unlocking {
            script_sig: push_elements(&script_sig)?,
            witness: Witness::from_slice(&witness),
        })
    }
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ScriptType {
    type Err = TxBuilderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_SCRIPT_TYPES
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| TxBuilderError::UnsupportedScriptType {
                script_type: s.to_string(),
                reason: "no known template".to_string(),
            })
    }
}

/// Spending script of a UTXO, resolved from its script type and keys.
pub fn spending_script(utxo: &Utxo) -> Result<ScriptBuf, TxBuilderError> {
    utxo.script_type.spending_script(&utxo.keys)
}

pub fn build_p2pk_script(public_key: &PublicKey) -> ScriptBuf {
    Builder::new()
        .push_key(public_key)
        .push_opcode(OP_CHECKSIG)
        .into_script()
}

fn require_compressed(public_key: &PublicKey) -> Result<(), TxBuilderError> {
    if public_key.compressed {
        Ok(())
    } else {
        Err(TxBuilderError::InvalidPublicKey(
            "segwit requires a compressed public key".to_string(),
        ))
    }
}

fn p2wpkh_program(keys: &KeyMaterial) -> Result<ScriptBuf, TxBuilderError> {
    match keys {
        KeyMaterial::Single(public_key) => {
            let hash = public_key
                .wpubkey_hash()
                .map_err(|e| TxBuilderError::InvalidPublicKey(format!("{}", e)))?;
            Ok(ScriptBuf::new_p2wpkh(&hash))
        }
        KeyMaterial::Multisig(_) => Err(TxBuilderError::UnsupportedMultisigWrap {
            script_type: TAG_P2WPKH.to_string(),
        }),
    }
}

/// Serialize elements as a sequence of data pushes.
fn push_elements(elements: &[Vec<u8>]) -> Result<ScriptBuf, TxBuilderError> {
    let mut builder = Builder::new();
    for element in elements {
        let push = PushBytesBuf::try_from(element.clone())
            .map_err(|e| TxBuilderError::InvalidScript(format!("{}", e)))?;
        builder = builder.push_slice(push);
    }
    Ok(builder.into_script())
}
