//! Inputs being spent and outputs being created.

use std::sync::Arc;

use crate::bitcoin::blockdata::opcodes::all::OP_RETURN;
use crate::bitcoin::blockdata::script::{Builder, PushBytesBuf};
use crate::bitcoin::{Amount, OutPoint, PublicKey, ScriptBuf, TxOut};
use crate::error::TxBuilderError;
use crate::multisig::MultisigDescriptor;
use crate::script_type::ScriptType;
use crate::tokens::{token_prefixed_script, TokenBurn, TokenPayload};

/// Key material that controls a UTXO.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum KeyMaterial {
    Single(PublicKey),
    /// Descriptors are shared between all UTXOs of the same multisig address.
    Multisig(Arc<MultisigDescriptor>),
}

/// A previous output to be spent. Immutable once constructed.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Utxo {
    pub outpoint: OutPoint,
    pub value: u64,
    pub token: Option<TokenPayload>,
    pub script_type: ScriptType,
    pub keys: KeyMaterial,
}

impl Utxo {
    pub fn single_key(
        outpoint: OutPoint,
        value: u64,
        script_type: ScriptType,
        public_key: PublicKey,
    ) -> Self {
        Utxo {
            outpoint,
            value,
            token: None,
            script_type,
            keys: KeyMaterial::Single(public_key),
        }
    }

    pub fn multisig(
        outpoint: OutPoint,
        value: u64,
        script_type: ScriptType,
        descriptor: Arc<MultisigDescriptor>,
    ) -> Self {
        Utxo {
            outpoint,
            value,
            token: None,
            script_type,
            keys: KeyMaterial::Multisig(descriptor),
        }
    }

    pub fn with_token(mut self, token: TokenPayload) -> Self {
        self.token = Some(token);
        self
    }
}

/// Script template of an output.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum OutputTemplate {
    /// Standard payment to a locking script.
    Payment { script_pubkey: ScriptBuf },
    /// `OP_RETURN` followed by data pushes.
    DataCarrier { chunks: Vec<Vec<u8>> },
    /// Payment that also carries tokens. `source` names the transaction an
    /// NFT is transferred from.
    TokenAware {
        script_pubkey: ScriptBuf,
        token: TokenPayload,
        source: Option<crate::bitcoin::Txid>,
    },
    /// Bare `OP_RETURN` declaring destroyed tokens.
    Burn(TokenBurn),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct OutputSpec {
    pub template: OutputTemplate,
    pub value: u64,
}

impl OutputSpec {
    pub fn payment(script_pubkey: ScriptBuf, value: u64) -> Self {
        OutputSpec {
            template: OutputTemplate::Payment { script_pubkey },
            value,
        }
    }

    pub fn data(chunks: Vec<Vec<u8>>) -> Self {
        OutputSpec {
            template: OutputTemplate::DataCarrier { chunks },
            value: 0,
        }
    }

    pub fn memo(memo: &str) -> Self {
        OutputSpec::data(vec![memo.as_bytes().to_vec()])
    }

    pub fn token(
        script_pubkey: ScriptBuf,
        value: u64,
        token: TokenPayload,
        source: Option<crate::bitcoin::Txid>,
    ) -> Self {
        OutputSpec {
            template: OutputTemplate::TokenAware {
                script_pubkey,
                token,
                source,
            },
            value,
        }
    }

    pub fn burn(burn: TokenBurn) -> Self {
        OutputSpec {
            template: OutputTemplate::Burn(burn),
            value: 0,
        }
    }

    pub fn token_payload(&self) -> Option<&TokenPayload> {
        match &self.template {
            OutputTemplate::TokenAware { token, .. } => Some(token),
            _ => None,
        }
    }

    /// Locking bytecode as serialized, including any token prefix.
    pub fn script_pubkey(&self) -> Result<ScriptBuf, TxBuilderError> {
        match &self.template {
            OutputTemplate::Payment { script_pubkey } => Ok(script_pubkey.clone()),
            OutputTemplate::DataCarrier { chunks } => {
                let mut builder = Builder::new().push_opcode(OP_RETURN);
                for chunk in chunks {
                    let push = PushBytesBuf::try_from(chunk.clone())
                        .map_err(|e| TxBuilderError::InvalidScript(format!("{}", e)))?;
                    builder = builder.push_slice(push);
                }
                Ok(builder.into_script())
            }
            OutputTemplate::TokenAware {
                script_pubkey,
                token,
                ..
            } => Ok(token_prefixed_script(Some(token), script_pubkey)),
            OutputTemplate::Burn(_) => Ok(Builder::new().push_opcode(OP_RETURN).into_script()),
        }
    }

    pub fn to_tx_out(&self) -> Result<TxOut, TxBuilderError> {
        Ok(TxOut {
            value: Amount::from_sat(self.value),
            script_pubkey: self.script_pubkey()?,
        })
    }
}
