use std::collections::HashSet;

use tracing::debug;

use crate::bitcoin::absolute::LockTime;
use crate::bitcoin::transaction::Version;
use crate::bitcoin::{ScriptBuf, Transaction, TxIn, Witness};
use crate::error::TxBuilderError;
use crate::networks::NetworkCapabilities;
use crate::ordering::{order_inputs, order_outputs, sequences};
use crate::script_type::Unlocking;
use crate::sighash::{signature_hash, DigestScheme, SpentOutput};
use crate::utxo::{OutputSpec, OutputTemplate, Utxo};
use crate::validate::validate;

use super::BuildRequest;

/// Digest of one input, ready to be signed.
#[derive(Debug, Clone)]
pub struct PreparedInput {
    pub index: usize,
    pub digest: [u8; 32],
}

/// A transaction being built: ordered inputs and outputs plus the unsigned
/// transaction they describe.
///
/// Only the unlocking data of inputs changes after construction.
#[derive(Debug, Clone)]
pub struct TransactionDraft {
    inputs: Vec<Utxo>,
    outputs: Vec<OutputSpec>,
    fee: u64,
    capabilities: NetworkCapabilities,
    sighash: u32,
    tx: Transaction,
}

impl TransactionDraft {
    /// Orders inputs and outputs and checks conservation. Nothing is signed.
    pub fn new(request: &BuildRequest) -> Result<Self, TxBuilderError> {
        let capabilities = request.network.capabilities()?;

        let mut outputs = request.outputs.clone();
        if let Some(memo) = &request.memo {
            outputs.push(OutputSpec::memo(memo));
        }
        check_structure(request, &outputs, &capabilities)?;

        let inputs = order_inputs(&request.utxos, request.input_ordering);
        let outputs = order_outputs(&outputs, request.output_ordering)?;
        debug!(
            inputs = inputs.len(),
            outputs = outputs.len(),
            network = %request.network,
            "ordered draft"
        );

        validate(&inputs, &outputs, request.fee, request.dry_run)?;

        let sequences = sequences(inputs.len(), request.lock_time.is_some(), request.rbf);
        let tx = Transaction {
            version: Version(request.version),
            lock_time: LockTime::from_consensus(request.lock_time.unwrap_or(0)),
            input: inputs
                .iter()
                .zip(sequences)
                .map(|(utxo, sequence)| TxIn {
                    previous_output: utxo.outpoint,
                    script_sig: ScriptBuf::new(),
                    sequence,
                    witness: Witness::new(),
                })
                .collect(),
            output: outputs
                .iter()
                .map(|output| output.to_tx_out())
                .collect::<Result<_, _>>()?,
        };

        Ok(TransactionDraft {
            inputs,
            outputs,
            fee: request.fee,
            capabilities,
            sighash: request.sighash.to_u32(&capabilities),
            tx,
        })
    }

    pub fn inputs(&self) -> &[Utxo] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[OutputSpec] {
        &self.outputs
    }

    pub fn fee(&self) -> u64 {
        self.fee
    }

    /// Sighash value used for every input.
    pub fn sighash(&self) -> u32 {
        self.sighash
    }

    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    /// Reconstruct the spending script of an input and compute its digest.
    pub fn prepare_input(&self, index: usize) -> Result<PreparedInput, TxBuilderError> {
        let utxo = self.inputs.get(index).ok_or_else(|| {
            TxBuilderError::InvalidArgument(format!("input index {} out of range", index))
        })?;
        utxo.script_type.check_supported(&self.capabilities)?;
        let spending_script = utxo.script_type.spending_script(&utxo.keys)?;
        let scheme = DigestScheme::select(utxo.script_type, &self.capabilities);
        let spent = SpentOutput {
            script_code: &spending_script,
            value: utxo.value,
            token: utxo.token.as_ref(),
        };
        let digest = signature_hash(&self.tx, index, &spent, self.sighash, scheme)?;
        debug!(
            index,
            script_type = %utxo.script_type,
            ?scheme,
            sighash = self.sighash,
            "prepared input"
        );
        Ok(PreparedInput { index, digest })
    }

    /// Digests do not depend on unlocking data, so all inputs are prepared
    /// before any signature is attached.
    pub fn prepare_all(&self) -> Result<Vec<PreparedInput>, TxBuilderError> {
        (0..self.inputs.len())
            .map(|index| self.prepare_input(index))
            .collect()
    }

    pub fn attach(&mut self, index: usize, unlocking: Unlocking) -> Result<(), TxBuilderError> {
        let txin = self.tx.input.get_mut(index).ok_or_else(|| {
            TxBuilderError::InvalidArgument(format!("input index {} out of range", index))
        })?;
        txin.script_sig = unlocking.script_sig;
        txin.witness = unlocking.witness;
        Ok(())
    }

    pub fn into_transaction(self) -> Transaction {
        self.tx
    }
}

/// Configuration errors that no dry run suppresses.
fn check_structure(
    request: &BuildRequest,
    outputs: &[OutputSpec],
    capabilities: &NetworkCapabilities,
) -> Result<(), TxBuilderError> {
    let mut seen = HashSet::new();
    for utxo in &request.utxos {
        if !seen.insert(utxo.outpoint) {
            return Err(TxBuilderError::InvalidArgument(format!(
                "outpoint {} is spent twice",
                utxo.outpoint
            )));
        }
    }

    let input_tokens = request.utxos.iter().filter_map(|u| u.token.as_ref());
    let output_tokens = outputs.iter().filter_map(|o| o.token_payload());
    let mut has_tokens = false;
    for token in input_tokens.chain(output_tokens) {
        token.check()?;
        has_tokens = true;
    }
    has_tokens |= outputs
        .iter()
        .any(|o| matches!(o.template, OutputTemplate::Burn(_)));
    if has_tokens && !capabilities.tokens {
        return Err(TxBuilderError::UnsupportedNetwork {
            network: request.network.to_string(),
            reason: "network does not support tokens",
        });
    }
    Ok(())
}
