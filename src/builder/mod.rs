//! Transaction building pipeline: order, validate, reconstruct scripts,
//! compute digests, collect signatures, attach unlocking data.
//!
//! Validation always completes before the first signer call, and a failure
//! on any input aborts the whole build.

mod draft;
mod estimate;

pub use draft::{PreparedInput, TransactionDraft};
pub use estimate::{estimate_size, estimate_vsize, placeholder_request, PLACEHOLDER_FEE};

use futures::future::try_join_all;
use tracing::{debug, trace};

use crate::bitcoin::{PublicKey, Transaction};
use crate::error::TxBuilderError;
use crate::multisig::SignatureCollector;
use crate::networks::Network;
use crate::opcodes::DEFAULT_VERSION;
use crate::ordering::OrderingPolicy;
use crate::script_type::Unlocking;
use crate::sighash::SighashType;
use crate::signer::{AsyncSigner, Signer, SignerError, SigningRequest};
use crate::utxo::{KeyMaterial, OutputSpec, Utxo};

/// Everything a caller configures for one build.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub utxos: Vec<Utxo>,
    pub outputs: Vec<OutputSpec>,
    pub fee: u64,
    pub network: Network,
    /// Encoded as a zero-value data-carrier output.
    pub memo: Option<String>,
    pub rbf: bool,
    /// Skips conservation checks. Used for size estimation.
    pub dry_run: bool,
    pub input_ordering: OrderingPolicy,
    pub output_ordering: OrderingPolicy,
    pub sighash: SighashType,
    pub lock_time: Option<u32>,
    pub version: i32,
}

impl Default for BuildRequest {
    fn default() -> Self {
        BuildRequest {
            utxos: vec![],
            outputs: vec![],
            fee: 0,
            network: Network::Bitcoin,
            memo: None,
            rbf: false,
            dry_run: false,
            input_ordering: OrderingPolicy::default(),
            output_ordering: OrderingPolicy::default(),
            sighash: SighashType::default(),
            lock_time: None,
            version: i32::from_le_bytes(DEFAULT_VERSION),
        }
    }
}

impl BuildRequest {
    pub fn new(utxos: Vec<Utxo>, outputs: Vec<OutputSpec>, fee: u64, network: Network) -> Self {
        BuildRequest {
            utxos,
            outputs,
            fee,
            network,
            ..Default::default()
        }
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    pub fn with_rbf(mut self, rbf: bool) -> Self {
        self.rbf = rbf;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_ordering(mut self, inputs: OrderingPolicy, outputs: OrderingPolicy) -> Self {
        self.input_ordering = inputs;
        self.output_ordering = outputs;
        self
    }

    pub fn with_sighash(mut self, sighash: SighashType) -> Self {
        self.sighash = sighash;
        self
    }

    pub fn with_lock_time(mut self, lock_time: u32) -> Self {
        self.lock_time = Some(lock_time);
        self
    }

    pub fn with_version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }
}

fn signer_error(input_index: usize) -> impl Fn(SignerError) -> TxBuilderError {
    move |e| TxBuilderError::Signer {
        input_index,
        message: e.0,
    }
}

fn request_for<'a>(
    draft: &'a TransactionDraft,
    prepared: &PreparedInput,
    public_key: &'a PublicKey,
) -> SigningRequest<'a> {
    SigningRequest {
        input_index: prepared.index,
        digest: prepared.digest,
        utxo: &draft.inputs()[prepared.index],
        public_key,
        sighash: draft.sighash(),
    }
}

fn single_signature(input_index: usize, signature: Vec<u8>) -> Result<Vec<Vec<u8>>, TxBuilderError> {
    if signature.is_empty() {
        return Err(TxBuilderError::Signer {
            input_index,
            message: "signer returned no signature for a single-key input".to_string(),
        });
    }
    Ok(vec![signature])
}

fn sign_input<S: Signer + ?Sized>(
    draft: &TransactionDraft,
    prepared: &PreparedInput,
    signer: &S,
) -> Result<Unlocking, TxBuilderError> {
    let utxo = &draft.inputs()[prepared.index];
    let signatures = match &utxo.keys {
        KeyMaterial::Single(public_key) => {
            let signature = signer
                .sign(&request_for(draft, prepared, public_key))
                .map_err(signer_error(prepared.index))?;
            single_signature(prepared.index, signature)?
        }
        KeyMaterial::Multisig(descriptor) => {
            let mut collector = SignatureCollector::new(descriptor);
            for entry in descriptor.entries() {
                if collector.is_complete() {
                    break;
                }
                let signature = signer
                    .sign(&request_for(draft, prepared, &entry.public_key))
                    .map_err(signer_error(prepared.index))?;
                trace!(
                    index = prepared.index,
                    public_key = %entry.public_key,
                    declined = signature.is_empty(),
                    "multisig signer response"
                );
                collector.offer(entry.weight, signature);
            }
            collector.finish(prepared.index)?
        }
    };
    utxo.script_type.unlocking(&utxo.keys, &signatures)
}

async fn sign_input_async<S: AsyncSigner + ?Sized>(
    draft: &TransactionDraft,
    prepared: &PreparedInput,
    signer: &S,
) -> Result<Unlocking, TxBuilderError> {
    let utxo = &draft.inputs()[prepared.index];
    let signatures = match &utxo.keys {
        KeyMaterial::Single(public_key) => {
            let signature = signer
                .sign(request_for(draft, prepared, public_key))
                .await
                .map_err(signer_error(prepared.index))?;
            single_signature(prepared.index, signature)?
        }
        KeyMaterial::Multisig(descriptor) => {
            // Each response decides whether the next entry is asked.
            let mut collector = SignatureCollector::new(descriptor);
            for entry in descriptor.entries() {
                if collector.is_complete() {
                    break;
                }
                let signature = signer
                    .sign(request_for(draft, prepared, &entry.public_key))
                    .await
                    .map_err(signer_error(prepared.index))?;
                trace!(
                    index = prepared.index,
                    public_key = %entry.public_key,
                    declined = signature.is_empty(),
                    "multisig signer response"
                );
                collector.offer(entry.weight, signature);
            }
            collector.finish(prepared.index)?
        }
    };
    utxo.script_type.unlocking(&utxo.keys, &signatures)
}

/// Build and sign a transaction.
pub fn build_transaction<S: Signer + ?Sized>(
    request: &BuildRequest,
    signer: &S,
) -> Result<Transaction, TxBuilderError> {
    let mut draft = TransactionDraft::new(request)?;
    let prepared = draft.prepare_all()?;
    let unlockings = prepared
        .iter()
        .map(|p| sign_input(&draft, p, signer))
        .collect::<Result<Vec<_>, _>>()?;
    for (index, unlocking) in unlockings.into_iter().enumerate() {
        draft.attach(index, unlocking)?;
    }
    debug!(inputs = prepared.len(), "signed transaction");
    Ok(draft.into_transaction())
}

/// Build and sign a transaction with a signer that may suspend.
///
/// Inputs are signed concurrently; multisig entries within one input are
/// asked in descriptor order.
pub async fn build_transaction_async<S: AsyncSigner + ?Sized>(
    request: &BuildRequest,
    signer: &S,
) -> Result<Transaction, TxBuilderError> {
    let mut draft = TransactionDraft::new(request)?;
    let prepared = draft.prepare_all()?;
    let unlockings = try_join_all(
        prepared
            .iter()
            .map(|p| sign_input_async(&draft, p, signer)),
    )
    .await?;
    for (index, unlocking) in unlockings.into_iter().enumerate() {
        draft.attach(index, unlocking)?;
    }
    debug!(inputs = prepared.len(), "signed transaction");
    Ok(draft.into_transaction())
}
