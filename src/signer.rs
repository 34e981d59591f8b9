//! Signer callbacks.
//!
//! The builder computes digests and hands them to a caller-supplied signer.
//! A signer returns the complete signature as it appears in the unlocking
//! script (DER encoding followed by the sighash byte). An empty signature
//! means the signer declined; for multisig entries that is a valid answer.

use futures::future::{self, BoxFuture};
use thiserror::Error;

use crate::bitcoin::PublicKey;
use crate::utxo::Utxo;

/// Length of a typical DER ECDSA signature plus sighash byte.
pub const PLACEHOLDER_SIGNATURE_LEN: usize = 71;
const PLACEHOLDER_FILLER: u8 = 0x30;

/// Everything a signer needs to produce one signature.
#[derive(Debug, Clone, Copy)]
pub struct SigningRequest<'a> {
    pub input_index: usize,
    pub digest: [u8; 32],
    pub utxo: &'a Utxo,
    pub public_key: &'a PublicKey,
    /// Full sighash value, including fork bits.
    pub sighash: u32,
}

impl SigningRequest<'_> {
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.to_bytes())
    }

    /// Low byte of the sighash value, appended to DER signatures.
    pub fn sighash_byte(&self) -> u8 {
        (self.sighash & 0xff) as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SignerError(pub String);

impl SignerError {
    pub fn new(message: impl Into<String>) -> Self {
        SignerError(message.into())
    }
}

pub trait Signer {
    fn sign(&self, request: &SigningRequest<'_>) -> Result<Vec<u8>, SignerError>;
}

impl<F> Signer for F
where
    F: Fn(&SigningRequest<'_>) -> Result<Vec<u8>, SignerError>,
{
    fn sign(&self, request: &SigningRequest<'_>) -> Result<Vec<u8>, SignerError> {
        self(request)
    }
}

/// Signer that may suspend, e.g. a remote HSM or a user confirmation.
pub trait AsyncSigner: Sync {
    fn sign<'a>(
        &'a self,
        request: SigningRequest<'a>,
    ) -> BoxFuture<'a, Result<Vec<u8>, SignerError>>;
}

/// Runs a synchronous signer inside the async pipeline.
#[derive(Debug, Clone)]
pub struct Blocking<S>(pub S);

impl<S: Signer + Sync> AsyncSigner for Blocking<S> {
    fn sign<'a>(
        &'a self,
        request: SigningRequest<'a>,
    ) -> BoxFuture<'a, Result<Vec<u8>, SignerError>> {
        Box::pin(future::ready(self.0.sign(&request)))
    }
}

/// Produces fixed filler signatures of realistic length for size estimation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderSigner;

impl PlaceholderSigner {
    pub fn signature() -> Vec<u8> {
        vec![PLACEHOLDER_FILLER; PLACEHOLDER_SIGNATURE_LEN]
    }
}

impl Signer for PlaceholderSigner {
    fn sign(&self, _request: &SigningRequest<'_>) -> Result<Vec<u8>, SignerError> {
        Ok(PlaceholderSigner::signature())
    }
}

impl AsyncSigner for PlaceholderSigner {
    fn sign<'a>(
        &'a self,
        _request: SigningRequest<'a>,
    ) -> BoxFuture<'a, Result<Vec<u8>, SignerError>> {
        Box::pin(future::ready(Ok(PlaceholderSigner::signature())))
    }
}
