//! WASM bindings for transaction building

use wasm_bindgen::prelude::*;

use crate::bitcoin::ScriptBuf;
use crate::builder::{build_transaction, BuildRequest};
use crate::control_block::ControlBlock;
use crate::error::TxBuilderError;
use crate::opcodes::{script_from_asm, script_to_asm};

use super::signer::JsSigner;
use super::try_from_js_value::TryFromJsValue;
use super::try_into_js_value::TryIntoJsValue;

/// Namespace for transaction building functions
#[wasm_bindgen]
pub struct TxBuilderNamespace;

#[wasm_bindgen]
impl TxBuilderNamespace {
    /// Build and sign a transaction
    ///
    /// # Arguments
    /// * `request` - `{ network, utxos, outputs, fee, memo?, rbf?, dryRun?, inputOrdering?,
    ///   outputOrdering?, sighash?, lockTime?, version? }`
    /// * `signer` - `(digest, utxo, publicKeyHex, sighash) => signatureHex`; an empty string
    ///   declines
    ///
    /// # Returns
    /// `{ tx, txid, size, vsize }`
    pub fn build_transaction(
        request: JsValue,
        signer: &js_sys::Function,
    ) -> Result<JsValue, TxBuilderError> {
        let request = BuildRequest::try_from_js_value(&request)?;
        let tx = build_transaction(&request, &JsSigner(signer))?;
        tx.try_to_js_value()
    }

    /// Serialized size of the request built with placeholder signatures
    pub fn estimate_size(request: JsValue) -> Result<u32, TxBuilderError> {
        let request = BuildRequest::try_from_js_value(&request)?;
        Ok(request.estimate_size()? as u32)
    }

    /// Virtual size of the request built with placeholder signatures
    pub fn estimate_vsize(request: JsValue) -> Result<u32, TxBuilderError> {
        let request = BuildRequest::try_from_js_value(&request)?;
        Ok(request.estimate_vsize()? as u32)
    }

    /// Taproot control block for a script-path spend
    ///
    /// # Arguments
    /// * `public_key` - 33 byte compressed or 32 byte x-only internal key
    /// * `merkle_path` - concatenated 32 byte branch hashes, may be empty
    pub fn control_block(public_key: &[u8], merkle_path: &[u8]) -> Result<Vec<u8>, TxBuilderError> {
        Ok(ControlBlock::from_key_bytes(public_key, merkle_path.to_vec())?.serialize())
    }

    pub fn script_to_asm(script: &[u8]) -> Result<String, TxBuilderError> {
        script_to_asm(&ScriptBuf::from_bytes(script.to_vec()))
    }

    pub fn script_from_asm(asm: &str) -> Result<Vec<u8>, TxBuilderError> {
        Ok(script_from_asm(asm)?.to_bytes())
    }
}
