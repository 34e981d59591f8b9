use wasm_bindgen::JsValue;

use crate::error::TxBuilderError;
use crate::signer::{Signer, SignerError, SigningRequest};

use super::try_into_js_value::TryIntoJsValue;

/// Signer backed by a JavaScript function
/// `(digest: Uint8Array, utxo, publicKeyHex: string, sighash: number) => string`.
///
/// The function returns the signature as hex (DER plus sighash byte), or an
/// empty string to decline. A `Uint8Array` return value is accepted as well.
pub(crate) struct JsSigner<'a>(pub &'a js_sys::Function);

impl JsSigner<'_> {
    fn utxo_object(request: &SigningRequest<'_>) -> Result<JsValue, TxBuilderError> {
        let utxo = request.utxo;
        js_obj!(
            "txid" => utxo.outpoint.txid.to_string(),
            "vout" => utxo.outpoint.vout,
            "value" => utxo.value.to_string(),
            "scriptType" => utxo.script_type.to_string(),
            "inputIndex" => request.input_index
        )
    }
}

impl Signer for JsSigner<'_> {
    fn sign(&self, request: &SigningRequest<'_>) -> Result<Vec<u8>, SignerError> {
        let utxo = JsSigner::utxo_object(request).map_err(|e| SignerError::new(e.to_string()))?;
        let args = js_sys::Array::of4(
            &js_sys::Uint8Array::from(&request.digest[..]).into(),
            &utxo,
            &JsValue::from_str(&request.public_key_hex()),
            &JsValue::from_f64(request.sighash as f64),
        );
        let result = self.0.apply(&JsValue::NULL, &args).map_err(|e| {
            SignerError::new(
                e.as_string()
                    .or_else(|| {
                        js_sys::Reflect::get(&e, &JsValue::from_str("message"))
                            .ok()
                            .and_then(|m| m.as_string())
                    })
                    .unwrap_or_else(|| "signer callback threw".to_string()),
            )
        })?;
        if let Some(hex_signature) = result.as_string() {
            return hex::decode(&hex_signature)
                .map_err(|e| SignerError::new(format!("invalid signature hex: {}", e)));
        }
        if result.is_undefined() || result.is_null() {
            return Ok(vec![]);
        }
        Ok(js_sys::Uint8Array::new(&result).to_vec())
    }
}
