use std::str::FromStr;
use std::sync::Arc;

use wasm_bindgen::{JsCast, JsValue};

use crate::bitcoin::{OutPoint, PublicKey, ScriptBuf, Txid};
use crate::builder::BuildRequest;
use crate::error::TxBuilderError;
use crate::multisig::{MultisigDescriptor, MultisigEntry};
use crate::networks::Network;
use crate::ordering::OrderingPolicy;
use crate::script_type::ScriptType;
use crate::sighash::SighashType;
use crate::tokens::{NftCapability, TokenBurn, TokenCategory, TokenPayload};
use crate::utxo::{OutputSpec, Utxo};

/// Trait for converting JsValue to Rust types
pub(crate) trait TryFromJsValue: Sized {
    fn try_from_js_value(value: &JsValue) -> Result<Self, TxBuilderError>;
}

fn invalid(message: String) -> TxBuilderError {
    TxBuilderError::InvalidArgument(message)
}

// =============================================================================
// Primitive types
// =============================================================================

impl TryFromJsValue for String {
    fn try_from_js_value(value: &JsValue) -> Result<Self, TxBuilderError> {
        value
            .as_string()
            .ok_or_else(|| TxBuilderError::invalid_argument("Expected a string"))
    }
}

impl TryFromJsValue for bool {
    fn try_from_js_value(value: &JsValue) -> Result<Self, TxBuilderError> {
        value
            .as_bool()
            .ok_or_else(|| TxBuilderError::invalid_argument("Expected a boolean"))
    }
}

impl TryFromJsValue for u32 {
    fn try_from_js_value(value: &JsValue) -> Result<Self, TxBuilderError> {
        let n = value
            .as_f64()
            .ok_or_else(|| TxBuilderError::invalid_argument("Expected a number"))?;
        if n.fract() != 0.0 || n < 0.0 || n > u32::MAX as f64 {
            return Err(invalid(format!("Expected a 32-bit unsigned integer, got {}", n)));
        }
        Ok(n as u32)
    }
}

impl TryFromJsValue for i32 {
    fn try_from_js_value(value: &JsValue) -> Result<Self, TxBuilderError> {
        let n = value
            .as_f64()
            .ok_or_else(|| TxBuilderError::invalid_argument("Expected a number"))?;
        if n.fract() != 0.0 || n < i32::MIN as f64 || n > i32::MAX as f64 {
            return Err(invalid(format!("Expected a 32-bit integer, got {}", n)));
        }
        Ok(n as i32)
    }
}

/// Amounts may exceed 2^53, so decimal strings and bigints are accepted
/// alongside safe-integer numbers.
impl TryFromJsValue for u64 {
    fn try_from_js_value(value: &JsValue) -> Result<Self, TxBuilderError> {
        if let Some(s) = value.as_string() {
            return s
                .parse::<u64>()
                .map_err(|_| invalid(format!("Expected a decimal amount, got '{}'", s)));
        }
        if value.is_bigint() {
            let bigint = js_sys::BigInt::from(value.clone());
            return u64::try_from(bigint)
                .map_err(|_| TxBuilderError::invalid_argument("Amount out of range"));
        }
        let n = value
            .as_f64()
            .ok_or_else(|| TxBuilderError::invalid_argument("Expected an amount"))?;
        if n.fract() != 0.0 || n < 0.0 || n > 9_007_199_254_740_991.0 {
            return Err(invalid(format!(
                "Amount {} is not a safe integer; pass a string or bigint",
                n
            )));
        }
        Ok(n as u64)
    }
}

/// Bytes from a Uint8Array or a hex string.
impl TryFromJsValue for Vec<u8> {
    fn try_from_js_value(value: &JsValue) -> Result<Self, TxBuilderError> {
        if let Some(s) = value.as_string() {
            return hex::decode(&s).map_err(|e| invalid(format!("Invalid hex '{}': {}", s, e)));
        }
        if !value.is_instance_of::<js_sys::Uint8Array>() {
            return Err(TxBuilderError::invalid_argument(
                "Expected a Uint8Array or hex string",
            ));
        }
        Ok(js_sys::Uint8Array::new(value).to_vec())
    }
}

impl<T: TryFromJsValue> TryFromJsValue for Option<T> {
    fn try_from_js_value(value: &JsValue) -> Result<Self, TxBuilderError> {
        if value.is_undefined() || value.is_null() {
            Ok(None)
        } else {
            T::try_from_js_value(value).map(Some)
        }
    }
}

// Arrays. Vec<u8> is bytes, so arrays of other types go through this wrapper.
pub(crate) struct JsArray<T>(pub Vec<T>);

impl<T: TryFromJsValue> TryFromJsValue for JsArray<T> {
    fn try_from_js_value(value: &JsValue) -> Result<Self, TxBuilderError> {
        if !js_sys::Array::is_array(value) {
            return Err(TxBuilderError::invalid_argument("Expected an array"));
        }
        js_sys::Array::from(value)
            .iter()
            .enumerate()
            .map(|(i, item)| {
                T::try_from_js_value(&item).map_err(|e| invalid(format!("{} (index: {})", e, i)))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(JsArray)
    }
}

// =============================================================================
// Field access functions
// =============================================================================

fn get_raw_field(obj: &JsValue, key: &str) -> Result<JsValue, TxBuilderError> {
    js_sys::Reflect::get(obj, &JsValue::from_str(key))
        .map_err(|_| invalid(format!("Failed to read {} from object", key)))
}

/// Get a field and convert it using TryFromJsValue
pub(crate) fn get_field<T: TryFromJsValue>(obj: &JsValue, key: &str) -> Result<T, TxBuilderError> {
    let field_value = get_raw_field(obj, key)?;
    T::try_from_js_value(&field_value).map_err(|e| invalid(format!("{} (field: {})", e, key)))
}

fn get_parsed<T: FromStr<Err = TxBuilderError>>(
    obj: &JsValue,
    key: &str,
) -> Result<Option<T>, TxBuilderError> {
    get_field::<Option<String>>(obj, key)?
        .map(|s| T::from_str(&s))
        .transpose()
}

// =============================================================================
// Domain types
// =============================================================================

impl TryFromJsValue for Network {
    fn try_from_js_value(value: &JsValue) -> Result<Self, TxBuilderError> {
        let network_str = value
            .as_string()
            .ok_or_else(|| TxBuilderError::invalid_argument("Expected a string for network"))?;
        Network::from_str(&network_str)
    }
}

impl TryFromJsValue for PublicKey {
    fn try_from_js_value(value: &JsValue) -> Result<Self, TxBuilderError> {
        let bytes = Vec::<u8>::try_from_js_value(value)?;
        PublicKey::from_slice(&bytes).map_err(|e| TxBuilderError::InvalidPublicKey(e.to_string()))
    }
}

impl TryFromJsValue for ScriptBuf {
    fn try_from_js_value(value: &JsValue) -> Result<Self, TxBuilderError> {
        Vec::<u8>::try_from_js_value(value).map(ScriptBuf::from_bytes)
    }
}

impl TryFromJsValue for Txid {
    fn try_from_js_value(value: &JsValue) -> Result<Self, TxBuilderError> {
        let s = String::try_from_js_value(value)?;
        Txid::from_str(&s).map_err(|e| invalid(format!("Invalid txid '{}': {}", s, e)))
    }
}

impl TryFromJsValue for TokenCategory {
    fn try_from_js_value(value: &JsValue) -> Result<Self, TxBuilderError> {
        TokenCategory::from_str(&String::try_from_js_value(value)?)
    }
}

/// `{ category, amount }` for fungible tokens or
/// `{ category, nft: { capability, commitment } }` for NFTs.
impl TryFromJsValue for TokenPayload {
    fn try_from_js_value(value: &JsValue) -> Result<Self, TxBuilderError> {
        let category: TokenCategory = get_field(value, "category")?;
        let amount: Option<u64> = get_field(value, "amount")?;
        let nft = get_raw_field(value, "nft")?;
        match (amount, nft.is_undefined() || nft.is_null()) {
            (Some(amount), true) => Ok(TokenPayload::Fungible { category, amount }),
            (None, false) => Ok(TokenPayload::Nft {
                category,
                capability: get_parsed::<NftCapability>(&nft, "capability")?
                    .unwrap_or(NftCapability::None),
                commitment: get_field::<Option<Vec<u8>>>(&nft, "commitment")?.unwrap_or_default(),
            }),
            _ => Err(TxBuilderError::invalid_argument(
                "Token must have exactly one of 'amount' or 'nft'",
            )),
        }
    }
}

impl TryFromJsValue for MultisigEntry {
    fn try_from_js_value(value: &JsValue) -> Result<Self, TxBuilderError> {
        Ok(MultisigEntry {
            public_key: get_field(value, "publicKey")?,
            weight: get_field::<Option<u32>>(value, "weight")?.unwrap_or(1),
        })
    }
}

impl TryFromJsValue for MultisigDescriptor {
    fn try_from_js_value(value: &JsValue) -> Result<Self, TxBuilderError> {
        let entries: JsArray<MultisigEntry> = get_field(value, "entries")?;
        MultisigDescriptor::new(entries.0, get_field(value, "threshold")?)
    }
}

/// `publicKey` for single-key UTXOs, `multisig` for descriptor UTXOs.
impl TryFromJsValue for Utxo {
    fn try_from_js_value(value: &JsValue) -> Result<Self, TxBuilderError> {
        let outpoint = OutPoint::new(get_field(value, "txid")?, get_field(value, "vout")?);
        let amount: u64 = get_field(value, "value")?;
        let script_type = ScriptType::from_str(&get_field::<String>(value, "scriptType")?)?;
        let public_key: Option<PublicKey> = get_field(value, "publicKey")?;
        let multisig: Option<MultisigDescriptor> = get_field(value, "multisig")?;
        let utxo = match (public_key, multisig) {
            (Some(public_key), None) => Utxo::single_key(outpoint, amount, script_type, public_key),
            (None, Some(descriptor)) => {
                Utxo::multisig(outpoint, amount, script_type, Arc::new(descriptor))
            }
            _ => {
                return Err(TxBuilderError::invalid_argument(
                    "UTXO must have exactly one of 'publicKey' or 'multisig'",
                ))
            }
        };
        Ok(match get_field::<Option<TokenPayload>>(value, "token")? {
            Some(token) => utxo.with_token(token),
            None => utxo,
        })
    }
}

impl TryFromJsValue for TokenBurn {
    fn try_from_js_value(value: &JsValue) -> Result<Self, TxBuilderError> {
        Ok(TokenBurn {
            category: get_field(value, "category")?,
            amount: get_field::<Option<u64>>(value, "amount")?.unwrap_or(0),
            nft_source: get_field(value, "nftSource")?,
        })
    }
}

/// One of:
/// - `{ script, value }`
/// - `{ script, value, token, source? }`
/// - `{ data: [bytes...] }`
/// - `{ burn: { category, amount?, nftSource? } }`
impl TryFromJsValue for OutputSpec {
    fn try_from_js_value(value: &JsValue) -> Result<Self, TxBuilderError> {
        if let Some(burn) = get_field::<Option<TokenBurn>>(value, "burn")? {
            return Ok(OutputSpec::burn(burn));
        }
        if let Some(chunks) = get_field::<Option<JsArray<Vec<u8>>>>(value, "data")? {
            return Ok(OutputSpec::data(chunks.0));
        }
        let script: ScriptBuf = get_field(value, "script")?;
        let amount: u64 = get_field(value, "value")?;
        Ok(match get_field::<Option<TokenPayload>>(value, "token")? {
            Some(token) => OutputSpec::token(script, amount, token, get_field(value, "source")?),
            None => OutputSpec::payment(script, amount),
        })
    }
}

impl TryFromJsValue for BuildRequest {
    fn try_from_js_value(value: &JsValue) -> Result<Self, TxBuilderError> {
        let utxos: JsArray<Utxo> = get_field(value, "utxos")?;
        let outputs: JsArray<OutputSpec> = get_field(value, "outputs")?;
        let mut request = BuildRequest::new(
            utxos.0,
            outputs.0,
            get_field::<Option<u64>>(value, "fee")?.unwrap_or(0),
            get_field(value, "network")?,
        );
        request.memo = get_field(value, "memo")?;
        request.rbf = get_field::<Option<bool>>(value, "rbf")?.unwrap_or(false);
        request.dry_run = get_field::<Option<bool>>(value, "dryRun")?.unwrap_or(false);
        if let Some(policy) = get_parsed::<OrderingPolicy>(value, "inputOrdering")? {
            request.input_ordering = policy;
        }
        if let Some(policy) = get_parsed::<OrderingPolicy>(value, "outputOrdering")? {
            request.output_ordering = policy;
        }
        if let Some(sighash) = get_parsed::<SighashType>(value, "sighash")? {
            request.sighash = sighash;
        }
        request.lock_time = get_field(value, "lockTime")?;
        if let Some(version) = get_field::<Option<i32>>(value, "version")? {
            request.version = version;
        }
        Ok(request)
    }
}
