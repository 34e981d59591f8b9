use wasm_bindgen::JsValue;

use crate::bitcoin::consensus::encode::serialize;
use crate::bitcoin::Transaction;
use crate::error::TxBuilderError;

pub(crate) trait TryIntoJsValue {
    fn try_to_js_value(&self) -> Result<JsValue, TxBuilderError>;
}

macro_rules! js_obj {
    ( $( $key:expr => $value:expr ),* ) => {{
        let obj = js_sys::Object::new();
        $(
            js_sys::Reflect::set(&obj, &$key.into(), &$value.try_to_js_value()?.into())
                .map_err(|_| TxBuilderError::invalid_argument("Failed to set object property"))?;
        )*
        Ok(Into::<JsValue>::into(obj)) as Result<JsValue, TxBuilderError>
    }};
}

impl TryIntoJsValue for String {
    fn try_to_js_value(&self) -> Result<JsValue, TxBuilderError> {
        Ok(JsValue::from_str(self))
    }
}

impl TryIntoJsValue for usize {
    fn try_to_js_value(&self) -> Result<JsValue, TxBuilderError> {
        Ok(JsValue::from_f64(*self as f64))
    }
}

impl TryIntoJsValue for u32 {
    fn try_to_js_value(&self) -> Result<JsValue, TxBuilderError> {
        Ok(JsValue::from_f64(*self as f64))
    }
}

impl TryIntoJsValue for Vec<u8> {
    fn try_to_js_value(&self) -> Result<JsValue, TxBuilderError> {
        Ok(js_sys::Uint8Array::from(self.as_slice()).into())
    }
}

/// `{ tx, txid, size, vsize }` with `tx` the serialized transaction bytes.
impl TryIntoJsValue for Transaction {
    fn try_to_js_value(&self) -> Result<JsValue, TxBuilderError> {
        js_obj!(
            "tx" => serialize(self),
            "txid" => self.compute_txid().to_string(),
            "size" => self.total_size(),
            "vsize" => self.vsize()
        )
    }
}
