use thiserror::Error;
use wasm_bindgen::JsValue;

/// Error type for transaction building operations.
///
/// Every variant is reported at the point of detection and never retried
/// internally. Conservation errors are the only ones suppressed by dry runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxBuilderError {
    #[error("Unsupported network {network}: {reason}")]
    UnsupportedNetwork {
        network: String,
        reason: &'static str,
    },

    #[error("Unsupported script type '{script_type}': {reason}")]
    UnsupportedScriptType {
        script_type: String,
        reason: String,
    },

    #[error("Multisig UTXO cannot be spent as '{script_type}'; expected p2sh, p2wsh or p2shP2wsh")]
    UnsupportedMultisigWrap { script_type: String },

    #[error("Unbalanced value: inputs {inputs} != outputs {outputs} + fee {fee}")]
    UnbalancedValue { inputs: u128, fee: u64, outputs: u128 },

    #[error("Unbalanced token category {category}: inputs {inputs} != outputs and burns {outputs}")]
    UnbalancedToken {
        category: String,
        inputs: u128,
        outputs: u128,
    },

    #[error("NFT of category {category} from {source_txid} is neither sent exactly once nor burned")]
    UnaccountedNft {
        category: String,
        source_txid: String,
    },

    #[error("Input {input_index}: collected multisig weight {collected} below threshold {threshold}")]
    InsufficientMultisigWeight {
        input_index: usize,
        collected: u32,
        threshold: u32,
    },

    #[error("Invalid multisig descriptor: {0}")]
    InvalidMultisigDescriptor(String),

    #[error("Invalid script: {0}")]
    InvalidScript(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid token category: {0}")]
    InvalidTokenCategory(String),

    #[error("Input {input_index}: signer failed: {message}")]
    Signer { input_index: usize, message: String },

    #[error("Failed to compute sighash: {0}")]
    Sighash(String),

    #[error("{0}")]
    InvalidArgument(String),
}

impl TxBuilderError {
    pub fn invalid_argument(message: &str) -> Self {
        TxBuilderError::InvalidArgument(message.to_string())
    }

    /// True for the conservation errors that a dry run suppresses.
    pub fn is_conservation_error(&self) -> bool {
        matches!(
            self,
            TxBuilderError::UnbalancedValue { .. }
                | TxBuilderError::UnbalancedToken { .. }
                | TxBuilderError::UnaccountedNft { .. }
        )
    }
}

// Required for wasm_bindgen to convert errors to JavaScript exceptions
impl From<TxBuilderError> for JsValue {
    fn from(err: TxBuilderError) -> Self {
        js_sys::Error::new(&err.to_string()).into()
    }
}
