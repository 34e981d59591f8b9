pub mod builder;
pub mod control_block;
mod error;
pub mod multisig;
mod networks;
pub mod opcodes;
pub mod ordering;
pub mod script_type;
pub mod sighash;
pub mod signer;
pub mod tokens;
pub mod utxo;
pub mod validate;

// re-export bitcoin from the miniscript crate
pub use ::miniscript::bitcoin;

pub use builder::{
    build_transaction, build_transaction_async, estimate_size, estimate_vsize, BuildRequest,
    TransactionDraft,
};
pub use error::TxBuilderError;
pub use multisig::{MultisigDescriptor, MultisigEntry};
pub use networks::{Network, NetworkCapabilities};
pub use ordering::OrderingPolicy;
pub use script_type::ScriptType;
pub use sighash::{SighashBase, SighashType};
pub use signer::{AsyncSigner, PlaceholderSigner, Signer, SignerError, SigningRequest};
pub use tokens::{NftCapability, TokenBurn, TokenCategory, TokenPayload};
pub use utxo::{KeyMaterial, OutputSpec, OutputTemplate, Utxo};

pub mod wasm;
pub use wasm::TxBuilderNamespace;
