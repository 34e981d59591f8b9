#[macro_use]
mod try_into_js_value;
mod signer;
mod try_from_js_value;
mod tx_builder;

pub use tx_builder::TxBuilderNamespace;
