//! Value and token conservation across a transaction.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::bitcoin::Txid;
use crate::error::TxBuilderError;
use crate::tokens::{NftCapability, TokenCategory, TokenPayload};
use crate::utxo::{OutputSpec, OutputTemplate, Utxo};

/// Check that value and tokens are conserved. Skipped entirely for dry runs.
pub fn validate(
    inputs: &[Utxo],
    outputs: &[OutputSpec],
    fee: u64,
    dry_run: bool,
) -> Result<(), TxBuilderError> {
    if dry_run {
        debug!("dry run, skipping conservation checks");
        return Ok(());
    }
    check_value(inputs, outputs, fee)?;
    check_fungible_tokens(inputs, outputs)?;
    check_nfts(inputs, outputs)
}

fn check_value(inputs: &[Utxo], outputs: &[OutputSpec], fee: u64) -> Result<(), TxBuilderError> {
    let input_total: u128 = inputs.iter().map(|u| u.value as u128).sum();
    let output_total: u128 = outputs.iter().map(|o| o.value as u128).sum();
    debug!(input_total, output_total, fee, "value totals");
    if output_total + fee as u128 != input_total {
        return Err(TxBuilderError::UnbalancedValue {
            inputs: input_total,
            fee,
            outputs: output_total,
        });
    }
    Ok(())
}

/// A category may be created by spending output 0 of the transaction whose
/// txid equals the category id.
fn genesis_categories(inputs: &[Utxo]) -> BTreeSet<TokenCategory> {
    inputs
        .iter()
        .filter(|u| u.outpoint.vout == 0)
        .map(|u| TokenCategory::from_genesis_txid(u.outpoint.txid))
        .collect()
}

fn check_fungible_tokens(inputs: &[Utxo], outputs: &[OutputSpec]) -> Result<(), TxBuilderError> {
    let mut input_totals: BTreeMap<TokenCategory, u128> = BTreeMap::new();
    for token in inputs.iter().filter_map(|u| u.token.as_ref()) {
        *input_totals.entry(*token.category()).or_default() += token.fungible_amount() as u128;
    }

    let mut output_totals: BTreeMap<TokenCategory, u128> = BTreeMap::new();
    for output in outputs {
        match &output.template {
            OutputTemplate::TokenAware { token, .. } => {
                *output_totals.entry(*token.category()).or_default() +=
                    token.fungible_amount() as u128;
            }
            OutputTemplate::Burn(burn) => {
                *output_totals.entry(burn.category).or_default() += burn.amount as u128;
            }
            OutputTemplate::Payment { .. } | OutputTemplate::DataCarrier { .. } => {}
        }
    }

    for (category, input_total) in &input_totals {
        let output_total = output_totals.get(category).copied().unwrap_or(0);
        debug!(%category, input_total, output_total, "token totals");
        if output_total != *input_total {
            return Err(TxBuilderError::UnbalancedToken {
                category: category.to_string(),
                inputs: *input_total,
                outputs: output_total,
            });
        }
    }

    // Categories only on the output side must be created in this transaction.
    let genesis = genesis_categories(inputs);
    for (category, output_total) in &output_totals {
        if *output_total > 0 && !input_totals.contains_key(category) && !genesis.contains(category)
        {
            return Err(TxBuilderError::UnbalancedToken {
                category: category.to_string(),
                inputs: 0,
                outputs: *output_total,
            });
        }
    }
    Ok(())
}

fn check_nfts(inputs: &[Utxo], outputs: &[OutputSpec]) -> Result<(), TxBuilderError> {
    // Spent NFTs keyed by (category, transaction that created them).
    let mut spent: BTreeMap<(TokenCategory, Txid), usize> = BTreeMap::new();
    let mut minting: BTreeSet<TokenCategory> = genesis_categories(inputs);
    for utxo in inputs {
        if let Some(TokenPayload::Nft {
            category,
            capability,
            ..
        }) = &utxo.token
        {
            *spent.entry((*category, utxo.outpoint.txid)).or_default() += 1;
            if *capability == NftCapability::Minting {
                minting.insert(*category);
            }
        }
    }

    let mut accounted: BTreeMap<(TokenCategory, Txid), usize> = BTreeMap::new();
    for output in outputs {
        match &output.template {
            OutputTemplate::TokenAware {
                token: TokenPayload::Nft { category, .. },
                source,
                ..
            } => match source {
                Some(txid) => *accounted.entry((*category, *txid)).or_default() += 1,
                None => {
                    if !minting.contains(category) {
                        return Err(TxBuilderError::UnaccountedNft {
                            category: category.to_string(),
                            source_txid: "none".to_string(),
                        });
                    }
                }
            },
            OutputTemplate::Burn(burn) => {
                if let Some(txid) = burn.nft_source {
                    *accounted.entry((burn.category, txid)).or_default() += 1;
                }
            }
            _ => {}
        }
    }

    for (key, count) in spent.iter() {
        if accounted.get(key).copied().unwrap_or(0) != *count {
            return Err(unaccounted(key));
        }
    }
    if let Some(key) = accounted.keys().find(|key| !spent.contains_key(key)) {
        return Err(unaccounted(key));
    }
    Ok(())
}

fn unaccounted((category, txid): &(TokenCategory, Txid)) -> TxBuilderError {
    TxBuilderError::UnaccountedNft {
        category: category.to_string(),
        source_txid: txid.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitcoin::hashes::Hash;
    use crate::bitcoin::{OutPoint, ScriptBuf};
    use crate::multisig::tests::test_public_key;
    use crate::script_type::ScriptType;
    use crate::tokens::TokenBurn;

    fn genesis_txid(category: &TokenCategory) -> Txid {
        Txid::from_byte_array(*category.wire_bytes())
    }

    fn category(byte: u8) -> TokenCategory {
        TokenCategory::from_wire_bytes([byte; 32])
    }

    fn utxo(txid_byte: u8, value: u64) -> Utxo {
        Utxo::single_key(
            OutPoint::new(Txid::from_byte_array([txid_byte; 32]), 1),
            value,
            ScriptType::P2pkh,
            test_public_key(1),
        )
    }

    fn pay(value: u64) -> OutputSpec {
        OutputSpec::payment(ScriptBuf::from_bytes(vec![0x51]), value)
    }

    fn nft(byte: u8) -> TokenPayload {
        TokenPayload::Nft {
            category: category(byte),
            capability: NftCapability::None,
            commitment: vec![],
        }
    }

    fn fungible(byte: u8, amount: u64) -> TokenPayload {
        TokenPayload::Fungible {
            category: category(byte),
            amount,
        }
    }

    #[test]
    fn test_value_balanced() {
        let inputs = vec![utxo(1, 100_000)];
        assert!(validate(&inputs, &[pay(90_000)], 10_000, false).is_ok());
    }

    #[test]
    fn test_value_off_by_one() {
        let inputs = vec![utxo(1, 100_000)];
        assert_eq!(
            validate(&inputs, &[pay(90_001)], 10_000, false),
            Err(TxBuilderError::UnbalancedValue {
                inputs: 100_000,
                fee: 10_000,
                outputs: 90_001
            })
        );
    }

    #[test]
    fn test_dry_run_skips_everything() {
        let inputs = vec![utxo(1, 5).with_token(nft(7))];
        assert!(validate(&inputs, &[pay(1_000_000)], u64::MAX, true).is_ok());
    }

    #[test]
    fn test_no_overflow_on_large_totals() {
        let inputs = vec![utxo(1, u64::MAX), utxo(2, u64::MAX)];
        let outputs = vec![pay(u64::MAX), pay(u64::MAX - 1)];
        assert!(validate(&inputs, &outputs, 1, false).is_ok());
    }

    #[test]
    fn test_fungible_balanced_with_burn() {
        let inputs = vec![utxo(1, 2000).with_token(fungible(9, 100))];
        let outputs = vec![
            OutputSpec::token(ScriptBuf::new(), 1000, fungible(9, 60), None),
            OutputSpec::burn(TokenBurn {
                category: category(9),
                amount: 40,
                nft_source: None,
            }),
        ];
        assert!(validate(&inputs, &outputs, 1000, false).is_ok());
    }

    #[test]
    fn test_fungible_dropped() {
        let inputs = vec![utxo(1, 2000).with_token(fungible(9, 100))];
        let outputs = vec![OutputSpec::token(ScriptBuf::new(), 1000, fungible(9, 60), None)];
        assert_eq!(
            validate(&inputs, &outputs, 1000, false),
            Err(TxBuilderError::UnbalancedToken {
                category: category(9).to_string(),
                inputs: 100,
                outputs: 60
            })
        );
    }

    #[test]
    fn test_fungible_from_nowhere_requires_genesis() {
        let outputs = vec![OutputSpec::token(ScriptBuf::new(), 1000, fungible(9, 5), None)];
        let plain = vec![utxo(1, 2000)];
        assert!(matches!(
            validate(&plain, &outputs, 1000, false),
            Err(TxBuilderError::UnbalancedToken { .. })
        ));

        let genesis = vec![Utxo::single_key(
            OutPoint::new(genesis_txid(&category(9)), 0),
            2000,
            ScriptType::P2pkh,
            test_public_key(1),
        )];
        assert!(validate(&genesis, &outputs, 1000, false).is_ok());
    }

    #[test]
    fn test_nft_without_output_is_unaccounted() {
        let inputs = vec![utxo(1, 2000).with_token(nft(7))];
        assert_eq!(
            validate(&inputs, &[pay(1000)], 1000, false),
            Err(TxBuilderError::UnaccountedNft {
                category: category(7).to_string(),
                source_txid: Txid::from_byte_array([1; 32]).to_string(),
            })
        );
    }

    #[test]
    fn test_nft_sent_or_burned() {
        let source = Txid::from_byte_array([1; 32]);
        let inputs = vec![utxo(1, 2000).with_token(nft(7))];

        let sent = vec![OutputSpec::token(ScriptBuf::new(), 1000, nft(7), Some(source))];
        assert!(validate(&inputs, &sent, 1000, false).is_ok());

        let burned = vec![
            pay(1000),
            OutputSpec::burn(TokenBurn {
                category: category(7),
                amount: 0,
                nft_source: Some(source),
            }),
        ];
        assert!(validate(&inputs, &burned, 1000, false).is_ok());
    }

    #[test]
    fn test_nft_sent_twice_is_unaccounted() {
        let source = Txid::from_byte_array([1; 32]);
        let inputs = vec![utxo(1, 2000).with_token(nft(7))];
        let outputs = vec![
            OutputSpec::token(ScriptBuf::new(), 500, nft(7), Some(source)),
            OutputSpec::token(ScriptBuf::new(), 500, nft(7), Some(source)),
        ];
        assert!(matches!(
            validate(&inputs, &outputs, 1000, false),
            Err(TxBuilderError::UnaccountedNft { .. })
        ));
    }

    #[test]
    fn test_nft_with_wrong_source_is_unaccounted() {
        let inputs = vec![utxo(1, 2000).with_token(nft(7))];
        let outputs = vec![OutputSpec::token(
            ScriptBuf::new(),
            1000,
            nft(7),
            Some(Txid::from_byte_array([2; 32])),
        )];
        assert!(matches!(
            validate(&inputs, &outputs, 1000, false),
            Err(TxBuilderError::UnaccountedNft { .. })
        ));
    }

    #[test]
    fn test_minting_nft_creates_new_nfts() {
        let source = Txid::from_byte_array([1; 32]);
        let minting = TokenPayload::Nft {
            category: category(7),
            capability: NftCapability::Minting,
            commitment: vec![],
        };
        let inputs = vec![utxo(1, 3000).with_token(minting.clone())];
        let outputs = vec![
            OutputSpec::token(ScriptBuf::new(), 1000, minting, Some(source)),
            OutputSpec::token(ScriptBuf::new(), 1000, nft(7), None),
        ];
        assert!(validate(&inputs, &outputs, 1000, false).is_ok());

        let plain = vec![utxo(1, 3000).with_token(nft(7))];
        let outputs = vec![
            OutputSpec::token(ScriptBuf::new(), 1000, nft(7), Some(source)),
            OutputSpec::token(ScriptBuf::new(), 1000, nft(7), None),
        ];
        assert!(matches!(
            validate(&plain, &outputs, 1000, false),
            Err(TxBuilderError::UnaccountedNft { .. })
        ));
    }
}
