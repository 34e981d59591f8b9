//! End-to-end builds through the public API.

use std::cell::RefCell;
use std::sync::Arc;

use proptest::prelude::*;
use wasm_txbuilder::bitcoin::blockdata::script::Instruction;
use wasm_txbuilder::bitcoin::hashes::Hash;
use wasm_txbuilder::bitcoin::secp256k1::{ecdsa, Message, Secp256k1, SecretKey};
use wasm_txbuilder::bitcoin::sighash::SighashCache;
use wasm_txbuilder::bitcoin::{OutPoint, PublicKey, Script, ScriptBuf, Sequence, Txid};
use wasm_txbuilder::signer::Blocking;
use wasm_txbuilder::{
    build_transaction, build_transaction_async, estimate_size, BuildRequest, MultisigDescriptor,
    MultisigEntry, Network, NftCapability, OrderingPolicy, OutputSpec, ScriptType, SignerError,
    SigningRequest, TokenCategory, TokenPayload, TxBuilderError, Utxo,
};

fn secret(seed: u8) -> SecretKey {
    SecretKey::from_slice(&[seed; 32]).unwrap()
}

fn public_key(seed: u8) -> PublicKey {
    PublicKey::new(secret(seed).public_key(&Secp256k1::signing_only()))
}

fn txid(byte: u8) -> Txid {
    Txid::from_byte_array([byte; 32])
}

fn p2pkh(seed: u8) -> ScriptBuf {
    ScriptBuf::new_p2pkh(&public_key(seed).pubkey_hash())
}

fn sign_with(seed: u8, request: &SigningRequest<'_>) -> Vec<u8> {
    let secp = Secp256k1::signing_only();
    let signature = secp.sign_ecdsa(&Message::from_digest(request.digest), &secret(seed));
    let mut bytes = signature.serialize_der().to_vec();
    bytes.push(request.sighash_byte());
    bytes
}

/// Signs for any of seeds 1..=5 by matching the requested public key.
fn key_ring(request: &SigningRequest<'_>) -> Result<Vec<u8>, SignerError> {
    (1..=5u8)
        .find(|seed| public_key(*seed) == *request.public_key)
        .map(|seed| sign_with(seed, request))
        .ok_or_else(|| SignerError::new("unknown key"))
}

fn pushes(script: &Script) -> Vec<Vec<u8>> {
    script
        .instructions()
        .map(|instruction| match instruction.unwrap() {
            Instruction::PushBytes(bytes) => bytes.as_bytes().to_vec(),
            Instruction::Op(op) => panic!("unexpected opcode {}", op),
        })
        .collect()
}

#[test]
fn test_p2pkh_payment() {
    let utxo = Utxo::single_key(OutPoint::new(txid(1), 0), 100_000, ScriptType::P2pkh, public_key(1));
    let request = BuildRequest::new(
        vec![utxo],
        vec![OutputSpec::payment(p2pkh(2), 90_000)],
        10_000,
        Network::Bitcoin,
    );
    let tx = build_transaction(&request, &key_ring).unwrap();

    assert_eq!(tx.input.len(), 1);
    assert_eq!(tx.output.len(), 1);
    assert_eq!(tx.output[0].value.to_sat(), 90_000);
    assert_eq!(tx.input[0].sequence, Sequence::MAX);

    let items = pushes(&tx.input[0].script_sig);
    assert_eq!(items.len(), 2);
    assert_eq!(items[1], public_key(1).to_bytes());
    assert_eq!(*items[0].last().unwrap(), 0x01);

    // the signature commits to the legacy digest of this very transaction
    let digest = SighashCache::new(&tx)
        .legacy_signature_hash(0, &p2pkh(1), 0x01)
        .unwrap();
    let signature = ecdsa::Signature::from_der(&items[0][..items[0].len() - 1]).unwrap();
    Secp256k1::verification_only()
        .verify_ecdsa(
            &Message::from_digest(digest.to_byte_array()),
            &signature,
            &public_key(1).inner,
        )
        .unwrap();
}

#[test]
fn test_nft_without_output_is_rejected() {
    let calls = RefCell::new(0);
    let signer = |request: &SigningRequest<'_>| -> Result<Vec<u8>, SignerError> {
        *calls.borrow_mut() += 1;
        key_ring(request)
    };
    let token = TokenPayload::Nft {
        category: TokenCategory::from_wire_bytes([7; 32]),
        capability: NftCapability::None,
        commitment: vec![0xca, 0xfe],
    };
    let utxo = Utxo::single_key(OutPoint::new(txid(1), 1), 2_000, ScriptType::P2pkh, public_key(1))
        .with_token(token);
    let request = BuildRequest::new(
        vec![utxo],
        vec![OutputSpec::payment(p2pkh(2), 1_000)],
        1_000,
        Network::BitcoinCash,
    );
    assert!(matches!(
        build_transaction(&request, &signer),
        Err(TxBuilderError::UnaccountedNft { .. })
    ));
    assert_eq!(*calls.borrow(), 0);
}

#[test]
fn test_bch_token_transfer() {
    let category = TokenCategory::from_wire_bytes([7; 32]);
    let utxo = Utxo::single_key(OutPoint::new(txid(1), 1), 2_000, ScriptType::P2pkh, public_key(1))
        .with_token(TokenPayload::Fungible {
            category,
            amount: 500,
        });
    let sighashes = RefCell::new(vec![]);
    let signer = |request: &SigningRequest<'_>| -> Result<Vec<u8>, SignerError> {
        sighashes.borrow_mut().push(request.sighash);
        key_ring(request)
    };
    let request = BuildRequest::new(
        vec![utxo],
        vec![
            OutputSpec::token(
                p2pkh(2),
                1_000,
                TokenPayload::Fungible {
                    category,
                    amount: 500,
                },
                None,
            ),
            OutputSpec::payment(p2pkh(1), 500),
        ],
        500,
        Network::BitcoinCash,
    )
    .with_ordering(OrderingPolicy::AsGiven, OrderingPolicy::AsGiven);
    let tx = build_transaction(&request, &signer).unwrap();
    assert_eq!(*sighashes.borrow(), vec![0x41]);
    // token prefix marker ahead of the locking script
    assert_eq!(tx.output[0].script_pubkey.as_bytes()[0], 0xef);
    assert_eq!(&tx.output[0].script_pubkey.as_bytes()[1..33], &[7; 32]);
    assert_eq!(tx.output[1].script_pubkey, p2pkh(1));

    let mut unbalanced = request.clone();
    unbalanced.outputs[0] = OutputSpec::token(
        p2pkh(2),
        1_000,
        TokenPayload::Fungible {
            category,
            amount: 499,
        },
        None,
    );
    assert!(matches!(
        build_transaction(&unbalanced, &key_ring),
        Err(TxBuilderError::UnbalancedToken { .. })
    ));
}

fn two_of_three() -> Arc<MultisigDescriptor> {
    Arc::new(MultisigDescriptor::m_of_n(vec![public_key(1), public_key(2), public_key(3)], 2).unwrap())
}

#[test]
fn test_multisig_skips_declining_signer() {
    let descriptor = two_of_three();
    let utxo = Utxo::multisig(OutPoint::new(txid(1), 0), 10_000, ScriptType::P2sh, descriptor.clone());
    let asked = RefCell::new(vec![]);
    let signer = |request: &SigningRequest<'_>| -> Result<Vec<u8>, SignerError> {
        asked.borrow_mut().push(*request.public_key);
        if *request.public_key == public_key(1) {
            Ok(vec![])
        } else {
            key_ring(request)
        }
    };
    let request = BuildRequest::new(
        vec![utxo],
        vec![OutputSpec::payment(p2pkh(4), 9_000)],
        1_000,
        Network::Bitcoin,
    );
    let tx = build_transaction(&request, &signer).unwrap();

    assert_eq!(*asked.borrow(), vec![public_key(1), public_key(2), public_key(3)]);
    let items = pushes(&tx.input[0].script_sig);
    assert_eq!(items.len(), 4);
    assert!(items[0].is_empty());
    assert_eq!(items[3], descriptor.script().as_bytes());

    let secp = Secp256k1::verification_only();
    let digest = SighashCache::new(&tx)
        .legacy_signature_hash(0, descriptor.script(), 0x01)
        .unwrap();
    let message = Message::from_digest(digest.to_byte_array());
    for (item, seed) in items[1..3].iter().zip([2u8, 3]) {
        let signature = ecdsa::Signature::from_der(&item[..item.len() - 1]).unwrap();
        secp.verify_ecdsa(&message, &signature, &public_key(seed).inner)
            .unwrap();
    }
}

#[test]
fn test_multisig_p2wsh_witness() {
    let descriptor = two_of_three();
    let utxo = Utxo::multisig(OutPoint::new(txid(1), 0), 10_000, ScriptType::P2wsh, descriptor.clone());
    let request = BuildRequest::new(
        vec![utxo],
        vec![OutputSpec::payment(p2pkh(4), 9_000)],
        1_000,
        Network::Bitcoin,
    );
    let tx = build_transaction(&request, &key_ring).unwrap();
    assert!(tx.input[0].script_sig.is_empty());
    let witness: Vec<_> = tx.input[0].witness.iter().collect();
    assert_eq!(witness.len(), 4);
    assert!(witness[0].is_empty());
    assert_eq!(witness[3], descriptor.script().as_bytes());

    let digest = SighashCache::new(&tx)
        .p2wsh_signature_hash(
            0,
            descriptor.script(),
            wasm_txbuilder::bitcoin::Amount::from_sat(10_000),
            wasm_txbuilder::bitcoin::EcdsaSighashType::All,
        )
        .unwrap();
    let signature = ecdsa::Signature::from_der(&witness[1][..witness[1].len() - 1]).unwrap();
    Secp256k1::verification_only()
        .verify_ecdsa(
            &Message::from_digest(digest.to_byte_array()),
            &signature,
            &public_key(1).inner,
        )
        .unwrap();
}

#[test]
fn test_estimate_is_deterministic() {
    let utxos = vec![
        Utxo::single_key(OutPoint::new(txid(2), 0), 5_000, ScriptType::P2pkh, public_key(1)),
        Utxo::multisig(OutPoint::new(txid(1), 3), 5_000, ScriptType::P2shP2wsh, two_of_three()),
    ];
    let outputs = vec![
        OutputSpec::payment(p2pkh(2), 3_000),
        OutputSpec::memo("estimate"),
    ];
    let first = estimate_size(&utxos, &outputs, Network::Bitcoin).unwrap();
    for _ in 0..5 {
        assert_eq!(estimate_size(&utxos, &outputs, Network::Bitcoin).unwrap(), first);
    }
}

#[test]
fn test_rbf_sequences() {
    let utxos = vec![
        Utxo::single_key(OutPoint::new(txid(1), 0), 5_000, ScriptType::P2pkh, public_key(1)),
        Utxo::single_key(OutPoint::new(txid(2), 0), 5_000, ScriptType::P2wpkh, public_key(2)),
    ];
    let request = BuildRequest::new(
        utxos,
        vec![OutputSpec::payment(p2pkh(3), 9_000)],
        1_000,
        Network::Bitcoin,
    );

    let tx = build_transaction(&request, &key_ring).unwrap();
    assert!(tx.input.iter().all(|input| input.sequence == Sequence::MAX));

    // only the canonical first input signals
    let tx = build_transaction(&request.clone().with_rbf(true), &key_ring).unwrap();
    assert_eq!(tx.input[0].sequence.to_consensus_u32(), 0xffff_fffd);
    assert_eq!(tx.input[0].previous_output.txid, txid(1));
    assert_eq!(tx.input[1].sequence, Sequence::MAX);

    // reversed caller order, same canonical first input
    let mut reversed = request.clone().with_rbf(true);
    reversed.utxos.reverse();
    let tx = build_transaction(&reversed, &key_ring).unwrap();
    assert_eq!(tx.input[0].previous_output.txid, txid(1));
    assert_eq!(tx.input[0].sequence.to_consensus_u32(), 0xffff_fffd);
}

#[test]
fn test_async_signer_matches_sync_build() {
    let utxos = vec![
        Utxo::single_key(OutPoint::new(txid(1), 0), 5_000, ScriptType::P2pkh, public_key(1)),
        Utxo::multisig(OutPoint::new(txid(2), 0), 5_000, ScriptType::P2shP2wsh, two_of_three()),
    ];
    let request = BuildRequest::new(
        utxos,
        vec![OutputSpec::payment(p2pkh(3), 9_000)],
        1_000,
        Network::Bitcoin,
    );
    let sync_tx = build_transaction(&request, &key_ring).unwrap();
    let signer = Blocking(key_ring);
    let async_tx = futures::executor::block_on(build_transaction_async(&request, &signer)).unwrap();
    // RFC 6979 signatures are deterministic
    assert_eq!(sync_tx, async_tx);
}

fn balance_request(input: u64, output: u64, fee: u64) -> BuildRequest {
    BuildRequest::new(
        vec![Utxo::single_key(OutPoint::new(txid(1), 0), input, ScriptType::P2pkh, public_key(1))],
        vec![OutputSpec::payment(p2pkh(2), output)],
        fee,
        Network::Bitcoin,
    )
}

fn accept_all(_: &SigningRequest<'_>) -> Result<Vec<u8>, SignerError> {
    Ok(vec![0x30, 0x01])
}

proptest! {
    #[test]
    fn prop_value_must_balance_exactly(output in 0u64..1_000_000, fee in 0u64..1_000_000) {
        let input = output + fee;
        prop_assert!(build_transaction(&balance_request(input, output, fee), &accept_all).is_ok());
        prop_assert!(matches!(
            build_transaction(&balance_request(input + 1, output, fee), &accept_all),
            Err(TxBuilderError::UnbalancedValue { .. })
        ), "expected UnbalancedValue");
        if input > 0 {
            prop_assert!(matches!(
                build_transaction(&balance_request(input - 1, output, fee), &accept_all),
                Err(TxBuilderError::UnbalancedValue { .. })
            ), "expected UnbalancedValue");
        }
    }

    #[test]
    fn prop_weighted_multisig_threshold(
        spec in prop::collection::vec((1u32..4, any::<bool>()), 1..5),
        threshold_pick in 1u32..100,
    ) {
        let total: u32 = spec.iter().map(|(weight, _)| weight).sum();
        let threshold = 1 + threshold_pick % total;
        let entries = spec
            .iter()
            .enumerate()
            .map(|(i, (weight, _))| MultisigEntry { public_key: public_key(i as u8 + 1), weight: *weight })
            .collect();
        let descriptor = Arc::new(MultisigDescriptor::new(entries, threshold).unwrap());
        let accepting: Vec<PublicKey> = spec
            .iter()
            .enumerate()
            .filter(|(_, (_, accepts))| *accepts)
            .map(|(i, _)| public_key(i as u8 + 1))
            .collect();
        let accepted_weight: u32 = spec.iter().filter(|(_, accepts)| *accepts).map(|(w, _)| w).sum();

        let signer = |request: &SigningRequest<'_>| -> Result<Vec<u8>, SignerError> {
            if accepting.contains(request.public_key) {
                Ok(vec![0x30, 0x01])
            } else {
                Ok(vec![])
            }
        };
        let request = BuildRequest::new(
            vec![Utxo::multisig(OutPoint::new(txid(1), 0), 1_000, ScriptType::P2sh, descriptor.clone())],
            vec![OutputSpec::payment(p2pkh(2), 1_000)],
            0,
            Network::Bitcoin,
        );
        match build_transaction(&request, &signer) {
            Ok(tx) => {
                prop_assert!(accepted_weight >= threshold);
                let items = pushes(&tx.input[0].script_sig);
                // leading dummy, threshold signatures, redeem script
                prop_assert_eq!(items.len(), threshold as usize + 2);
            }
            Err(TxBuilderError::InsufficientMultisigWeight { .. }) => {
                prop_assert!(accepted_weight < threshold);
            }
            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
        }
    }
}
