use std::str::FromStr;

use anyhow::{Context, Result};

use wasm_txbuilder::bitcoin::secp256k1::{All, Message, Secp256k1, SecretKey};
use wasm_txbuilder::bitcoin::{NetworkKind, PrivateKey, PublicKey};
use wasm_txbuilder::{Signer, SignerError, SigningRequest};

/// Signs with a fixed set of private keys. Requests for keys it does not
/// hold are declined with an empty signature.
pub struct KeySigner {
    secp: Secp256k1<All>,
    keys: Vec<(PublicKey, PrivateKey)>,
}

fn parse_private_key(key: &str) -> Result<PrivateKey> {
    if key.len() == 64 && key.chars().all(|c| c.is_ascii_hexdigit()) {
        let secret = SecretKey::from_str(key).context("invalid hex private key")?;
        return Ok(PrivateKey::new(secret, NetworkKind::Main));
    }
    PrivateKey::from_wif(key).with_context(|| format!("invalid WIF private key '{}'", key))
}

impl KeySigner {
    /// Accepts WIF strings or 32-byte hex secrets (compressed).
    pub fn from_strings(keys: &[String]) -> Result<Self> {
        let secp = Secp256k1::new();
        let keys = keys
            .iter()
            .map(|key| {
                let private_key = parse_private_key(key)?;
                Ok((private_key.public_key(&secp), private_key))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(KeySigner { secp, keys })
    }

    pub fn public_keys(&self) -> impl Iterator<Item = &PublicKey> {
        self.keys.iter().map(|(public_key, _)| public_key)
    }
}

impl Signer for KeySigner {
    fn sign(&self, request: &SigningRequest<'_>) -> Result<Vec<u8>, SignerError> {
        let Some((_, private_key)) = self
            .keys
            .iter()
            .find(|(public_key, _)| public_key == request.public_key)
        else {
            tracing::debug!(
                input = request.input_index,
                public_key = %request.public_key,
                "no private key, declining"
            );
            return Ok(vec![]);
        };
        let message = Message::from_digest(request.digest);
        let signature = self.secp.sign_ecdsa(&message, &private_key.inner);
        let mut bytes = signature.serialize_der().to_vec();
        bytes.push(request.sighash_byte());
        Ok(bytes)
    }
}
