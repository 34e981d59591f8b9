//! JSON request documents accepted by `tx build` and `tx estimate`.
//!
//! The shape mirrors the object accepted by the wasm `buildTransaction`:
//! camelCase fields, hex strings for scripts, keys and data.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;

use wasm_txbuilder::bitcoin::{OutPoint, PublicKey, ScriptBuf, Txid};
use wasm_txbuilder::{
    BuildRequest, MultisigDescriptor, MultisigEntry, Network, NftCapability, OrderingPolicy,
    OutputSpec, ScriptType, SighashType, TokenBurn, TokenCategory, TokenPayload, Utxo,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestJson {
    pub utxos: Vec<UtxoJson>,
    pub outputs: Vec<OutputJson>,
    #[serde(default)]
    pub fee: u64,
    pub network: Option<String>,
    pub memo: Option<String>,
    #[serde(default)]
    pub rbf: bool,
    #[serde(default)]
    pub dry_run: bool,
    pub input_ordering: Option<String>,
    pub output_ordering: Option<String>,
    pub sighash: Option<String>,
    pub lock_time: Option<u32>,
    pub version: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoJson {
    pub txid: String,
    pub vout: u32,
    pub value: u64,
    pub script_type: String,
    pub public_key: Option<String>,
    pub multisig: Option<MultisigJson>,
    pub token: Option<TokenJson>,
}

#[derive(Debug, Deserialize)]
pub struct MultisigJson {
    pub entries: Vec<MultisigEntryJson>,
    pub threshold: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultisigEntryJson {
    pub public_key: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct TokenJson {
    pub category: String,
    pub amount: Option<u64>,
    pub nft: Option<NftJson>,
}

#[derive(Debug, Deserialize)]
pub struct NftJson {
    pub capability: String,
    #[serde(default)]
    pub commitment: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnJson {
    pub category: String,
    #[serde(default)]
    pub amount: u64,
    pub nft_source: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OutputJson {
    pub script: Option<String>,
    #[serde(default)]
    pub value: u64,
    pub token: Option<TokenJson>,
    pub source: Option<String>,
    pub data: Option<Vec<String>>,
    pub burn: Option<BurnJson>,
}

fn parse_public_key(hex_key: &str) -> Result<PublicKey> {
    PublicKey::from_str(hex_key).with_context(|| format!("invalid public key '{}'", hex_key))
}

fn parse_txid(txid: &str) -> Result<Txid> {
    Txid::from_str(txid).with_context(|| format!("invalid txid '{}'", txid))
}

impl TokenJson {
    fn to_payload(&self) -> Result<TokenPayload> {
        let category = TokenCategory::from_str(&self.category)?;
        match (&self.nft, self.amount) {
            (Some(nft), None) => Ok(TokenPayload::Nft {
                category,
                capability: NftCapability::from_str(&nft.capability)?,
                commitment: hex::decode(&nft.commitment).context("invalid NFT commitment hex")?,
            }),
            (None, Some(amount)) => Ok(TokenPayload::Fungible { category, amount }),
            _ => bail!("token must have exactly one of 'amount' or 'nft'"),
        }
    }
}

impl UtxoJson {
    fn to_utxo(&self) -> Result<Utxo> {
        let outpoint = OutPoint::new(parse_txid(&self.txid)?, self.vout);
        let script_type = ScriptType::from_str(&self.script_type)?;
        let utxo = match (&self.public_key, &self.multisig) {
            (Some(key), None) => {
                Utxo::single_key(outpoint, self.value, script_type, parse_public_key(key)?)
            }
            (None, Some(multisig)) => {
                let entries = multisig
                    .entries
                    .iter()
                    .map(|entry| {
                        Ok(MultisigEntry {
                            public_key: parse_public_key(&entry.public_key)?,
                            weight: entry.weight,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                let descriptor = MultisigDescriptor::new(entries, multisig.threshold)?;
                Utxo::multisig(outpoint, self.value, script_type, Arc::new(descriptor))
            }
            _ => bail!(
                "utxo {}:{} must have exactly one of 'publicKey' or 'multisig'",
                self.txid,
                self.vout
            ),
        };
        match &self.token {
            Some(token) => Ok(utxo.with_token(token.to_payload()?)),
            None => Ok(utxo),
        }
    }
}

impl OutputJson {
    fn to_spec(&self) -> Result<OutputSpec> {
        if let Some(burn) = &self.burn {
            return Ok(OutputSpec::burn(TokenBurn {
                category: TokenCategory::from_str(&burn.category)?,
                amount: burn.amount,
                nft_source: burn.nft_source.as_deref().map(parse_txid).transpose()?,
            }));
        }
        if let Some(chunks) = &self.data {
            let chunks = chunks
                .iter()
                .map(|chunk| hex::decode(chunk).context("invalid data chunk hex"))
                .collect::<Result<Vec<_>>>()?;
            return Ok(OutputSpec::data(chunks));
        }
        let script = self
            .script
            .as_deref()
            .ok_or_else(|| anyhow!("output needs one of 'script', 'data' or 'burn'"))?;
        let script_pubkey = ScriptBuf::from_hex(script).context("invalid output script hex")?;
        match &self.token {
            Some(token) => Ok(OutputSpec::token(
                script_pubkey,
                self.value,
                token.to_payload()?,
                self.source.as_deref().map(parse_txid).transpose()?,
            )),
            None => Ok(OutputSpec::payment(script_pubkey, self.value)),
        }
    }
}

impl RequestJson {
    /// Converts the document; `network_override` wins over the `network` field.
    pub fn to_request(&self, network_override: Option<Network>) -> Result<BuildRequest> {
        let network = match (network_override, &self.network) {
            (Some(network), _) => network,
            (None, Some(name)) => Network::from_str(name)?,
            (None, None) => bail!("no network given; set 'network' or pass --network"),
        };
        let utxos = self
            .utxos
            .iter()
            .map(UtxoJson::to_utxo)
            .collect::<Result<Vec<_>>>()?;
        let outputs = self
            .outputs
            .iter()
            .map(OutputJson::to_spec)
            .collect::<Result<Vec<_>>>()?;

        let mut request = BuildRequest::new(utxos, outputs, self.fee, network)
            .with_rbf(self.rbf)
            .with_dry_run(self.dry_run);
        if let Some(memo) = &self.memo {
            request = request.with_memo(memo.clone());
        }
        if self.input_ordering.is_some() || self.output_ordering.is_some() {
            let parse = |policy: &Option<String>| -> Result<OrderingPolicy> {
                Ok(match policy {
                    Some(name) => OrderingPolicy::from_str(name)?,
                    None => OrderingPolicy::default(),
                })
            };
            request =
                request.with_ordering(parse(&self.input_ordering)?, parse(&self.output_ordering)?);
        }
        if let Some(sighash) = &self.sighash {
            request = request.with_sighash(SighashType::from_str(sighash)?);
        }
        if let Some(lock_time) = self.lock_time {
            request = request.with_lock_time(lock_time);
        }
        if let Some(version) = self.version {
            request = request.with_version(version);
        }
        Ok(request)
    }
}
