//! Networks supported by the transaction builder and the signing capabilities
//! each of them exposes.

use std::fmt;
use std::str::FromStr;

use crate::error::TxBuilderError;
use crate::opcodes::SIGHASH_FORKID;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Network {
    Bitcoin,
    BitcoinTestnet3,
    BitcoinTestnet4,
    BitcoinCash,
    BitcoinCashTestnet,
    Ecash,
    EcashTestnet,
    BitcoinGold,
    BitcoinGoldTestnet,
    BitcoinSV,
    BitcoinSVTestnet,
    Dash,
    DashTestnet,
    Dogecoin,
    DogecoinTestnet,
    Litecoin,
    LitecoinTestnet,
    Zcash,
    ZcashTestnet,
}

const ALL_NETWORKS: [Network; 19] = [
    Network::Bitcoin,
    Network::BitcoinTestnet3,
    Network::BitcoinTestnet4,
    Network::BitcoinCash,
    Network::BitcoinCashTestnet,
    Network::Ecash,
    Network::EcashTestnet,
    Network::BitcoinGold,
    Network::BitcoinGoldTestnet,
    Network::BitcoinSV,
    Network::BitcoinSVTestnet,
    Network::Dash,
    Network::DashTestnet,
    Network::Dogecoin,
    Network::DogecoinTestnet,
    Network::Litecoin,
    Network::LitecoinTestnet,
    Network::Zcash,
    Network::ZcashTestnet,
];

/// What the builder needs to know about a chain's signing scheme.
///
/// This is read once per build and applied identically to every input.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct NetworkCapabilities {
    /// Fork identifier mixed into the sighash value. `None` for chains
    /// without replay-protected signatures.
    pub fork_id: Option<u32>,
    pub segwit: bool,
    pub taproot: bool,
    /// Chain understands token prefixes on outputs (CashTokens).
    pub tokens: bool,
}

impl NetworkCapabilities {
    /// Bits OR-ed into every sighash value: `SIGHASH_FORKID | fork_id << 8`,
    /// or zero for chains without a fork marker.
    pub fn sighash_fork_bits(&self) -> u32 {
        match self.fork_id {
            Some(fork_id) => SIGHASH_FORKID | (fork_id << 8),
            None => 0,
        }
    }

    pub fn uses_fork_id(&self) -> bool {
        self.fork_id.is_some()
    }
}

impl Network {
    pub fn all() -> &'static [Network; 19] {
        &ALL_NETWORKS
    }

    /// Returns the mainnet network for a testnet, or the network itself.
    pub fn mainnet(self) -> Network {
        match self {
            Network::BitcoinTestnet3 | Network::BitcoinTestnet4 => Network::Bitcoin,
            Network::BitcoinCashTestnet => Network::BitcoinCash,
            Network::EcashTestnet => Network::Ecash,
            Network::BitcoinGoldTestnet => Network::BitcoinGold,
            Network::BitcoinSVTestnet => Network::BitcoinSV,
            Network::DashTestnet => Network::Dash,
            Network::DogecoinTestnet => Network::Dogecoin,
            Network::LitecoinTestnet => Network::Litecoin,
            Network::ZcashTestnet => Network::Zcash,
            other => other,
        }
    }

    pub fn is_testnet(self) -> bool {
        self.mainnet() != self
    }

    pub fn coin_name(self) -> &'static str {
        match self {
            Network::Bitcoin => "btc",
            Network::BitcoinTestnet3 => "tbtc",
            Network::BitcoinTestnet4 => "tbtc4",
            Network::BitcoinCash => "bch",
            Network::BitcoinCashTestnet => "tbch",
            Network::Ecash => "bcha",
            Network::EcashTestnet => "tbcha",
            Network::BitcoinGold => "btg",
            Network::BitcoinGoldTestnet => "tbtg",
            Network::BitcoinSV => "bsv",
            Network::BitcoinSVTestnet => "tbsv",
            Network::Dash => "dash",
            Network::DashTestnet => "tdash",
            Network::Dogecoin => "doge",
            Network::DogecoinTestnet => "tdoge",
            Network::Litecoin => "ltc",
            Network::LitecoinTestnet => "tltc",
            Network::Zcash => "zec",
            Network::ZcashTestnet => "tzec",
        }
    }

    pub fn from_coin_name(name: &str) -> Option<Network> {
        ALL_NETWORKS
            .iter()
            .copied()
            .find(|network| network.coin_name() == name)
    }

    /// Signing capabilities of the network.
    ///
    /// Zcash uses its own transaction format and signature digest, which this
    /// builder does not produce.
    pub fn capabilities(self) -> Result<NetworkCapabilities, TxBuilderError> {
        let capabilities = match self {
            Network::Bitcoin | Network::BitcoinTestnet3 | Network::BitcoinTestnet4 => {
                NetworkCapabilities {
                    fork_id: None,
                    segwit: true,
                    taproot: true,
                    tokens: false,
                }
            }
            Network::Litecoin | Network::LitecoinTestnet => NetworkCapabilities {
                fork_id: None,
                segwit: true,
                taproot: false,
                tokens: false,
            },
            Network::BitcoinCash | Network::BitcoinCashTestnet => NetworkCapabilities {
                fork_id: Some(0),
                segwit: false,
                taproot: false,
                tokens: true,
            },
            Network::Ecash
            | Network::EcashTestnet
            | Network::BitcoinSV
            | Network::BitcoinSVTestnet => NetworkCapabilities {
                fork_id: Some(0),
                segwit: false,
                taproot: false,
                tokens: false,
            },
            Network::BitcoinGold | Network::BitcoinGoldTestnet => NetworkCapabilities {
                fork_id: Some(79),
                segwit: true,
                taproot: false,
                tokens: false,
            },
            Network::Dash
            | Network::DashTestnet
            | Network::Dogecoin
            | Network::DogecoinTestnet => NetworkCapabilities {
                fork_id: None,
                segwit: false,
                taproot: false,
                tokens: false,
            },
            Network::Zcash | Network::ZcashTestnet => {
                return Err(TxBuilderError::UnsupportedNetwork {
                    network: self.to_string(),
                    reason: "transaction format is not bitcoin-compatible",
                })
            }
        };
        Ok(capabilities)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.coin_name())
    }
}

impl FromStr for Network {
    type Err = TxBuilderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Network::from_coin_name(s).ok_or_else(|| {
            TxBuilderError::InvalidArgument(format!(
                "Unknown network '{}'. Expected a coin name (e.g., 'btc', 'tbtc', 'bch')",
                s
            ))
        })
    }
}
