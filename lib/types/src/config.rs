use serde::Deserialize;
use web3::types::Address;

use crate::{
    DEFAULT_L2_TX_GAS_PER_PUBDATA_BYTE, ETHEREUM_ADDRESS, L2_BASE_TOKEN_ADDRESS,
    NONCE_HOLDER_ADDRESS,
};

/// Protocol-wide values the builders and intents rely on.
///
/// All fields default to the zkSync Era values, so an empty environment yields
/// the same config as [`ProtocolConfig::default()`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProtocolConfig {
    /// Gas per pubdata byte put into custom transactions that don't set one.
    #[serde(default = "default_gas_per_pubdata")]
    pub default_gas_per_pubdata: u64,
    /// System contract tracking account and deployment nonces.
    #[serde(default = "default_nonce_holder_address")]
    pub nonce_holder_address: Address,
    /// System contract of the base token; ETH withdrawals are sent to it.
    #[serde(default = "default_l2_base_token_address")]
    pub l2_base_token_address: Address,
    /// Token address denoting ETH in transfer / withdraw intents.
    #[serde(default = "default_eth_address")]
    pub eth_address: Address,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            default_gas_per_pubdata: DEFAULT_L2_TX_GAS_PER_PUBDATA_BYTE,
            nonce_holder_address: NONCE_HOLDER_ADDRESS,
            l2_base_token_address: L2_BASE_TOKEN_ADDRESS,
            eth_address: ETHEREUM_ADDRESS,
        }
    }
}

impl ProtocolConfig {
    /// Reads the config from `ZKSYNC_AA_`-prefixed environment variables.
    pub fn from_env() -> envy::Result<Self> {
        envy::prefixed("ZKSYNC_AA_").from_env()
    }

    /// Both the ETH placeholder and the L2 base token contract denote ETH.
    pub fn is_eth(&self, token: Address) -> bool {
        token == self.eth_address || token == self.l2_base_token_address
    }
}

fn default_gas_per_pubdata() -> u64 {
    let result = DEFAULT_L2_TX_GAS_PER_PUBDATA_BYTE;
    tracing::info!("Using default DEFAULT_GAS_PER_PUBDATA: {result}");
    result
}

fn default_nonce_holder_address() -> Address {
    let result = NONCE_HOLDER_ADDRESS;
    tracing::info!("Using default NONCE_HOLDER_ADDRESS: {result:?}");
    result
}

fn default_l2_base_token_address() -> Address {
    let result = L2_BASE_TOKEN_ADDRESS;
    tracing::info!("Using default L2_BASE_TOKEN_ADDRESS: {result:?}");
    result
}

fn default_eth_address() -> Address {
    let result = ETHEREUM_ADDRESS;
    tracing::info!("Using default ETH_ADDRESS: {result:?}");
    result
}
