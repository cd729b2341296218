use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use jsonrpsee::{
    core::client::ClientT,
    http_client::{HttpClient, HttpClientBuilder},
    rpc_params,
};
use serde::Deserialize;
use zksync_aa_types::{
    api::{BlockTag, BridgeAddresses, CallRequest, FeeData},
    Address, Bytes, ProtocolConfig, H256, U256, U64,
};

use crate::{ProviderError, ZksProvider};

/// Priority fee suggested when the latest block reports a base fee (1.5 gwei).
const DEFAULT_MAX_PRIORITY_FEE_PER_GAS: u64 = 1_500_000_000;

/// Connection settings of [`HttpProvider`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpProviderConfig {
    /// Address of the L2 JSON-RPC API.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Timeout of a single request.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl HttpProviderConfig {
    /// Reads the config from `ZKSYNC_AA_PROVIDER_`-prefixed environment variables.
    pub fn from_env() -> envy::Result<Self> {
        envy::prefixed("ZKSYNC_AA_PROVIDER_").from_env()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_rpc_url() -> String {
    let result = "http://127.0.0.1:3050".to_string();
    tracing::info!("Using default RPC_URL: {result}");
    result
}

fn default_request_timeout_ms() -> u64 {
    let result = 30_000;
    tracing::info!("Using default REQUEST_TIMEOUT_MS: {result}");
    result
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockHeader {
    #[serde(default)]
    base_fee_per_gas: Option<U256>,
}

/// [`ZksProvider`] talking to a node over JSON-RPC.
#[derive(Debug, Clone)]
pub struct HttpProvider {
    client: HttpClient,
    protocol_config: ProtocolConfig,
}

impl HttpProvider {
    pub fn new(config: &HttpProviderConfig) -> Result<Self, ProviderError> {
        let client = HttpClientBuilder::default()
            .request_timeout(config.request_timeout())
            .build(&config.rpc_url)?;
        Ok(Self {
            client,
            protocol_config: ProtocolConfig::default(),
        })
    }

    pub fn with_protocol_config(mut self, protocol_config: ProtocolConfig) -> Self {
        self.protocol_config = protocol_config;
        self
    }
}

#[async_trait]
impl ZksProvider for HttpProvider {
    async fn chain_id(&self) -> Result<u64, ProviderError> {
        let chain_id: U64 = self.client.request("eth_chainId", rpc_params![]).await?;
        Ok(chain_id.as_u64())
    }

    async fn fee_data(&self) -> Result<FeeData, ProviderError> {
        let gas_price = self.gas_price().await?;
        let block: Option<BlockHeader> = self
            .client
            .request("eth_getBlockByNumber", rpc_params![BlockTag::Latest, false])
            .await?;
        let block =
            block.ok_or_else(|| ProviderError::MalformedResponse("no latest block".into()))?;

        let mut fee_data = FeeData {
            gas_price: Some(gas_price),
            ..FeeData::default()
        };
        if let Some(base_fee) = block.base_fee_per_gas {
            let priority_fee = U256::from(DEFAULT_MAX_PRIORITY_FEE_PER_GAS);
            fee_data.max_priority_fee_per_gas = Some(priority_fee);
            fee_data.max_fee_per_gas = Some(base_fee * 2 + priority_fee);
        }
        Ok(fee_data)
    }

    async fn gas_price(&self) -> Result<U256, ProviderError> {
        Ok(self.client.request("eth_gasPrice", rpc_params![]).await?)
    }

    async fn get_transaction_count(
        &self,
        address: Address,
        block: BlockTag,
    ) -> Result<U256, ProviderError> {
        Ok(self
            .client
            .request("eth_getTransactionCount", rpc_params![address, block])
            .await?)
    }

    async fn estimate_gas(&self, request: &CallRequest) -> Result<U256, ProviderError> {
        Ok(self
            .client
            .request("eth_estimateGas", rpc_params![request])
            .await?)
    }

    async fn call(&self, request: &CallRequest, block: BlockTag) -> Result<Bytes, ProviderError> {
        Ok(self
            .client
            .request("eth_call", rpc_params![request, block])
            .await?)
    }

    async fn balance(&self, address: Address, block: BlockTag) -> Result<U256, ProviderError> {
        Ok(self
            .client
            .request("eth_getBalance", rpc_params![address, block])
            .await?)
    }

    async fn get_all_account_balances(
        &self,
        address: Address,
    ) -> Result<HashMap<Address, U256>, ProviderError> {
        Ok(self
            .client
            .request("zks_getAllAccountBalances", rpc_params![address])
            .await?)
    }

    async fn get_bridge_contracts(&self) -> Result<BridgeAddresses, ProviderError> {
        Ok(self
            .client
            .request("zks_getBridgeContracts", rpc_params![])
            .await?)
    }

    async fn resolve_name(&self, name: &str) -> Result<Option<Address>, ProviderError> {
        // zkSync has no name service; only hex addresses resolve.
        Ok(name.parse().ok())
    }

    async fn send_raw_transaction(&self, tx: Bytes) -> Result<H256, ProviderError> {
        let hash = self
            .client
            .request("eth_sendRawTransaction", rpc_params![tx])
            .await?;
        tracing::debug!("Node accepted transaction {hash:?}");
        Ok(hash)
    }

    fn protocol_config(&self) -> ProtocolConfig {
        self.protocol_config.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn config_defaults() {
        let config: HttpProviderConfig =
            envy::from_iter(HashMap::<String, String>::new()).unwrap();
        assert_eq!(config.rpc_url, "http://127.0.0.1:3050");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn hex_addresses_resolve_without_network() {
        let config = HttpProviderConfig {
            rpc_url: "http://127.0.0.1:1".into(),
            request_timeout_ms: 10,
        };
        let provider = HttpProvider::new(&config).unwrap();
        let address = Address::repeat_byte(7);
        assert_eq!(
            provider
                .resolve_name(&format!("{address:?}"))
                .await
                .unwrap(),
            Some(address)
        );
        assert_eq!(provider.resolve_name("alice.eth").await.unwrap(), None);
    }
}
