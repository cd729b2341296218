use std::{collections::HashMap, fmt, sync::Arc};

use async_trait::async_trait;
use zksync_aa_types::{
    api::{BlockTag, BridgeAddresses, CallRequest, FeeData},
    Address, Bytes, ProtocolConfig, TransactionRequest, H256, U256,
};

use crate::{
    contracts,
    intents::{self, TransferTxParams, WithdrawTxParams},
    ProviderError,
};

/// Shared handle to a provider, as held by accounts and builders.
pub type DynProvider = Arc<dyn ZksProvider>;

/// Read and broadcast access to a zkSync network.
///
/// Implementations report errors as is; callers never retry.
#[async_trait]
pub trait ZksProvider: 'static + Send + Sync + fmt::Debug {
    async fn chain_id(&self) -> Result<u64, ProviderError>;

    async fn fee_data(&self) -> Result<FeeData, ProviderError>;

    async fn gas_price(&self) -> Result<U256, ProviderError>;

    async fn get_transaction_count(
        &self,
        address: Address,
        block: BlockTag,
    ) -> Result<U256, ProviderError>;

    async fn estimate_gas(&self, request: &CallRequest) -> Result<U256, ProviderError>;

    async fn call(&self, request: &CallRequest, block: BlockTag) -> Result<Bytes, ProviderError>;

    /// Balance of the base token.
    async fn balance(&self, address: Address, block: BlockTag) -> Result<U256, ProviderError>;

    async fn get_all_account_balances(
        &self,
        address: Address,
    ) -> Result<HashMap<Address, U256>, ProviderError>;

    async fn get_bridge_contracts(&self) -> Result<BridgeAddresses, ProviderError>;

    /// Resolves a human-readable name into an address, if the network knows it.
    async fn resolve_name(&self, name: &str) -> Result<Option<Address>, ProviderError>;

    /// Broadcasts a signed transaction and returns its hash.
    async fn send_raw_transaction(&self, tx: Bytes) -> Result<H256, ProviderError>;

    fn protocol_config(&self) -> ProtocolConfig {
        ProtocolConfig::default()
    }

    /// Balance of `token` (the base token if `None`).
    async fn get_balance(
        &self,
        address: Address,
        block: BlockTag,
        token: Option<Address>,
    ) -> Result<U256, ProviderError> {
        match token {
            Some(token) if !self.protocol_config().is_eth(token) => {
                let request = CallRequest::call(token, contracts::erc20_balance_of(address));
                let output = self.call(&request, block).await?;
                Ok(contracts::decode_uint(&output.0)?)
            }
            _ => self.balance(address, block).await,
        }
    }

    /// Translates a transfer intent into a transaction request.
    async fn get_transfer_tx(
        &self,
        params: TransferTxParams,
    ) -> Result<TransactionRequest, ProviderError> {
        Ok(intents::transfer_tx(params, &self.protocol_config()))
    }

    /// Translates a withdrawal intent into a transaction request.
    async fn get_withdraw_tx(
        &self,
        params: WithdrawTxParams,
    ) -> Result<TransactionRequest, ProviderError> {
        let config = self.protocol_config();
        intents::withdraw_tx(self, params, &config).await
    }
}
