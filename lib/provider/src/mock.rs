//! Mock provider serving canned chain state. Used in tests across the workspace.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use zksync_aa_types::{
    api::{BlockTag, BridgeAddresses, CallRequest, FeeData},
    web3::signing::keccak256,
    Address, Bytes, PopulatedTransaction, ProtocolConfig, ETHEREUM_ADDRESS, H256, U256,
};

use crate::{DynProvider, ProviderError, ZksProvider};

type Selector = [u8; 4];

/// Builder for [`MockProvider`].
#[derive(Debug)]
pub struct MockProviderBuilder {
    provider: MockProvider,
}

impl MockProviderBuilder {
    pub fn chain_id(mut self, chain_id: u64) -> Self {
        self.provider.chain_id = chain_id;
        self
    }

    /// Sets the gas price; also used as the legacy price in fee data.
    pub fn gas_price(mut self, gas_price: U256) -> Self {
        self.provider.gas_price = gas_price;
        self.provider.fee_data.gas_price = Some(gas_price);
        self
    }

    pub fn fee_data(mut self, fee_data: FeeData) -> Self {
        self.provider.fee_data = fee_data;
        self
    }

    pub fn nonce(mut self, nonce: U256) -> Self {
        self.provider.nonce = nonce;
        self
    }

    pub fn gas_estimate(mut self, gas: U256) -> Self {
        self.provider.gas_estimate = gas;
        self
    }

    /// Sets the balance of `account` in `token` (use [`ETHEREUM_ADDRESS`] for ETH).
    pub fn balance(mut self, account: Address, token: Address, amount: U256) -> Self {
        self.provider
            .balances
            .entry(account)
            .or_default()
            .insert(token, amount);
        self
    }

    pub fn name(mut self, name: &str, address: Address) -> Self {
        self.provider.names.insert(name.to_owned(), address);
        self
    }

    /// Sets the output of `eth_call` to `contract` with the given function selector.
    pub fn call_response(mut self, contract: Address, selector: Selector, output: Vec<u8>) -> Self {
        self.provider
            .call_responses
            .insert((contract, selector), output);
        self
    }

    pub fn bridge_contracts(mut self, bridges: BridgeAddresses) -> Self {
        self.provider.bridges = bridges;
        self
    }

    /// Makes every broadcast fail with [`ProviderError::Rejected`].
    pub fn reject_transactions(mut self, reason: &str) -> Self {
        self.provider.rejection = Some(reason.to_owned());
        self
    }

    pub fn protocol_config(mut self, config: ProtocolConfig) -> Self {
        self.provider.protocol_config = config;
        self
    }

    pub fn build(self) -> MockProvider {
        self.provider
    }

    pub fn build_dyn(self) -> DynProvider {
        Arc::new(self.build())
    }
}

/// Provider answering from in-memory state and recording what was sent to it.
#[derive(Debug)]
pub struct MockProvider {
    chain_id: u64,
    gas_price: U256,
    fee_data: FeeData,
    nonce: U256,
    gas_estimate: U256,
    balances: HashMap<Address, HashMap<Address, U256>>,
    names: HashMap<String, Address>,
    call_responses: HashMap<(Address, Selector), Vec<u8>>,
    bridges: BridgeAddresses,
    rejection: Option<String>,
    protocol_config: ProtocolConfig,
    sent_transactions: Mutex<Vec<Bytes>>,
    estimate_requests: Mutex<Vec<CallRequest>>,
    nonce_queries: Mutex<Vec<(Address, BlockTag)>>,
}

impl MockProvider {
    pub fn builder() -> MockProviderBuilder {
        MockProviderBuilder {
            provider: Self {
                chain_id: 270,
                gas_price: U256::zero(),
                fee_data: FeeData::default(),
                nonce: U256::zero(),
                gas_estimate: 21_000.into(),
                balances: HashMap::new(),
                names: HashMap::new(),
                call_responses: HashMap::new(),
                bridges: BridgeAddresses::default(),
                rejection: None,
                protocol_config: ProtocolConfig::default(),
                sent_transactions: Mutex::default(),
                estimate_requests: Mutex::default(),
                nonce_queries: Mutex::default(),
            },
        }
    }

    /// Raw payloads passed to `send_raw_transaction`, in order.
    pub fn sent_transactions(&self) -> Vec<Bytes> {
        lock(&self.sent_transactions).clone()
    }

    /// Requests passed to `estimate_gas`, in order.
    pub fn estimate_requests(&self) -> Vec<CallRequest> {
        lock(&self.estimate_requests).clone()
    }

    pub fn nonce_queries(&self) -> Vec<(Address, BlockTag)> {
        lock(&self.nonce_queries).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ZksProvider for MockProvider {
    async fn chain_id(&self) -> Result<u64, ProviderError> {
        Ok(self.chain_id)
    }

    async fn fee_data(&self) -> Result<FeeData, ProviderError> {
        Ok(self.fee_data.clone())
    }

    async fn gas_price(&self) -> Result<U256, ProviderError> {
        Ok(self.gas_price)
    }

    async fn get_transaction_count(
        &self,
        address: Address,
        block: BlockTag,
    ) -> Result<U256, ProviderError> {
        lock(&self.nonce_queries).push((address, block));
        Ok(self.nonce)
    }

    async fn estimate_gas(&self, request: &CallRequest) -> Result<U256, ProviderError> {
        lock(&self.estimate_requests).push(request.clone());
        Ok(self.gas_estimate)
    }

    async fn call(&self, request: &CallRequest, _block: BlockTag) -> Result<Bytes, ProviderError> {
        let contract = request.to.unwrap_or_default();
        let data = request.data.as_ref().map(|data| data.0.as_slice()).unwrap_or_default();
        let selector: Selector = data
            .get(..4)
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| ProviderError::Rejected("call without function selector".into()))?;
        self.call_responses
            .get(&(contract, selector))
            .cloned()
            .map(Bytes)
            .ok_or_else(|| ProviderError::Rejected(format!("execution reverted: {contract:?}")))
    }

    async fn balance(&self, address: Address, _block: BlockTag) -> Result<U256, ProviderError> {
        Ok(self
            .balances
            .get(&address)
            .and_then(|tokens| tokens.get(&ETHEREUM_ADDRESS))
            .copied()
            .unwrap_or_default())
    }

    async fn get_all_account_balances(
        &self,
        address: Address,
    ) -> Result<HashMap<Address, U256>, ProviderError> {
        Ok(self.balances.get(&address).cloned().unwrap_or_default())
    }

    async fn get_bridge_contracts(&self) -> Result<BridgeAddresses, ProviderError> {
        Ok(self.bridges.clone())
    }

    async fn resolve_name(&self, name: &str) -> Result<Option<Address>, ProviderError> {
        if let Ok(address) = name.parse() {
            return Ok(Some(address));
        }
        Ok(self.names.get(name).copied())
    }

    async fn send_raw_transaction(&self, tx: Bytes) -> Result<H256, ProviderError> {
        if let Some(reason) = &self.rejection {
            return Err(ProviderError::Rejected(reason.clone()));
        }
        let hash = PopulatedTransaction::from_eip712_bytes(&tx.0)
            .and_then(|decoded| decoded.get_tx_hash(None))
            .unwrap_or_else(|_| H256(keccak256(&tx.0)));
        lock(&self.sent_transactions).push(tx);
        Ok(hash)
    }

    fn protocol_config(&self) -> ProtocolConfig {
        self.protocol_config.clone()
    }
}
