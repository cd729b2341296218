use std::{collections::HashMap, sync::Arc};

use serde_json::Value;
use zksync_aa_crypto::{TypedDataDomain, TypedDataTypes};
use zksync_aa_provider::{contracts, DynProvider, ProviderError};
use zksync_aa_signer::{EcdsaSigner, MultisigEcdsaSigner, PayloadSigner, Secret};
use zksync_aa_types::{
    api::{BlockTag, CallRequest, TransactionResponse},
    web3::signing::keccak256,
    Address, Bytes, K256PrivateKey, NameOrAddress, PackedEthSignature, PopulatedTransaction,
    TransactionRequest, H256, U256,
};

use crate::{
    builder::{EcdsaTransactionBuilder, MultisigTransactionBuilder, TransactionBuilder},
    utils::typed_data_digest,
    ClientError, TransferParams, WithdrawParams,
};

/// Account whose signing and transaction shaping are delegated to pluggable strategies.
///
/// The account holds no chain state. [`Self::connect()`] returns a new account bound to
/// another provider and leaves `self` untouched.
#[derive(Debug, Clone)]
pub struct SmartAccount {
    address: Address,
    secret: Secret,
    provider: Option<DynProvider>,
    payload_signer: Arc<dyn PayloadSigner>,
    transaction_builder: Arc<dyn TransactionBuilder>,
}

impl SmartAccount {
    pub fn new(
        address: Address,
        secret: Secret,
        provider: Option<DynProvider>,
        payload_signer: Arc<dyn PayloadSigner>,
        transaction_builder: Arc<dyn TransactionBuilder>,
    ) -> Self {
        Self {
            address,
            secret,
            provider,
            payload_signer,
            transaction_builder,
        }
    }

    /// Account owned by a single ECDSA key; the address is derived from the key.
    pub fn ecdsa(private_key: K256PrivateKey, provider: Option<DynProvider>) -> Self {
        let config = provider
            .as_ref()
            .map(|provider| provider.protocol_config())
            .unwrap_or_default();
        Self::new(
            private_key.address(),
            private_key.into(),
            provider,
            Arc::new(EcdsaSigner),
            Arc::new(EcdsaTransactionBuilder::new(config)),
        )
    }

    /// Multisig account at `address` signing with every key in `keys`, in order.
    pub fn multisig(
        address: Address,
        keys: Vec<K256PrivateKey>,
        provider: Option<DynProvider>,
    ) -> Self {
        let config = provider
            .as_ref()
            .map(|provider| provider.protocol_config())
            .unwrap_or_default();
        Self::new(
            address,
            keys.into(),
            provider,
            Arc::new(MultisigEcdsaSigner),
            Arc::new(MultisigTransactionBuilder::new(config)),
        )
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn secret(&self) -> &Secret {
        &self.secret
    }

    pub fn provider(&self) -> Option<&DynProvider> {
        self.provider.as_ref()
    }

    /// Returns a copy of this account bound to `provider`, or detached if it's `None`.
    pub fn connect(&self, provider: Option<DynProvider>) -> Self {
        Self {
            provider,
            ..self.clone()
        }
    }

    fn require_provider(&self) -> Result<&DynProvider, ClientError> {
        self.provider.as_ref().ok_or(ClientError::MissingProvider)
    }

    /// Balance of `token` (ETH if `None`) at `block` (the last committed block if `None`).
    pub async fn get_balance(
        &self,
        token: Option<Address>,
        block: Option<BlockTag>,
    ) -> Result<U256, ClientError> {
        let provider = self.require_provider()?;
        Ok(provider
            .get_balance(self.address, block.unwrap_or_default(), token)
            .await?)
    }

    pub async fn get_all_balances(&self) -> Result<HashMap<Address, U256>, ClientError> {
        let provider = self.require_provider()?;
        Ok(provider.get_all_account_balances(self.address).await?)
    }

    /// Number of contracts deployed by the account, as tracked by the nonce holder.
    pub async fn get_deployment_nonce(&self) -> Result<U256, ClientError> {
        let provider = self.require_provider()?;
        let request = CallRequest::call(
            provider.protocol_config().nonce_holder_address,
            contracts::get_deployment_nonce(self.address),
        );
        let output = provider.call(&request, BlockTag::Latest).await?;
        contracts::decode_uint(&output.0)
            .map_err(|err| ClientError::Network(ProviderError::from(err)))
    }

    pub async fn populate_transaction(
        &self,
        mut tx: TransactionRequest,
    ) -> Result<PopulatedTransaction, ClientError> {
        tx.from.get_or_insert(NameOrAddress::Address(self.address));
        self.transaction_builder
            .build(tx, &self.secret, self.provider.as_ref())
            .await
    }

    async fn sign_payload(&self, payload: H256) -> Result<Vec<u8>, ClientError> {
        Ok(self
            .payload_signer
            .sign(payload, &self.secret, self.provider.as_ref())
            .await?)
    }

    async fn populate_and_sign(
        &self,
        tx: TransactionRequest,
    ) -> Result<(PopulatedTransaction, Bytes), ClientError> {
        let mut populated = self.populate_transaction(tx).await?;
        match populated.from {
            Some(from) if from != self.address => {
                return Err(ClientError::FromAddressMismatch {
                    expected: self.address,
                    actual: from,
                });
            }
            _ => {}
        }

        let raw = if populated.is_eip712_tx() {
            let signature = self.sign_payload(populated.get_signed_digest()?).await?;
            populated.set_custom_signature(signature);
            populated.serialize(None)?
        } else {
            let signature = self
                .sign_payload(populated.get_default_signed_message()?)
                .await?;
            if signature.len() != PackedEthSignature::LEN {
                return Err(ClientError::UnsupportedOperation(format!(
                    "{:?} transactions need a single 65-byte signature, got {} bytes",
                    populated.transaction_type,
                    signature.len()
                )));
            }
            let signature = PackedEthSignature::deserialize_packed(&signature).map_err(|err| {
                ClientError::UnsupportedOperation(format!("malformed signature: {err}"))
            })?;
            populated.serialize(Some(&signature))?
        };
        Ok((populated, raw))
    }

    /// Populates, signs and serializes `tx`.
    pub async fn sign_transaction(&self, tx: TransactionRequest) -> Result<Bytes, ClientError> {
        Ok(self.populate_and_sign(tx).await?.1)
    }

    /// Signs `tx` and broadcasts it. Errors reported by the provider are returned as is.
    pub async fn send_transaction(
        &self,
        tx: TransactionRequest,
    ) -> Result<TransactionResponse, ClientError> {
        let provider = self.require_provider()?;
        let (populated, raw) = self.populate_and_sign(tx).await?;
        let hash = provider.send_raw_transaction(raw.clone()).await?;

        let expected_hash = if populated.is_eip712_tx() {
            populated.get_tx_hash(None)?
        } else {
            H256(keccak256(&raw.0))
        };
        if hash != expected_hash {
            tracing::warn!("Provider reported hash {hash:?} for transaction {expected_hash:?}");
        }
        tracing::info!(
            "Sent transaction {hash:?} from {:?} with nonce {}",
            self.address,
            populated.nonce
        );
        Ok(TransactionResponse::new(hash, &populated, raw))
    }

    /// Signs the EIP-191 personal message hash of `message`.
    pub async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, ClientError> {
        self.sign_payload(PackedEthSignature::personal_message_hash(message))
            .await
    }

    /// Signs EIP-712 typed data; names in `address` members are resolved via the provider.
    pub async fn sign_typed_data(
        &self,
        domain: &TypedDataDomain,
        types: &TypedDataTypes,
        value: &Value,
    ) -> Result<Vec<u8>, ClientError> {
        let digest = typed_data_digest(domain, types, value, self.provider.as_ref()).await?;
        self.sign_payload(digest).await
    }

    pub async fn transfer(
        &self,
        params: TransferParams,
    ) -> Result<TransactionResponse, ClientError> {
        let provider = self.require_provider()?;
        let tx = provider
            .get_transfer_tx(params.into_tx_params(self.address))
            .await?;
        self.send_transaction(tx).await
    }

    pub async fn withdraw(
        &self,
        params: WithdrawParams,
    ) -> Result<TransactionResponse, ClientError> {
        let provider = self.require_provider()?;
        let tx = provider
            .get_withdraw_tx(params.into_tx_params(self.address))
            .await?;
        self.send_transaction(tx).await
    }
}
