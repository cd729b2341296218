use std::sync::Arc;

use serde_json::Value;
use tokio::sync::OnceCell;
use zksync_aa_crypto::{TypedDataDomain, TypedDataTypes};
use zksync_aa_provider::DynProvider;
use zksync_aa_signer::{Eip712Signer, EthereumSigner, PrivateKeySigner};
use zksync_aa_types::{
    api::TransactionResponse, Address, Bytes, K256PrivateKey, NameOrAddress, PackedEthSignature,
    PopulatedTransaction, ProtocolConfig, TransactionRequest,
};

use crate::{
    builder::{populate_custom, populate_standard},
    utils::{resolve_address, typed_data_digest},
    ClientError,
};

/// Conventional single-key wallet that can also sign custom transactions.
///
/// Requests without custom data and with a non-custom type are populated and signed exactly as
/// on L1. The EIP-712 signer for custom transactions needs the chain id. [`Self::connected()`]
/// resolves it while constructing the wallet; [`Self::new()`] defers it to the first custom
/// signing. Either way it is cached and shared by the clones of a wallet.
#[derive(Debug, Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
    provider: Option<DynProvider>,
    config: ProtocolConfig,
    eip712_signer: Arc<OnceCell<Eip712Signer<PrivateKeySigner>>>,
}

impl Wallet {
    pub fn new(private_key: K256PrivateKey, provider: Option<DynProvider>) -> Self {
        let config = provider
            .as_ref()
            .map(|provider| provider.protocol_config())
            .unwrap_or_default();
        Self {
            signer: PrivateKeySigner::new(private_key),
            provider,
            config,
            eip712_signer: Arc::default(),
        }
    }

    /// Creates a wallet bound to `provider` with the EIP-712 signer already resolved.
    pub async fn connected(
        private_key: K256PrivateKey,
        provider: DynProvider,
    ) -> Result<Self, ClientError> {
        let wallet = Self::new(private_key, Some(provider));
        wallet.eip712_signer().await?;
        Ok(wallet)
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn provider(&self) -> Option<&DynProvider> {
        self.provider.as_ref()
    }

    /// Returns a wallet with the same key bound to `provider`.
    pub fn connect(&self, provider: Option<DynProvider>) -> Self {
        Self {
            signer: self.signer.clone(),
            provider,
            config: self.config.clone(),
            eip712_signer: Arc::default(),
        }
    }

    fn require_provider(&self) -> Result<&DynProvider, ClientError> {
        self.provider.as_ref().ok_or(ClientError::MissingProvider)
    }

    /// Signer for custom transactions, bound to the chain id of the connected network.
    pub async fn eip712_signer(&self) -> Result<&Eip712Signer<PrivateKeySigner>, ClientError> {
        let provider = self.require_provider()?;
        self.eip712_signer
            .get_or_try_init(|| async {
                let chain_id = provider.chain_id().await?;
                tracing::debug!("Resolved chain id {chain_id} for EIP-712 signing");
                Ok::<_, ClientError>(Eip712Signer::new(self.signer.clone(), chain_id))
            })
            .await
    }

    fn check_from(&self, from: Address) -> Result<(), ClientError> {
        if from != self.address() {
            return Err(ClientError::FromAddressMismatch {
                expected: self.address(),
                actual: from,
            });
        }
        Ok(())
    }

    pub async fn populate_transaction(
        &self,
        mut tx: TransactionRequest,
    ) -> Result<PopulatedTransaction, ClientError> {
        let provider = self.require_provider()?;
        let from = resolve_address(Some(provider), tx.from.as_ref()).await?;
        self.check_from(from.unwrap_or_else(|| self.address()))?;
        tx.from = Some(NameOrAddress::Address(self.address()));

        if tx.is_eip712_tx() {
            populate_custom(tx, provider, &self.config, None).await
        } else {
            populate_standard(tx, provider).await
        }
    }

    async fn populate_and_sign(
        &self,
        tx: TransactionRequest,
    ) -> Result<(PopulatedTransaction, Bytes), ClientError> {
        let mut populated = self.populate_transaction(tx).await?;
        let raw = if populated.is_eip712_tx() {
            let signature = self.eip712_signer().await?.sign(&populated).await?;
            populated.set_custom_signature(signature.serialize_packed().to_vec());
            populated.serialize(None)?
        } else {
            Bytes(self.signer.sign_transaction(&populated).await?)
        };
        Ok((populated, raw))
    }

    pub async fn sign_transaction(&self, tx: TransactionRequest) -> Result<Bytes, ClientError> {
        Ok(self.populate_and_sign(tx).await?.1)
    }

    pub async fn send_transaction(
        &self,
        tx: TransactionRequest,
    ) -> Result<TransactionResponse, ClientError> {
        let provider = self.require_provider()?;
        let (populated, raw) = self.populate_and_sign(tx).await?;
        let hash = provider.send_raw_transaction(raw.clone()).await?;
        tracing::info!(
            "Sent transaction {hash:?} from {:?} with nonce {}",
            self.address(),
            populated.nonce
        );
        Ok(TransactionResponse::new(hash, &populated, raw))
    }

    pub async fn sign_message(&self, message: &[u8]) -> Result<PackedEthSignature, ClientError> {
        Ok(self.signer.sign_message(message).await?)
    }

    pub async fn sign_typed_data(
        &self,
        domain: &TypedDataDomain,
        types: &TypedDataTypes,
        value: &Value,
    ) -> Result<PackedEthSignature, ClientError> {
        let digest = typed_data_digest(domain, types, value, self.provider.as_ref()).await?;
        Ok(self.signer.sign_hash(&digest)?)
    }
}
