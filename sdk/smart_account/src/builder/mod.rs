//! Strategies filling sparse transaction requests.

use std::fmt;

use async_trait::async_trait;
use zksync_aa_provider::DynProvider;
use zksync_aa_signer::Secret;
use zksync_aa_types::{
    NameOrAddress, PackedEthSignature, PopulatedTransaction, ProtocolConfig, TransactionRequest,
    LEGACY_TX_TYPE,
};

pub(crate) use self::populate::{populate_custom, populate_standard};
use crate::ClientError;

mod populate;

/// Fills a sparse request into a transaction ready for signing.
///
/// Requests with neither a type nor custom data become legacy transactions; requests with
/// custom data or the `0x71` type take the custom transaction path.
#[async_trait]
pub trait TransactionBuilder: 'static + Send + Sync + fmt::Debug {
    async fn build(
        &self,
        tx: TransactionRequest,
        secret: &Secret,
        provider: Option<&DynProvider>,
    ) -> Result<PopulatedTransaction, ClientError>;
}

fn default_to_legacy(tx: &mut TransactionRequest) {
    if tx.transaction_type.is_none() && tx.custom_data.is_none() {
        tx.transaction_type = Some(LEGACY_TX_TYPE);
    }
}

/// Builder for accounts validating a single ECDSA signature.
#[derive(Debug, Clone, Default)]
pub struct EcdsaTransactionBuilder {
    config: ProtocolConfig,
}

impl EcdsaTransactionBuilder {
    pub fn new(config: ProtocolConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TransactionBuilder for EcdsaTransactionBuilder {
    async fn build(
        &self,
        mut tx: TransactionRequest,
        secret: &Secret,
        provider: Option<&DynProvider>,
    ) -> Result<PopulatedTransaction, ClientError> {
        let provider = provider.ok_or(ClientError::MissingProvider)?;
        if tx.from.is_none() {
            tx.from = Some(NameOrAddress::Address(secret.private_key()?.address()));
        }
        default_to_legacy(&mut tx);

        if tx.is_eip712_tx() {
            tracing::debug!("Building custom transaction for an ECDSA account");
            populate_custom(tx, provider, &self.config, None).await
        } else {
            tracing::debug!("Building standard transaction for an ECDSA account");
            populate_standard(tx, provider).await
        }
    }
}

/// Builder for accounts validating one ECDSA signature per owner key.
///
/// Gas for custom transactions is estimated with a placeholder signature of the final length,
/// so that the estimate covers signature validation.
#[derive(Debug, Clone, Default)]
pub struct MultisigTransactionBuilder {
    config: ProtocolConfig,
}

impl MultisigTransactionBuilder {
    pub fn new(config: ProtocolConfig) -> Self {
        Self { config }
    }

    fn placeholder_signature(key_count: usize) -> Vec<u8> {
        let mut single = [0_u8; PackedEthSignature::LEN];
        single[PackedEthSignature::LEN - 1] = 27;
        single.repeat(key_count)
    }
}

#[async_trait]
impl TransactionBuilder for MultisigTransactionBuilder {
    async fn build(
        &self,
        mut tx: TransactionRequest,
        secret: &Secret,
        provider: Option<&DynProvider>,
    ) -> Result<PopulatedTransaction, ClientError> {
        let key_count = secret.private_keys()?.len();
        let provider = provider.ok_or(ClientError::MissingProvider)?;
        if tx.from.is_none() {
            return Err(ClientError::MissingRequiredField("from".into()));
        }
        default_to_legacy(&mut tx);

        if tx.is_eip712_tx() {
            tracing::debug!("Building custom transaction for a {key_count}-key multisig account");
            let placeholder = Self::placeholder_signature(key_count);
            populate_custom(tx, provider, &self.config, Some(placeholder)).await
        } else {
            tracing::debug!("Building standard transaction for a {key_count}-key multisig account");
            populate_standard(tx, provider).await
        }
    }
}
