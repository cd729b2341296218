use async_trait::async_trait;
use zksync_aa_crypto::CryptoError;
use zksync_aa_types::{
    Address, EIP712TypedStructure, Eip712Domain, PackedEthSignature, PopulatedTransaction,
    SerializationTransactionError,
};

pub use crate::{
    eip712_signer::Eip712Signer,
    payload::{CustomSigner, EcdsaSigner, MultisigEcdsaSigner, PayloadSigner, SignFuture},
    pk_signer::PrivateKeySigner,
    secret::Secret,
};

mod eip712_signer;
mod payload;
mod pk_signer;
mod secret;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SignerError {
    #[error("Secret is not usable by this signer: {0}")]
    InvalidSecret(String),
    #[error("{0}")]
    Custom(String),
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
    #[error("Cannot encode transaction: {0}")]
    Serialization(#[from] SerializationTransactionError),
}

/// Base-chain style signer bound to a single key.
#[async_trait]
pub trait EthereumSigner: 'static + Send + Sync + Clone {
    async fn sign_typed_data<S: EIP712TypedStructure + Sync>(
        &self,
        domain: &Eip712Domain,
        typed_struct: &S,
    ) -> Result<PackedEthSignature, SignerError>;

    /// Signs a populated transaction and returns its wire encoding.
    async fn sign_transaction(&self, tx: &PopulatedTransaction) -> Result<Vec<u8>, SignerError>;

    /// Signs `message` the way `personal_sign` does.
    async fn sign_message(&self, message: &[u8]) -> Result<PackedEthSignature, SignerError>;

    async fn get_address(&self) -> Result<Address, SignerError>;
}
