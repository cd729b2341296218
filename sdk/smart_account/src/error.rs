use zksync_aa_crypto::TypedDataError;
use zksync_aa_provider::ProviderError;
use zksync_aa_signer::SignerError;
use zksync_aa_types::{Address, SerializationTransactionError};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Operation requires a provider, but none is connected")]
    MissingProvider,
    #[error("`gasPrice` cannot be combined with EIP-1559 fee fields")]
    ConflictingFeeFields,
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
    #[error("Chain id mismatch: network has {expected}, transaction specifies {actual}")]
    ChainIdMismatch { expected: u64, actual: u64 },
    #[error("Chain id must be set before signing")]
    MissingChainId,
    #[error("Transaction `from` {actual:?} does not match signer address {expected:?}")]
    FromAddressMismatch { expected: Address, actual: Address },
    #[error("Name `{0}` cannot be resolved")]
    UnresolvedName(String),
    #[error("Missing required field for a transaction: {0}")]
    MissingRequiredField(String),
    #[error("Secret is not usable: {0}")]
    InvalidSecret(String),
    #[error("Signing error: {0}")]
    Signing(#[source] SignerError),
    #[error("Transaction encoding error: {0}")]
    Serialization(#[source] SerializationTransactionError),
    #[error("Malformed typed data: {0}")]
    TypedData(#[from] TypedDataError),
    #[error("Network error: {0}")]
    Network(#[from] ProviderError),
}

impl From<SerializationTransactionError> for ClientError {
    fn from(err: SerializationTransactionError) -> Self {
        match err {
            SerializationTransactionError::MissingChainId => Self::MissingChainId,
            err => Self::Serialization(err),
        }
    }
}

impl From<SignerError> for ClientError {
    fn from(err: SignerError) -> Self {
        match err {
            SignerError::InvalidSecret(reason) => Self::InvalidSecret(reason),
            SignerError::Serialization(err) => err.into(),
            err => Self::Signing(err),
        }
    }
}
