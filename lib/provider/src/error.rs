use thiserror::Error;
use zksync_aa_types::ethabi;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("RPC request failed: {0}")]
    Rpc(#[from] jsonrpsee::core::client::Error),
    #[error("Malformed node response: {0}")]
    MalformedResponse(String),
    #[error("ABI error: {0}")]
    Abi(#[from] ethabi::Error),
    #[error("Rejected by node: {0}")]
    Rejected(String),
}
