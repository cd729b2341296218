//! Transaction model of zkSync smart accounts: sparse requests, fully populated transactions,
//! paymaster parameters and the EIP-712 (`0x71`) wire format.

pub use web3::{
    self, ethabi,
    types::{AccessList, AccessListItem, Address, Bytes, H160, H256, U256, U64},
};
pub use zksync_aa_crypto::{
    EIP712TypedStructure, Eip712Domain, K256PrivateKey, PackedEthSignature, StructBuilder,
};

pub use self::{
    config::ProtocolConfig,
    constants::*,
    transaction_request::{
        CustomData, Eip712Meta, NameOrAddress, PaymasterParams, PopulatedTransaction,
        SerializationTransactionError, TransactionRequest, TransactionSignInput, TransactionType,
    },
};

pub mod api;
pub mod bytecode;
pub mod config;
mod constants;
pub mod paymaster;
pub mod transaction_request;

/// Converts `U256` into a 32-byte big-endian word.
pub fn u256_to_h256(num: U256) -> H256 {
    let mut bytes = [0u8; 32];
    num.to_big_endian(&mut bytes);
    H256::from_slice(&bytes)
}

/// Hashes the concatenation of two words.
pub fn keccak256_concat(hash1: H256, hash2: H256) -> H256 {
    let mut bytes = [0_u8; 64];
    bytes[..32].copy_from_slice(hash1.as_bytes());
    bytes[32..].copy_from_slice(hash2.as_bytes());
    H256(zksync_aa_crypto::keccak256(&bytes))
}
