//! Cryptographic primitives used by zkSync smart accounts.
//!
//! The crate wraps `secp256k1` signing/recovery and implements the EIP-712
//! structured hashing that the zkSync custom transaction type is signed with.

pub use web3::{
    signing::keccak256,
    types::{Address, H256, U256},
};

pub use self::{
    ecdsa_signature::{public_to_address, recover, sign, Error as CryptoError, K256PrivateKey},
    eip712_signature::{
        struct_builder::{StructBuilder, StructMember},
        typed_data::{
            TypedDataDomain, TypedDataEncoder, TypedDataError, TypedDataField, TypedDataTypes,
        },
        typed_structure::{EIP712TypedStructure, Eip712Domain},
    },
    packed_eth_signature::{DeserializeError, PackedEthSignature},
};

pub mod ecdsa_signature;
pub mod eip712_signature;
pub mod packed_eth_signature;
