//! EIP-712 structured data hashing.
//!
//! Statically known structures (the zkSync transaction, its domain) implement
//! [`typed_structure::EIP712TypedStructure`]; arbitrary caller-provided typed data
//! is hashed with [`typed_data::TypedDataEncoder`].

pub mod struct_builder;
pub mod typed_data;
pub mod typed_structure;
