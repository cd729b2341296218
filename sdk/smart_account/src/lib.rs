//! Account abstraction SDK for zkSync.
//!
//! [`SmartAccount`] binds an address and an arbitrary [`Secret`] to two strategies: a
//! [`TransactionBuilder`] that fills sparse requests and a [`PayloadSigner`] that turns
//! digests into whatever signature the account contract validates. [`Wallet`] is the
//! conventional single-key counterpart that also understands custom transactions.

pub use zksync_aa_provider::{self as provider, DynProvider, ZksProvider};
pub use zksync_aa_signer::{
    CustomSigner, EcdsaSigner, MultisigEcdsaSigner, PayloadSigner, Secret, SignerError,
};
pub use zksync_aa_types as types;

pub use self::{
    account::SmartAccount,
    builder::{EcdsaTransactionBuilder, MultisigTransactionBuilder, TransactionBuilder},
    error::ClientError,
    operations::{TransferParams, WithdrawParams},
    wallet::Wallet,
};

mod account;
pub mod builder;
mod error;
mod operations;
mod utils;
mod wallet;
