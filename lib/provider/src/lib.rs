//! Chain access contract consumed by smart accounts.
//!
//! [`ZksProvider`] is the only way the account code talks to the network; [`HttpProvider`]
//! implements it over JSON-RPC and [`mock::MockProvider`] serves canned data in tests.

pub use self::{
    error::ProviderError,
    http::{HttpProvider, HttpProviderConfig},
    intents::{TransferTxParams, WithdrawTxParams},
    provider::{DynProvider, ZksProvider},
};

pub mod contracts;
mod error;
mod http;
mod intents;
pub mod mock;
mod provider;
