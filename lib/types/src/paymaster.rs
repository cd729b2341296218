//! Encoders for the two standardized paymaster flows (`IPaymasterFlow`).

use std::str::FromStr;

use web3::{
    ethabi::{self, Contract, Token},
    types::{Address, U256},
};

use crate::transaction_request::PaymasterParams;

const IPAYMASTER_FLOW_INTERFACE: &str = include_str!("./abi/IPaymasterFlow.json");

/// Input of a paymaster call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymasterInput {
    /// Raw bytes passed through to the paymaster.
    General { inner_input: Vec<u8> },
    /// The paymaster is allowed to pull at least `minimal_allowance` of `token` from the sender.
    ApprovalBased {
        token: Address,
        minimal_allowance: U256,
        inner_input: Vec<u8>,
    },
}

impl PaymasterInput {
    pub fn encode(&self) -> Result<Vec<u8>, ethabi::Error> {
        let contract = load_contract(IPAYMASTER_FLOW_INTERFACE)?;
        match self {
            Self::General { inner_input } => contract
                .function("general")?
                .encode_input(&[Token::Bytes(inner_input.clone())]),
            Self::ApprovalBased {
                token,
                minimal_allowance,
                inner_input,
            } => contract.function("approvalBased")?.encode_input(&[
                Token::Address(*token),
                Token::Uint(*minimal_allowance),
                Token::Bytes(inner_input.clone()),
            ]),
        }
    }
}

pub fn load_contract(raw_abi_string: &str) -> Result<Contract, ethabi::Error> {
    let malformed = |err: serde_json::Error| ethabi::Error::Other(err.to_string().into());
    let abi = serde_json::Value::from_str(raw_abi_string).map_err(malformed)?;
    let abi = abi
        .get("abi")
        .ok_or_else(|| ethabi::Error::Other("contract ABI has no `abi` key".into()))?
        .to_string();
    Contract::load(abi.as_bytes())
}

pub fn get_paymaster_params(
    paymaster: Address,
    input: &PaymasterInput,
) -> Result<PaymasterParams, ethabi::Error> {
    Ok(PaymasterParams {
        paymaster,
        paymaster_input: input.encode()?,
    })
}

pub fn get_approval_based_paymaster_input(
    paymaster: Address,
    token_address: Address,
    min_allowance: U256,
    inner_input: Vec<u8>,
) -> Result<PaymasterParams, ethabi::Error> {
    let input = PaymasterInput::ApprovalBased {
        token: token_address,
        minimal_allowance: min_allowance,
        inner_input,
    };
    get_paymaster_params(paymaster, &input)
}

/// Approval-based params suitable for fee estimation, when the allowance is not known yet.
pub fn get_approval_based_paymaster_input_for_estimation(
    paymaster: Address,
    token_address: Address,
) -> Result<PaymasterParams, ethabi::Error> {
    get_approval_based_paymaster_input(
        paymaster,
        token_address,
        Default::default(),
        Default::default(),
    )
}

pub fn get_general_paymaster_input(
    paymaster: Address,
    inner_input: Vec<u8>,
) -> Result<PaymasterParams, ethabi::Error> {
    get_paymaster_params(paymaster, &PaymasterInput::General { inner_input })
}
