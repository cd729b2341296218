//! Calldata for the handful of contract calls the SDK makes. The ABIs are tiny and stable,
//! so they are encoded by hand rather than loaded from ABI files.

use zksync_aa_types::{
    ethabi::{self, ParamType, Token},
    Address, U256,
};

fn encode_call(name: &str, params: &[ParamType], tokens: &[Token]) -> Vec<u8> {
    let mut calldata = ethabi::short_signature(name, params).to_vec();
    calldata.append(&mut ethabi::encode(tokens));
    calldata
}

/// `IERC20.transfer(to, amount)`
pub fn erc20_transfer(to: Address, amount: U256) -> Vec<u8> {
    encode_call(
        "transfer",
        &[ParamType::Address, ParamType::Uint(256)],
        &[Token::Address(to), Token::Uint(amount)],
    )
}

/// `IERC20.balanceOf(account)`
pub fn erc20_balance_of(account: Address) -> Vec<u8> {
    encode_call(
        "balanceOf",
        &[ParamType::Address],
        &[Token::Address(account)],
    )
}

/// `IL2BaseToken.withdraw(l1Receiver)`; the amount is passed as the call value.
pub fn base_token_withdraw(l1_receiver: Address) -> Vec<u8> {
    encode_call(
        "withdraw",
        &[ParamType::Address],
        &[Token::Address(l1_receiver)],
    )
}

/// `IL2Bridge.withdraw(l1Receiver, l2Token, amount)`
pub fn bridge_withdraw(l1_receiver: Address, l2_token: Address, amount: U256) -> Vec<u8> {
    encode_call(
        "withdraw",
        &[ParamType::Address, ParamType::Address, ParamType::Uint(256)],
        &[
            Token::Address(l1_receiver),
            Token::Address(l2_token),
            Token::Uint(amount),
        ],
    )
}

/// `INonceHolder.getDeploymentNonce(address)`
pub fn get_deployment_nonce(address: Address) -> Vec<u8> {
    encode_call(
        "getDeploymentNonce",
        &[ParamType::Address],
        &[Token::Address(address)],
    )
}

/// Decodes a single `uint256` return value.
pub fn decode_uint(output: &[u8]) -> Result<U256, ethabi::Error> {
    let tokens = ethabi::decode(&[ParamType::Uint(256)], output)?;
    match tokens.as_slice() {
        [Token::Uint(value)] => Ok(*value),
        _ => Err(ethabi::Error::InvalidData),
    }
}
