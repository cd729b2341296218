use zksync_aa_types::{
    Address, NameOrAddress, PaymasterParams, ProtocolConfig, TransactionRequest, U256,
};

use crate::{contracts, ProviderError, ZksProvider};

/// Transfer of ETH or an ERC20 token from `from` to `to`.
#[derive(Debug, Clone, Default)]
pub struct TransferTxParams {
    pub from: Address,
    pub to: Address,
    pub amount: U256,
    /// `None` or the ETH address transfers the base token.
    pub token: Option<Address>,
    pub paymaster_params: Option<PaymasterParams>,
    /// Fields copied into the resulting request before the transfer fields are set.
    pub overrides: TransactionRequest,
}

/// Withdrawal of ETH or an ERC20 token to L1.
#[derive(Debug, Clone, Default)]
pub struct WithdrawTxParams {
    pub from: Address,
    pub token: Address,
    pub amount: U256,
    /// L1 receiver; defaults to `from`.
    pub to: Option<Address>,
    /// Bridge used for tokens; defaults to the network's default ERC20 bridge.
    pub bridge_address: Option<Address>,
    pub paymaster_params: Option<PaymasterParams>,
    pub overrides: TransactionRequest,
}

fn base_request(
    overrides: TransactionRequest,
    from: Address,
    paymaster_params: Option<PaymasterParams>,
) -> TransactionRequest {
    let mut request = overrides;
    request.from.get_or_insert(NameOrAddress::Address(from));
    match paymaster_params {
        Some(params) => request.paymaster_params(params),
        None => request,
    }
}

pub(crate) fn transfer_tx(params: TransferTxParams, config: &ProtocolConfig) -> TransactionRequest {
    let request = base_request(params.overrides, params.from, params.paymaster_params);
    match params.token {
        Some(token) if !config.is_eth(token) => request
            .to(token)
            .data(contracts::erc20_transfer(params.to, params.amount)),
        _ => request.to(params.to).value(params.amount),
    }
}

pub(crate) async fn withdraw_tx<P: ZksProvider + ?Sized>(
    provider: &P,
    params: WithdrawTxParams,
    config: &ProtocolConfig,
) -> Result<TransactionRequest, ProviderError> {
    let receiver = params.to.unwrap_or(params.from);
    let request = base_request(params.overrides, params.from, params.paymaster_params);

    if config.is_eth(params.token) {
        return Ok(request
            .to(config.l2_base_token_address)
            .data(contracts::base_token_withdraw(receiver))
            .value(params.amount));
    }

    let bridge = match params.bridge_address {
        Some(bridge) => bridge,
        None => provider
            .get_bridge_contracts()
            .await?
            .l2_erc20_default_bridge
            .ok_or_else(|| {
                ProviderError::MalformedResponse(
                    "network reports no default L2 ERC20 bridge".into(),
                )
            })?,
    };
    Ok(request
        .to(bridge)
        .data(contracts::bridge_withdraw(
            receiver,
            params.token,
            params.amount,
        ))
        .value(U256::zero()))
}
