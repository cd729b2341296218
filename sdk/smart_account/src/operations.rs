use zksync_aa_provider::{TransferTxParams, WithdrawTxParams};
use zksync_aa_types::{Address, PaymasterParams, TransactionRequest, U256};

/// Transfer of ETH or an ERC20 token from the account.
#[derive(Debug, Clone, Default)]
pub struct TransferParams {
    pub to: Address,
    pub amount: U256,
    /// Token to transfer; ETH if `None`.
    pub token: Option<Address>,
    pub paymaster_params: Option<PaymasterParams>,
    pub overrides: TransactionRequest,
}

impl TransferParams {
    pub(crate) fn into_tx_params(self, from: Address) -> TransferTxParams {
        TransferTxParams {
            from,
            to: self.to,
            amount: self.amount,
            token: self.token,
            paymaster_params: self.paymaster_params,
            overrides: self.overrides,
        }
    }
}

/// Withdrawal of ETH or an ERC20 token from the account to L1.
#[derive(Debug, Clone, Default)]
pub struct WithdrawParams {
    pub token: Address,
    pub amount: U256,
    /// L1 receiver; the account address if `None`.
    pub to: Option<Address>,
    pub bridge_address: Option<Address>,
    pub paymaster_params: Option<PaymasterParams>,
    pub overrides: TransactionRequest,
}

impl WithdrawParams {
    pub(crate) fn into_tx_params(self, from: Address) -> WithdrawTxParams {
        WithdrawTxParams {
            from,
            token: self.token,
            amount: self.amount,
            to: self.to,
            bridge_address: self.bridge_address,
            paymaster_params: self.paymaster_params,
            overrides: self.overrides,
        }
    }
}
