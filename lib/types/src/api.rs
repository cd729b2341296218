//! Types exchanged with the node over JSON-RPC.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use web3::types::{Address, Bytes, H256, U256, U64};

use crate::{transaction_request::Eip712Meta, PopulatedTransaction, TransactionType};

/// Call contract request (`eth_call` / `eth_estimateGas`).
///
/// When using this for `eth_estimateGas`, all the fields
/// are optional. However, for usage in `eth_call` the
/// `to` field must be provided.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    /// Sender address (None for arbitrary address)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    /// To address (None allowed for eth_estimateGas)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    /// Supplied gas (None for sensible default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<U256>,
    /// Gas price (None for sensible default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<U256>,
    /// Transferred value (None for no transfer)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    /// Data (None for empty data)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<U256>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<U64>,
    /// EIP712 meta
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eip712_meta: Option<Eip712Meta>,
}

impl CallRequest {
    /// Read-only call of `data` on `to`.
    pub fn call(to: Address, data: Vec<u8>) -> Self {
        Self {
            to: Some(to),
            data: Some(Bytes(data)),
            ..Self::default()
        }
    }
}

impl From<&PopulatedTransaction> for CallRequest {
    fn from(tx: &PopulatedTransaction) -> Self {
        Self {
            from: tx.from,
            to: tx.to,
            gas: (!tx.gas_limit.is_zero()).then_some(tx.gas_limit),
            gas_price: tx.gas_price,
            max_fee_per_gas: tx.max_fee_per_gas,
            max_priority_fee_per_gas: tx.max_priority_fee_per_gas,
            value: Some(tx.value),
            data: Some(tx.data.clone()),
            nonce: Some(tx.nonce),
            transaction_type: Some(u64::from(u8::from(tx.transaction_type)).into()),
            eip712_meta: tx.custom_data.clone(),
        }
    }
}

/// Fee data reported by the network. EIP-1559 fields are absent on networks without
/// EIP-1559 support.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<U256>,
}

impl FeeData {
    pub fn supports_eip1559(&self) -> bool {
        self.max_fee_per_gas.is_some() && self.max_priority_fee_per_gas.is_some()
    }
}

/// Block to query state at. zkSync adds `committed` and `finalized` to the standard tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum BlockTag {
    #[default]
    Committed,
    Finalized,
    Latest,
    Pending,
    Number(u64),
}

impl fmt::Display for BlockTag {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Committed => formatter.write_str("committed"),
            Self::Finalized => formatter.write_str("finalized"),
            Self::Latest => formatter.write_str("latest"),
            Self::Pending => formatter.write_str("pending"),
            Self::Number(number) => write!(formatter, "{number:#x}"),
        }
    }
}

impl Serialize for BlockTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Default bridge contracts (`zks_getBridgeContracts`).
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeAddresses {
    #[serde(default)]
    pub l1_erc20_default_bridge: Option<Address>,
    #[serde(default)]
    pub l2_erc20_default_bridge: Option<Address>,
    #[serde(default)]
    pub l1_weth_bridge: Option<Address>,
    #[serde(default)]
    pub l2_weth_bridge: Option<Address>,
}

/// Broadcast transaction as returned to the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub hash: H256,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub nonce: U256,
    pub from: Option<Address>,
    pub to: Option<Address>,
    pub value: U256,
    pub gas_limit: U256,
    pub chain_id: Option<u64>,
    pub data: Bytes,
    /// Wire payload that was broadcast.
    pub raw: Bytes,
}

impl TransactionResponse {
    pub fn new(hash: H256, tx: &PopulatedTransaction, raw: Bytes) -> Self {
        Self {
            hash,
            transaction_type: tx.transaction_type,
            nonce: tx.nonce,
            from: tx.from,
            to: tx.to,
            value: tx.value,
            gas_limit: tx.gas_limit,
            chain_id: tx.chain_id,
            data: tx.data.clone(),
            raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use test_casing::test_casing;

    use super::*;

    #[test_casing(5, [
        (BlockTag::Committed, "committed"),
        (BlockTag::Finalized, "finalized"),
        (BlockTag::Latest, "latest"),
        (BlockTag::Pending, "pending"),
        (BlockTag::Number(255), "0xff"),
    ])]
    fn block_tag_serialization(tag: BlockTag, expected: &str) {
        assert_eq!(serde_json::to_value(tag).unwrap(), expected);
    }

    #[test]
    fn call_request_carries_eip712_meta() {
        let tx = PopulatedTransaction {
            transaction_type: TransactionType::Eip712,
            from: Some(Address::repeat_byte(1)),
            custom_data: Some(Eip712Meta {
                gas_per_pubdata: 50_000.into(),
                ..Eip712Meta::default()
            }),
            ..PopulatedTransaction::default()
        };
        let request = CallRequest::from(&tx);
        assert_eq!(request.gas, None);
        assert_eq!(request.transaction_type, Some(0x71.into()));

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["eip712Meta"]["gasPerPubdata"], "0xc350");
    }

    #[test]
    fn fee_data_eip1559_support() {
        let legacy = FeeData {
            gas_price: Some(1.into()),
            ..FeeData::default()
        };
        assert!(!legacy.supports_eip1559());
        let london = FeeData {
            max_fee_per_gas: Some(2.into()),
            max_priority_fee_per_gas: Some(1.into()),
            ..legacy
        };
        assert!(london.supports_eip1559());
    }
}
