use std::fmt;

use rlp::{DecoderError, RlpStream};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use web3::types::{AccessList, Address, Bytes, U256};

pub use self::populated::{PopulatedTransaction, TransactionSignInput, TransactionType};
use crate::{bytecode::InvalidBytecodeError, EIP_712_TX_TYPE};

mod populated;

#[derive(Debug, Error)]
pub enum SerializationTransactionError {
    #[error("chain id is required to sign or serialize this transaction")]
    MissingChainId,
    #[error("transaction type is not supported")]
    UnknownTransactionFormat,
    #[error("expected an EIP-712 transaction")]
    NotEip712Transaction,
    #[error("fromAddressIsNull")]
    FromAddressIsNull,
    #[error("incompleteSignature")]
    IncompleteSignature,
    #[error("empty custom signatures are not supported")]
    EmptyCustomSignature,
    #[error("decodeRlpError {0}")]
    DecodeRlpError(#[from] DecoderError),
    #[error("invalid signature")]
    MalformedSignature,
    #[error("malformed paymaster params")]
    MalformedPaymasterParams,
    #[error("factory dependency #{0} is invalid: {1}")]
    InvalidFactoryDependencies(usize, InvalidBytecodeError),
}

/// Address that may still need to be resolved through the provider.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NameOrAddress {
    Address(Address),
    Name(String),
}

impl fmt::Debug for NameOrAddress {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(address) => write!(formatter, "{address:?}"),
            Self::Name(name) => formatter.write_str(name),
        }
    }
}

impl From<Address> for NameOrAddress {
    fn from(address: Address) -> Self {
        Self::Address(address)
    }
}

impl From<&str> for NameOrAddress {
    fn from(name: &str) -> Self {
        match name.parse() {
            Ok(address) => Self::Address(address),
            Err(_) => Self::Name(name.to_owned()),
        }
    }
}

#[derive(Default, Serialize, Deserialize, Clone, PartialEq, Debug, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymasterParams {
    pub paymaster: Address,
    pub paymaster_input: Vec<u8>,
}

impl PaymasterParams {
    fn from_vector(value: Vec<Vec<u8>>) -> Result<Option<Self>, SerializationTransactionError> {
        if value.is_empty() {
            return Ok(None);
        }
        if value.len() != 2 || value[0].len() != 20 {
            return Err(SerializationTransactionError::MalformedPaymasterParams);
        }

        let result = Some(Self {
            paymaster: Address::from_slice(&value[0]),
            paymaster_input: value[1].clone(),
        });

        Ok(result)
    }
}

/// Sparse zkSync-specific part of a request; unset fields get protocol defaults when populated.
#[derive(Default, Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CustomData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_per_pubdata: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory_deps: Option<Vec<Vec<u8>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_signature: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_params: Option<PaymasterParams>,
}

impl CustomData {
    /// Fills unset fields with defaults.
    pub fn into_meta(self, default_gas_per_pubdata: U256) -> Eip712Meta {
        Eip712Meta {
            gas_per_pubdata: self.gas_per_pubdata.unwrap_or(default_gas_per_pubdata),
            factory_deps: self.factory_deps.unwrap_or_default(),
            custom_signature: self.custom_signature,
            paymaster_params: self.paymaster_params,
        }
    }
}

/// Complete zkSync-specific part of a populated transaction.
#[derive(Default, Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Eip712Meta {
    pub gas_per_pubdata: U256,
    #[serde(default)]
    pub factory_deps: Vec<Vec<u8>>,
    pub custom_signature: Option<Vec<u8>>,
    pub paymaster_params: Option<PaymasterParams>,
}

impl Eip712Meta {
    pub fn rlp_append(&self, rlp: &mut RlpStream) -> Result<(), SerializationTransactionError> {
        rlp.append(&self.gas_per_pubdata);
        rlp.begin_list(self.factory_deps.len());
        for dep in &self.factory_deps {
            rlp.append(&dep.as_slice());
        }

        match &self.custom_signature {
            Some(signature) if signature.is_empty() => {
                return Err(SerializationTransactionError::EmptyCustomSignature);
            }
            Some(signature) => {
                rlp.append(&signature.as_slice());
            }
            None => {
                rlp.append(&"");
            }
        }

        if let Some(paymaster_params) = &self.paymaster_params {
            rlp.begin_list(2);
            rlp.append(&paymaster_params.paymaster.as_bytes());
            rlp.append(&paymaster_params.paymaster_input);
        } else {
            rlp.begin_list(0);
        }
        Ok(())
    }
}

/// Sparse transaction intent supplied by the caller.
///
/// Legacy (`gas_price`) and EIP-1559 (`max_fee_per_gas`, `max_priority_fee_per_gas`) pricing
/// are mutually exclusive.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<NameOrAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<NameOrAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_list: Option<AccessList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<CustomData>,
}

impl TransactionRequest {
    pub fn to(mut self, to: impl Into<NameOrAddress>) -> Self {
        self.to = Some(to.into());
        self
    }

    pub fn from(mut self, from: impl Into<NameOrAddress>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn value(mut self, value: U256) -> Self {
        self.value = Some(value);
        self
    }

    pub fn data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn nonce(mut self, nonce: U256) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn gas_limit(mut self, gas_limit: U256) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    pub fn gas_price(mut self, gas_price: U256) -> Self {
        self.gas_price = Some(gas_price);
        self
    }

    pub fn transaction_type(mut self, transaction_type: u8) -> Self {
        self.transaction_type = Some(transaction_type);
        self
    }

    pub fn custom_data(mut self, custom_data: CustomData) -> Self {
        self.custom_data = Some(custom_data);
        self
    }

    /// Attaches paymaster params, creating `custom_data` if necessary.
    pub fn paymaster_params(mut self, paymaster_params: PaymasterParams) -> Self {
        self.custom_data
            .get_or_insert_with(CustomData::default)
            .paymaster_params = Some(paymaster_params);
        self
    }

    /// Whether the request must take the zkSync custom transaction path.
    pub fn is_eip712_tx(&self) -> bool {
        self.custom_data.is_some() || self.transaction_type == Some(EIP_712_TX_TYPE)
    }

    pub fn has_eip1559_fees(&self) -> bool {
        self.max_fee_per_gas.is_some() || self.max_priority_fee_per_gas.is_some()
    }
}
