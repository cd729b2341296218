use rlp::{DecoderError, Rlp, RlpStream};
use serde::{Deserialize, Serialize};
use web3::types::{AccessList, AccessListItem, Address, Bytes, H256, U256};
use zksync_aa_crypto::{
    keccak256, EIP712TypedStructure, Eip712Domain, PackedEthSignature, StructBuilder,
};

use super::{Eip712Meta, PaymasterParams, SerializationTransactionError};
use crate::{
    bytecode::hash_bytecode, keccak256_concat, DEFAULT_L2_TX_GAS_PER_PUBDATA_BYTE,
    EIP_1559_TX_TYPE, EIP_2930_TX_TYPE, EIP_712_TX_TYPE, LEGACY_TX_TYPE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum TransactionType {
    #[default]
    Legacy = LEGACY_TX_TYPE,
    Eip2930 = EIP_2930_TX_TYPE,
    Eip1559 = EIP_1559_TX_TYPE,
    /// zkSync custom transaction carrying paymaster params and factory deps.
    Eip712 = EIP_712_TX_TYPE,
}

impl TryFrom<u8> for TransactionType {
    type Error = SerializationTransactionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            LEGACY_TX_TYPE => Self::Legacy,
            EIP_2930_TX_TYPE => Self::Eip2930,
            EIP_1559_TX_TYPE => Self::Eip1559,
            EIP_712_TX_TYPE => Self::Eip712,
            _ => return Err(SerializationTransactionError::UnknownTransactionFormat),
        })
    }
}

impl From<TransactionType> for u8 {
    fn from(value: TransactionType) -> Self {
        value as u8
    }
}

/// Transaction with every field needed for signing and serialization resolved.
///
/// `chain_id` and `from` stay optional so that encoding can report them as missing
/// instead of silently using defaults.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulatedTransaction {
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub nonce: U256,
    pub gas_limit: U256,
    pub chain_id: Option<u64>,
    pub from: Option<Address>,
    /// Recipient (`None` for contract creation).
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_list: Option<AccessList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<Eip712Meta>,
}

/// Canonical field set hashed as the EIP-712 `Transaction` struct. Every field is concrete.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionSignInput {
    pub tx_type: U256,
    pub from: Address,
    pub to: Address,
    pub gas_limit: U256,
    pub gas_per_pubdata_byte_limit: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub paymaster: Address,
    pub nonce: U256,
    pub value: U256,
    pub data: Vec<u8>,
    /// Bytecode hashes of the factory deps.
    pub factory_deps: Vec<H256>,
    pub paymaster_input: Vec<u8>,
}

impl EIP712TypedStructure for TransactionSignInput {
    const TYPE_NAME: &'static str = "Transaction";

    fn build_structure<BUILDER: StructBuilder>(&self, builder: &mut BUILDER) {
        builder.add_member("txType", &self.tx_type);
        builder.add_member("from", &U256::from(self.from.as_bytes()));
        builder.add_member("to", &U256::from(self.to.as_bytes()));
        builder.add_member("gasLimit", &self.gas_limit);
        builder.add_member("gasPerPubdataByteLimit", &self.gas_per_pubdata_byte_limit);
        builder.add_member("maxFeePerGas", &self.max_fee_per_gas);
        builder.add_member("maxPriorityFeePerGas", &self.max_priority_fee_per_gas);
        builder.add_member("paymaster", &U256::from(self.paymaster.as_bytes()));
        builder.add_member("nonce", &self.nonce);
        builder.add_member("value", &self.value);
        builder.add_member("data", &self.data.as_slice());
        builder.add_member("factoryDeps", &self.factory_deps.as_slice());
        builder.add_member("paymasterInput", &self.paymaster_input.as_slice());
    }
}

impl PopulatedTransaction {
    pub fn is_eip712_tx(&self) -> bool {
        self.transaction_type == TransactionType::Eip712
    }

    pub fn is_legacy_tx(&self) -> bool {
        self.transaction_type == TransactionType::Legacy
    }

    /// `maxFeePerGas`, falling back to `gasPrice` and then to zero.
    pub fn resolved_max_fee_per_gas(&self) -> U256 {
        self.max_fee_per_gas
            .or(self.gas_price)
            .unwrap_or_default()
    }

    /// `maxPriorityFeePerGas`, falling back to the resolved max fee.
    pub fn resolved_max_priority_fee_per_gas(&self) -> U256 {
        self.max_priority_fee_per_gas
            .unwrap_or_else(|| self.resolved_max_fee_per_gas())
    }

    pub fn get_custom_signature(&self) -> Option<&[u8]> {
        self.custom_data.as_ref()?.custom_signature.as_deref()
    }

    pub fn get_paymaster_params(&self) -> Option<&PaymasterParams> {
        self.custom_data.as_ref()?.paymaster_params.as_ref()
    }

    pub fn get_factory_deps(&self) -> &[Vec<u8>] {
        self.custom_data
            .as_ref()
            .map(|meta| meta.factory_deps.as_slice())
            .unwrap_or_default()
    }

    pub fn set_custom_signature(&mut self, signature: Vec<u8>) {
        self.custom_data
            .get_or_insert_with(Default::default)
            .custom_signature = Some(signature);
    }

    /// Maps the transaction into the struct hashed for signing, defaulting every absent field.
    pub fn sign_input(&self) -> Result<TransactionSignInput, SerializationTransactionError> {
        let factory_deps = self
            .get_factory_deps()
            .iter()
            .enumerate()
            .map(|(i, dep)| {
                hash_bytecode(dep).map_err(|err| {
                    SerializationTransactionError::InvalidFactoryDependencies(i, err)
                })
            })
            .collect::<Result<_, _>>()?;
        let paymaster_params = self.get_paymaster_params();

        Ok(TransactionSignInput {
            tx_type: U256::from(u8::from(self.transaction_type)),
            from: self.from.unwrap_or_default(),
            to: self.to.unwrap_or_default(),
            gas_limit: self.gas_limit,
            gas_per_pubdata_byte_limit: self.gas_per_pubdata(),
            max_fee_per_gas: self.resolved_max_fee_per_gas(),
            max_priority_fee_per_gas: self.resolved_max_priority_fee_per_gas(),
            paymaster: paymaster_params
                .map(|params| params.paymaster)
                .unwrap_or_default(),
            nonce: self.nonce,
            value: self.value,
            data: self.data.0.clone(),
            factory_deps,
            paymaster_input: paymaster_params
                .map(|params| params.paymaster_input.clone())
                .unwrap_or_default(),
        })
    }

    fn gas_per_pubdata(&self) -> U256 {
        self.custom_data
            .as_ref()
            .map(|meta| meta.gas_per_pubdata)
            .unwrap_or_else(|| DEFAULT_L2_TX_GAS_PER_PUBDATA_BYTE.into())
    }

    /// EIP-712 digest signed for custom transactions.
    pub fn get_signed_digest(&self) -> Result<H256, SerializationTransactionError> {
        let chain_id = self
            .chain_id
            .ok_or(SerializationTransactionError::MissingChainId)?;
        Ok(PackedEthSignature::typed_data_to_signed_bytes(
            &Eip712Domain::new(chain_id),
            &self.sign_input()?,
        ))
    }

    /// Digest an ECDSA signer has to sign for this transaction type: the EIP-712 digest for
    /// custom transactions, the hash of the unsigned envelope otherwise.
    pub fn get_default_signed_message(&self) -> Result<H256, SerializationTransactionError> {
        if self.is_eip712_tx() {
            return self.get_signed_digest();
        }
        let data = self.serialize(None)?;
        Ok(PackedEthSignature::message_to_signed_bytes(&data.0))
    }

    /// Encodes the transaction into its wire form.
    ///
    /// Custom transactions carry `custom_data.custom_signature` if it's set; `signature` fills
    /// the ECDSA slot. For other types `signature` is the only signature, and `None` yields
    /// the unsigned payload that is hashed for signing.
    pub fn serialize(
        &self,
        signature: Option<&PackedEthSignature>,
    ) -> Result<Bytes, SerializationTransactionError> {
        let mut rlp = RlpStream::new();
        rlp.begin_unbounded_list();
        if self.is_eip712_tx() {
            self.rlp_eip712(&mut rlp, signature)?;
        } else {
            self.rlp_standard(&mut rlp, signature)?;
        }
        rlp.finalize_unbounded_list();

        let mut bytes = Vec::with_capacity(rlp.as_raw().len() + 1);
        if !self.is_legacy_tx() {
            bytes.push(u8::from(self.transaction_type));
        }
        bytes.extend_from_slice(rlp.as_raw());
        Ok(Bytes(bytes))
    }

    fn rlp_eip712(
        &self,
        rlp: &mut RlpStream,
        signature: Option<&PackedEthSignature>,
    ) -> Result<(), SerializationTransactionError> {
        let chain_id = self
            .chain_id
            .ok_or(SerializationTransactionError::MissingChainId)?;
        let from = self
            .from
            .ok_or(SerializationTransactionError::FromAddressIsNull)?;

        rlp.append(&self.nonce);
        rlp.append(&self.resolved_max_priority_fee_per_gas());
        rlp.append(&self.resolved_max_fee_per_gas());
        rlp.append(&self.gas_limit);
        rlp_opt(rlp, &self.to);
        rlp.append(&self.value);
        rlp.append(&self.data.0);

        if let Some(signature) = signature {
            rlp.append(&signature.v());
            rlp.append(&U256::from_big_endian(signature.r()));
            rlp.append(&U256::from_big_endian(signature.s()));
        } else {
            rlp.append(&chain_id);
            rlp.append(&"");
            rlp.append(&"");
        }

        rlp.append(&chain_id);
        rlp.append(&from);
        match &self.custom_data {
            Some(meta) => meta.rlp_append(rlp)?,
            None => Eip712Meta {
                gas_per_pubdata: DEFAULT_L2_TX_GAS_PER_PUBDATA_BYTE.into(),
                ..Eip712Meta::default()
            }
            .rlp_append(rlp)?,
        }
        Ok(())
    }

    fn rlp_standard(
        &self,
        rlp: &mut RlpStream,
        signature: Option<&PackedEthSignature>,
    ) -> Result<(), SerializationTransactionError> {
        match self.transaction_type {
            TransactionType::Legacy => {
                rlp.append(&self.nonce);
                rlp.append(&self.gas_price.unwrap_or_default());
                rlp.append(&self.gas_limit);
                rlp_opt(rlp, &self.to);
                rlp.append(&self.value);
                rlp.append(&self.data.0);
            }
            TransactionType::Eip2930 => {
                rlp.append(&self.required_chain_id()?);
                rlp.append(&self.nonce);
                rlp.append(&self.gas_price.unwrap_or_default());
                rlp.append(&self.gas_limit);
                rlp_opt(rlp, &self.to);
                rlp.append(&self.value);
                rlp.append(&self.data.0);
                access_list_rlp(rlp, &self.access_list);
            }
            TransactionType::Eip1559 => {
                rlp.append(&self.required_chain_id()?);
                rlp.append(&self.nonce);
                rlp.append(&self.max_priority_fee_per_gas.unwrap_or_default());
                rlp.append(&self.max_fee_per_gas.unwrap_or_default());
                rlp.append(&self.gas_limit);
                rlp_opt(rlp, &self.to);
                rlp.append(&self.value);
                rlp.append(&self.data.0);
                access_list_rlp(rlp, &self.access_list);
            }
            TransactionType::Eip712 => {
                return Err(SerializationTransactionError::UnknownTransactionFormat)
            }
        }

        match (signature, self.chain_id, self.is_legacy_tx()) {
            (Some(sig), Some(chain_id), true) => {
                rlp.append(&sig.v_with_chain_id(chain_id));
                rlp.append(&U256::from_big_endian(sig.r()));
                rlp.append(&U256::from_big_endian(sig.s()));
            }
            (Some(sig), None, true) => {
                rlp.append(&(u64::from(sig.v()) + 27));
                rlp.append(&U256::from_big_endian(sig.r()));
                rlp.append(&U256::from_big_endian(sig.s()));
            }
            (None, Some(chain_id), true) => {
                rlp.append(&chain_id);
                rlp.append(&0u8);
                rlp.append(&0u8);
            }
            (Some(sig), _, false) => {
                rlp.append(&sig.v());
                rlp.append(&U256::from_big_endian(sig.r()));
                rlp.append(&U256::from_big_endian(sig.s()));
            }
            (None, _, _) => {}
        }
        Ok(())
    }

    fn required_chain_id(&self) -> Result<u64, SerializationTransactionError> {
        self.chain_id
            .ok_or(SerializationTransactionError::MissingChainId)
    }

    /// Hash the chain assigns to the transaction once it's sent with `signature`.
    pub fn get_tx_hash(
        &self,
        signature: Option<&PackedEthSignature>,
    ) -> Result<H256, SerializationTransactionError> {
        if self.is_eip712_tx() {
            let signature = match (self.get_custom_signature(), signature) {
                (Some(custom), _) if !custom.is_empty() => custom.to_vec(),
                (_, Some(signature)) => signature.serialize_packed().to_vec(),
                _ => return Err(SerializationTransactionError::IncompleteSignature),
            };
            return Ok(keccak256_concat(
                self.get_signed_digest()?,
                H256(keccak256(&signature)),
            ));
        }

        let signature = signature.ok_or(SerializationTransactionError::IncompleteSignature)?;
        let bytes = self.serialize(Some(signature))?;
        Ok(H256(keccak256(&bytes.0)))
    }

    fn decode_standard_fields(rlp: &Rlp, offset: usize) -> Result<Self, DecoderError> {
        Ok(Self {
            nonce: rlp.val_at(offset)?,
            gas_price: Some(rlp.val_at(offset + 1)?),
            gas_limit: rlp.val_at(offset + 2)?,
            to: rlp.val_at(offset + 3).ok(),
            value: rlp.val_at(offset + 4)?,
            data: Bytes(rlp.val_at(offset + 5)?),
            ..Default::default()
        })
    }

    fn decode_eip1559_fields(rlp: &Rlp, offset: usize) -> Result<Self, DecoderError> {
        Ok(Self {
            nonce: rlp.val_at(offset)?,
            max_priority_fee_per_gas: Some(rlp.val_at(offset + 1)?),
            max_fee_per_gas: Some(rlp.val_at(offset + 2)?),
            gas_limit: rlp.val_at(offset + 3)?,
            to: rlp.val_at(offset + 4).ok(),
            value: rlp.val_at(offset + 5)?,
            data: Bytes(rlp.val_at(offset + 6)?),
            ..Default::default()
        })
    }

    /// Decodes the ECDSA `(v, r, s)` triple at `offset`; an empty `r` means there is no signature.
    fn decode_signature(
        rlp: &Rlp,
        offset: usize,
    ) -> Result<Option<PackedEthSignature>, SerializationTransactionError> {
        if rlp.at(offset + 1)?.is_empty() {
            return Ok(None);
        }
        let v: u8 = rlp.val_at(offset)?;
        let r: U256 = rlp.val_at(offset + 1)?;
        let s: U256 = rlp.val_at(offset + 2)?;
        Ok(Some(PackedEthSignature::from_rsv(
            &crate::u256_to_h256(r),
            &crate::u256_to_h256(s),
            v,
        )))
    }

    /// Decodes a wire-encoded transaction of any supported type together with its ECDSA signature.
    pub fn from_bytes(
        bytes: &[u8],
    ) -> Result<(Self, Option<PackedEthSignature>), SerializationTransactionError> {
        let (tx, signature) = match bytes.first() {
            Some(x) if *x >= 0x80 => {
                let rlp = Rlp::new(bytes);
                match rlp.item_count()? {
                    6 => (Self::decode_standard_fields(&rlp, 0)?, None),
                    9 => {
                        let v: u64 = rlp.val_at(6)?;
                        let r: U256 = rlp.val_at(7)?;
                        let s: U256 = rlp.val_at(8)?;
                        let tx = Self::decode_standard_fields(&rlp, 0)?;
                        if r.is_zero() && s.is_zero() {
                            (
                                Self {
                                    chain_id: Some(v),
                                    ..tx
                                },
                                None,
                            )
                        } else {
                            let (v, chain_id) = PackedEthSignature::unpack_v(v)
                                .map_err(|_| SerializationTransactionError::MalformedSignature)?;
                            let signature = PackedEthSignature::from_rsv(
                                &crate::u256_to_h256(r),
                                &crate::u256_to_h256(s),
                                v,
                            );
                            (Self { chain_id, ..tx }, Some(signature))
                        }
                    }
                    _ => return Err(DecoderError::RlpIncorrectListLen.into()),
                }
            }
            Some(&EIP_2930_TX_TYPE) => {
                let rlp = Rlp::new(&bytes[1..]);
                let signature = match rlp.item_count()? {
                    8 => None,
                    11 => Self::decode_signature(&rlp, 8)?,
                    _ => return Err(DecoderError::RlpIncorrectListLen.into()),
                };
                let tx = Self {
                    transaction_type: TransactionType::Eip2930,
                    chain_id: Some(rlp.val_at(0)?),
                    access_list: Some(decode_access_list(&rlp.at(7)?)?),
                    ..Self::decode_standard_fields(&rlp, 1)?
                };
                (tx, signature)
            }
            Some(&EIP_1559_TX_TYPE) => {
                let rlp = Rlp::new(&bytes[1..]);
                let signature = match rlp.item_count()? {
                    9 => None,
                    12 => Self::decode_signature(&rlp, 9)?,
                    _ => return Err(DecoderError::RlpIncorrectListLen.into()),
                };
                let tx = Self {
                    transaction_type: TransactionType::Eip1559,
                    chain_id: Some(rlp.val_at(0)?),
                    access_list: Some(decode_access_list(&rlp.at(8)?)?),
                    ..Self::decode_eip1559_fields(&rlp, 1)?
                };
                (tx, signature)
            }
            Some(&EIP_712_TX_TYPE) => {
                let rlp = Rlp::new(&bytes[1..]);
                if rlp.item_count()? != 16 {
                    return Err(DecoderError::RlpIncorrectListLen.into());
                }
                let custom_signature: Vec<u8> = rlp.val_at(14)?;
                let tx = Self {
                    transaction_type: TransactionType::Eip712,
                    chain_id: Some(rlp.val_at(10)?),
                    from: Some(rlp.val_at(11)?),
                    custom_data: Some(Eip712Meta {
                        gas_per_pubdata: rlp.val_at(12)?,
                        factory_deps: rlp.list_at(13)?,
                        custom_signature: (!custom_signature.is_empty())
                            .then_some(custom_signature),
                        paymaster_params: PaymasterParams::from_vector(rlp.list_at(15)?)?,
                    }),
                    ..Self::decode_eip1559_fields(&rlp, 0)?
                };
                (tx, Self::decode_signature(&rlp, 7)?)
            }
            _ => return Err(SerializationTransactionError::UnknownTransactionFormat),
        };
        Ok((tx, signature))
    }

    /// Decodes a custom (`0x71`) transaction envelope.
    pub fn from_eip712_bytes(bytes: &[u8]) -> Result<Self, SerializationTransactionError> {
        if bytes.first() != Some(&EIP_712_TX_TYPE) {
            return Err(SerializationTransactionError::NotEip712Transaction);
        }
        Ok(Self::from_bytes(bytes)?.0)
    }
}

fn rlp_opt<T: rlp::Encodable>(rlp: &mut RlpStream, opt: &Option<T>) {
    if let Some(inner) = opt {
        rlp.append(inner);
    } else {
        rlp.append(&"");
    }
}

fn access_list_rlp(rlp: &mut RlpStream, access_list: &Option<AccessList>) {
    if let Some(access_list) = access_list {
        rlp.begin_list(access_list.len());
        for item in access_list {
            rlp.begin_list(2);
            rlp.append(&item.address);
            rlp.append_list(&item.storage_keys);
        }
    } else {
        rlp.begin_list(0);
    }
}

fn decode_access_list(rlp: &Rlp) -> Result<AccessList, DecoderError> {
    rlp.iter()
        .map(|item| {
            Ok(AccessListItem {
                address: item.val_at(0)?,
                storage_keys: item.list_at(1)?,
            })
        })
        .collect()
}
