//! EIP-712 hashing for typed data whose shape is only known at runtime
//! (the `eth_signTypedData_v4` payload format).

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use web3::{
    signing::keccak256,
    types::{Address, H256, U256},
};

use crate::packed_eth_signature::PackedEthSignature;

const DOMAIN_TYPE_NAME: &str = "EIP712Domain";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TypedDataError {
    #[error("unknown type `{0}`")]
    UnknownType(String),
    #[error("typed data has no primary type")]
    NoPrimaryType,
    #[error("typed data has ambiguous primary types: {0:?}")]
    AmbiguousPrimaryType(Vec<String>),
    #[error("type `{0}` references itself")]
    CircularReference(String),
    #[error("missing value for field `{0}`")]
    MissingField(String),
    #[error("invalid value for type `{ty}`: {reason}")]
    InvalidValue { ty: String, reason: String },
}

impl TypedDataError {
    fn invalid(ty: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            ty: ty.to_owned(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedDataField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

impl TypedDataField {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
        }
    }
}

pub type TypedDataTypes = BTreeMap<String, Vec<TypedDataField>>;

/// Typed data domain. Only the fields that are set take part in the domain type.
///
/// `verifying_contract` is kept as a string so that it may hold a name which gets
/// resolved to an address before hashing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataDomain {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifying_contract: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<H256>,
}

impl TypedDataDomain {
    fn fields_and_value(&self) -> (Vec<TypedDataField>, Value) {
        let mut fields = vec![];
        let mut value = Map::new();
        if let Some(name) = &self.name {
            fields.push(TypedDataField::new("name", "string"));
            value.insert("name".into(), Value::String(name.clone()));
        }
        if let Some(version) = &self.version {
            fields.push(TypedDataField::new("version", "string"));
            value.insert("version".into(), Value::String(version.clone()));
        }
        if let Some(chain_id) = self.chain_id {
            fields.push(TypedDataField::new("chainId", "uint256"));
            value.insert("chainId".into(), Value::String(chain_id.to_string()));
        }
        if let Some(contract) = &self.verifying_contract {
            fields.push(TypedDataField::new("verifyingContract", "address"));
            value.insert("verifyingContract".into(), Value::String(contract.clone()));
        }
        if let Some(salt) = self.salt {
            fields.push(TypedDataField::new("salt", "bytes32"));
            value.insert("salt".into(), Value::String(format!("{salt:?}")));
        }
        (fields, Value::Object(value))
    }

    /// Computes the domain separator (`hashStruct(EIP712Domain)`).
    pub fn separator(&self) -> Result<H256, TypedDataError> {
        let (fields, value) = self.fields_and_value();
        let types = BTreeMap::from([(DOMAIN_TYPE_NAME.to_owned(), fields)]);
        let encoder = TypedDataEncoder {
            types,
            primary_type: DOMAIN_TYPE_NAME.to_owned(),
        };
        encoder.hash(&value)
    }
}

/// Encoder for a fixed set of types with an inferred primary type.
#[derive(Debug, Clone)]
pub struct TypedDataEncoder {
    types: TypedDataTypes,
    primary_type: String,
}

impl TypedDataEncoder {
    /// Validates `types` and infers the primary type, i.e. the only type not referenced by
    /// any other one.
    /// An `EIP712Domain` entry is ignored.
    pub fn new(mut types: TypedDataTypes) -> Result<Self, TypedDataError> {
        types.remove(DOMAIN_TYPE_NAME);

        let mut referenced = BTreeSet::new();
        for (name, fields) in &types {
            for field in fields {
                let base = base_type(&field.ty);
                if types.contains_key(base) {
                    if base == name {
                        return Err(TypedDataError::CircularReference(name.clone()));
                    }
                    referenced.insert(base.to_owned());
                } else if !is_atomic_type(base) {
                    return Err(TypedDataError::UnknownType(field.ty.clone()));
                }
            }
        }

        let mut candidates: Vec<_> = types
            .keys()
            .filter(|name| !referenced.contains(*name))
            .cloned()
            .collect();
        let primary_type = match candidates.len() {
            0 => return Err(TypedDataError::NoPrimaryType),
            1 => candidates.remove(0),
            _ => return Err(TypedDataError::AmbiguousPrimaryType(candidates)),
        };
        Ok(Self {
            types,
            primary_type,
        })
    }

    pub fn primary_type(&self) -> &str {
        &self.primary_type
    }

    /// Full EIP-712 digest for `value` of the primary type under `domain`.
    pub fn hash_typed_data(
        domain: &TypedDataDomain,
        types: &TypedDataTypes,
        value: &Value,
    ) -> Result<H256, TypedDataError> {
        let encoder = Self::new(types.clone())?;
        let struct_hash = encoder.hash(value)?;
        Ok(PackedEthSignature::typed_data_hash(
            domain.separator()?,
            struct_hash,
        ))
    }

    /// `hashStruct` of `value` interpreted as the primary type.
    pub fn hash(&self, value: &Value) -> Result<H256, TypedDataError> {
        self.hash_struct(&self.primary_type, value)
    }

    pub fn encode_type(&self, name: &str) -> Result<String, TypedDataError> {
        let mut dependencies = BTreeSet::new();
        self.collect_dependencies(name, &mut dependencies)?;
        dependencies.remove(name);

        let mut encoded = self.encode_single_type(name)?;
        for dependency in &dependencies {
            encoded += &self.encode_single_type(dependency)?;
        }
        Ok(encoded)
    }

    fn encode_single_type(&self, name: &str) -> Result<String, TypedDataError> {
        let fields = self.fields(name)?;
        let members: Vec<_> = fields
            .iter()
            .map(|field| format!("{} {}", field.ty, field.name))
            .collect();
        Ok(format!("{name}({})", members.join(",")))
    }

    fn collect_dependencies(
        &self,
        name: &str,
        found: &mut BTreeSet<String>,
    ) -> Result<(), TypedDataError> {
        if found.contains(name) {
            return Ok(());
        }
        let fields = self.fields(name)?;
        found.insert(name.to_owned());
        for field in fields {
            let base = base_type(&field.ty);
            if self.types.contains_key(base) {
                self.collect_dependencies(base, found)?;
            }
        }
        Ok(())
    }

    fn fields(&self, name: &str) -> Result<&[TypedDataField], TypedDataError> {
        self.types
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| TypedDataError::UnknownType(name.to_owned()))
    }

    pub fn hash_struct(&self, name: &str, value: &Value) -> Result<H256, TypedDataError> {
        let fields = self.fields(name)?;
        let object = value
            .as_object()
            .ok_or_else(|| TypedDataError::invalid(name, "expected an object"))?;

        let type_hash = keccak256(self.encode_type(name)?.as_bytes());
        let mut bytes = Vec::with_capacity(32 * (fields.len() + 1));
        bytes.extend_from_slice(&type_hash);
        for field in fields {
            let member = object
                .get(&field.name)
                .ok_or_else(|| TypedDataError::MissingField(field.name.clone()))?;
            bytes.extend_from_slice(self.encode_value(&field.ty, member)?.as_bytes());
        }
        Ok(keccak256(&bytes).into())
    }

    fn encode_value(&self, ty: &str, value: &Value) -> Result<H256, TypedDataError> {
        if let Some((item_type, expected_len)) = split_array_type(ty) {
            let items = value
                .as_array()
                .ok_or_else(|| TypedDataError::invalid(ty, "expected an array"))?;
            if let Some(expected_len) = expected_len {
                if items.len() != expected_len {
                    return Err(TypedDataError::invalid(
                        ty,
                        format!("expected {expected_len} items, got {}", items.len()),
                    ));
                }
            }
            let mut bytes = Vec::with_capacity(32 * items.len());
            for item in items {
                bytes.extend_from_slice(self.encode_value(item_type, item)?.as_bytes());
            }
            return Ok(keccak256(&bytes).into());
        }

        if self.types.contains_key(ty) {
            return self.hash_struct(ty, value);
        }
        encode_atomic(ty, value)
    }

    /// Returns all values of `address`-typed members that are not hex addresses
    /// and therefore need name resolution.
    pub fn collect_names(&self, value: &Value) -> Result<Vec<String>, TypedDataError> {
        let mut names = BTreeSet::new();
        self.map_addresses(&self.primary_type, value, &mut |raw| {
            if raw.parse::<Address>().is_err() {
                names.insert(raw.to_owned());
            }
            Ok(Value::String(raw.to_owned()))
        })?;
        Ok(names.into_iter().collect())
    }

    /// Returns a copy of `value` where names in `address`-typed members are replaced
    /// by the resolved addresses.
    pub fn replace_names(
        &self,
        value: &Value,
        resolved: &HashMap<String, Address>,
    ) -> Result<Value, TypedDataError> {
        self.map_addresses(&self.primary_type, value, &mut |raw| {
            Ok(match resolved.get(raw) {
                Some(address) => Value::String(format!("{address:?}")),
                None => Value::String(raw.to_owned()),
            })
        })
    }

    fn map_addresses(
        &self,
        ty: &str,
        value: &Value,
        map: &mut dyn FnMut(&str) -> Result<Value, TypedDataError>,
    ) -> Result<Value, TypedDataError> {
        if let Some((item_type, _)) = split_array_type(ty) {
            let items = value
                .as_array()
                .ok_or_else(|| TypedDataError::invalid(ty, "expected an array"))?;
            let mapped = items
                .iter()
                .map(|item| self.map_addresses(item_type, item, map))
                .collect::<Result<_, _>>()?;
            return Ok(Value::Array(mapped));
        }

        if let Some(fields) = self.types.get(ty) {
            let object = value
                .as_object()
                .ok_or_else(|| TypedDataError::invalid(ty, "expected an object"))?;
            let mut mapped = object.clone();
            for field in fields {
                if let Some(member) = object.get(&field.name) {
                    let member = self.map_addresses(&field.ty, member, map)?;
                    mapped.insert(field.name.clone(), member);
                }
            }
            return Ok(Value::Object(mapped));
        }

        match (ty, value) {
            ("address", Value::String(raw)) => map(raw),
            _ => Ok(value.clone()),
        }
    }
}

/// Splits `T[]` / `T[n]` into `T` and the optional fixed length.
fn split_array_type(ty: &str) -> Option<(&str, Option<usize>)> {
    let without_bracket = ty.strip_suffix(']')?;
    let open = without_bracket.rfind('[')?;
    let len = &without_bracket[open + 1..];
    let len = if len.is_empty() {
        None
    } else {
        Some(len.parse().ok()?)
    };
    Some((&ty[..open], len))
}

fn base_type(ty: &str) -> &str {
    ty.split('[').next().unwrap_or(ty)
}

fn is_atomic_type(ty: &str) -> bool {
    match ty {
        "address" | "bool" | "string" | "bytes" => true,
        _ => {
            if let Some(size) = ty.strip_prefix("bytes") {
                return matches!(size.parse::<usize>(), Ok(1..=32));
            }
            let bits = ty
                .strip_prefix("uint")
                .or_else(|| ty.strip_prefix("int"));
            match bits.map(str::parse::<usize>) {
                Some(Ok(bits)) => bits > 0 && bits <= 256 && bits % 8 == 0,
                _ => false,
            }
        }
    }
}

fn encode_atomic(ty: &str, value: &Value) -> Result<H256, TypedDataError> {
    match ty {
        "address" => {
            let raw = value
                .as_str()
                .ok_or_else(|| TypedDataError::invalid(ty, "expected a string"))?;
            let address: Address = raw
                .parse()
                .map_err(|_| TypedDataError::invalid(ty, format!("`{raw}` is not an address")))?;
            let mut word = [0_u8; 32];
            word[12..].copy_from_slice(address.as_bytes());
            Ok(H256(word))
        }
        "bool" => {
            let flag = match value {
                Value::Bool(flag) => *flag,
                Value::String(raw) if raw == "true" => true,
                Value::String(raw) if raw == "false" => false,
                _ => return Err(TypedDataError::invalid(ty, "expected a boolean")),
            };
            Ok(H256::from_low_u64_be(flag.into()))
        }
        "string" => {
            let raw = value
                .as_str()
                .ok_or_else(|| TypedDataError::invalid(ty, "expected a string"))?;
            Ok(keccak256(raw.as_bytes()).into())
        }
        "bytes" => Ok(keccak256(&decode_hex(ty, value)?).into()),
        _ => {
            if let Some(size) = ty.strip_prefix("bytes") {
                let size: usize = size
                    .parse()
                    .map_err(|_| TypedDataError::UnknownType(ty.to_owned()))?;
                let bytes = decode_hex(ty, value)?;
                if bytes.len() != size {
                    return Err(TypedDataError::invalid(
                        ty,
                        format!("expected {size} bytes, got {}", bytes.len()),
                    ));
                }
                let mut word = [0_u8; 32];
                word[..size].copy_from_slice(&bytes);
                return Ok(H256(word));
            }
            if let Some(bits) = ty.strip_prefix("uint") {
                let bits: usize = bits
                    .parse()
                    .map_err(|_| TypedDataError::UnknownType(ty.to_owned()))?;
                let (negative, magnitude) = parse_integer(ty, value)?;
                if negative || magnitude.bits() > bits {
                    return Err(TypedDataError::invalid(ty, "value out of range"));
                }
                return Ok(u256_to_word(magnitude));
            }
            if let Some(bits) = ty.strip_prefix("int") {
                let bits: usize = bits
                    .parse()
                    .map_err(|_| TypedDataError::UnknownType(ty.to_owned()))?;
                let (negative, magnitude) = parse_integer(ty, value)?;
                if magnitude.bits() >= bits && !(negative && is_min_signed(magnitude, bits)) {
                    return Err(TypedDataError::invalid(ty, "value out of range"));
                }
                let encoded = if negative {
                    (!magnitude).overflowing_add(U256::one()).0
                } else {
                    magnitude
                };
                return Ok(u256_to_word(encoded));
            }
            Err(TypedDataError::UnknownType(ty.to_owned()))
        }
    }
}

fn is_min_signed(magnitude: U256, bits: usize) -> bool {
    magnitude == U256::one() << (bits - 1)
}

fn u256_to_word(value: U256) -> H256 {
    let mut word = [0_u8; 32];
    value.to_big_endian(&mut word);
    H256(word)
}

fn decode_hex(ty: &str, value: &Value) -> Result<Vec<u8>, TypedDataError> {
    let raw = value
        .as_str()
        .ok_or_else(|| TypedDataError::invalid(ty, "expected a hex string"))?;
    let raw = raw.strip_prefix("0x").unwrap_or(raw);
    hex::decode(raw).map_err(|err| TypedDataError::invalid(ty, err.to_string()))
}

/// Parses a JSON number or a decimal / `0x`-prefixed string into sign and magnitude.
fn parse_integer(ty: &str, value: &Value) -> Result<(bool, U256), TypedDataError> {
    match value {
        Value::Number(number) => {
            if let Some(unsigned) = number.as_u64() {
                Ok((false, U256::from(unsigned)))
            } else if let Some(signed) = number.as_i64() {
                Ok((signed < 0, U256::from(signed.unsigned_abs())))
            } else {
                Err(TypedDataError::invalid(ty, "expected an integer"))
            }
        }
        Value::String(raw) => {
            let (negative, digits) = match raw.strip_prefix('-') {
                Some(digits) => (true, digits),
                None => (false, raw.as_str()),
            };
            let magnitude = match digits.strip_prefix("0x") {
                Some(hex_digits) => U256::from_str_radix(hex_digits, 16).ok(),
                None => U256::from_dec_str(digits).ok(),
            }
            .ok_or_else(|| TypedDataError::invalid(ty, format!("`{raw}` is not an integer")))?;
            Ok((negative && !magnitude.is_zero(), magnitude))
        }
        _ => Err(TypedDataError::invalid(ty, "expected an integer")),
    }
}
