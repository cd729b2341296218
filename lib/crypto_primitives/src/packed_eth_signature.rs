use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use web3::{
    signing::keccak256,
    types::{Address, H256},
};

use crate::{
    ecdsa_signature::{
        public_to_address, recover, sign, Error as CryptoError, K256PrivateKey,
        Signature as ETHSignature,
    },
    eip712_signature::typed_structure::{EIP712TypedStructure, Eip712Domain},
};

/// Struct used for working with Ethereum signatures created using `eth_sign`
/// (geth, ethers.js, etc).
/// Serialized as a 65 bytes long `0x` prefixed string.
///
/// Ethereum clients produce `v = 27 + recovery_id`, while the `secp256k1` library expects
/// `v = recovery_id`. Deserialization subtracts 27 from `v` when necessary and serialization
/// adds it back, so methods consuming `&self` always operate on a raw recovery id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PackedEthSignature(ETHSignature);

impl PackedEthSignature {
    /// Length of a serialized signature in bytes.
    pub const LEN: usize = 65;

    pub fn serialize_packed(&self) -> [u8; 65] {
        // adds 27 to v
        self.0.clone().into_electrum()
    }

    fn deserialize_signature(bytes: &[u8]) -> Result<[u8; 65], DeserializeError> {
        if bytes.len() != Self::LEN {
            return Err(DeserializeError::IncorrectSignatureLength(bytes.len()));
        }

        let mut bytes_array = [0u8; 65];
        bytes_array.copy_from_slice(bytes);
        Ok(bytes_array)
    }

    pub fn deserialize_packed(bytes: &[u8]) -> Result<Self, DeserializeError> {
        let mut signature = Self::deserialize_signature(bytes)?;
        if signature[64] >= 27 {
            signature[64] -= 27;
        }

        Ok(PackedEthSignature(ETHSignature::from(signature)))
    }

    pub fn sign_raw(
        private_key: &K256PrivateKey,
        signed_bytes: &H256,
    ) -> Result<PackedEthSignature, CryptoError> {
        let signature = sign(private_key, signed_bytes)?;
        Ok(PackedEthSignature(signature))
    }

    /// Signs typed struct using Ethereum private key by EIP-712 signature standard.
    /// Result of this function is the equivalent of RPC calling `eth_signTypedData`.
    pub fn sign_typed_data(
        private_key: &K256PrivateKey,
        domain: &Eip712Domain,
        typed_struct: &impl EIP712TypedStructure,
    ) -> Result<PackedEthSignature, CryptoError> {
        let signed_bytes = Self::typed_data_to_signed_bytes(domain, typed_struct);
        Self::sign_raw(private_key, &signed_bytes)
    }

    /// Signs `msg` the way `personal_sign` does.
    pub fn sign_message(
        private_key: &K256PrivateKey,
        msg: &[u8],
    ) -> Result<PackedEthSignature, CryptoError> {
        Self::sign_raw(private_key, &Self::personal_message_hash(msg))
    }

    pub fn typed_data_to_signed_bytes(
        domain: &Eip712Domain,
        typed_struct: &impl EIP712TypedStructure,
    ) -> H256 {
        Self::typed_data_hash(domain.hash_struct(), typed_struct.hash_struct())
    }

    /// Combines a domain separator with a struct hash (`keccak256("\x19\x01" ‖ domain ‖ struct)`).
    pub fn typed_data_hash(domain_separator: H256, struct_hash: H256) -> H256 {
        let mut bytes = Vec::with_capacity(66);
        bytes.extend_from_slice(b"\x19\x01");
        bytes.extend_from_slice(domain_separator.as_bytes());
        bytes.extend_from_slice(struct_hash.as_bytes());
        keccak256(&bytes).into()
    }

    pub fn message_to_signed_bytes(msg: &[u8]) -> H256 {
        keccak256(msg).into()
    }

    /// EIP-191 hash of a personal message.
    pub fn personal_message_hash(msg: &[u8]) -> H256 {
        let prefix = format!("\x19Ethereum Signed Message:\n{}", msg.len());
        let mut bytes = Vec::with_capacity(prefix.len() + msg.len());
        bytes.extend_from_slice(prefix.as_bytes());
        bytes.extend_from_slice(msg);
        keccak256(&bytes).into()
    }

    /// Checks signature and returns Ethereum address of the signer.
    /// `signed_bytes` must be the exact digest that was signed.
    pub fn signature_recover_signer(&self, signed_bytes: &H256) -> Result<Address, CryptoError> {
        let public_key = recover(&self.0, signed_bytes)?;
        Ok(public_to_address(&public_key))
    }

    pub fn from_rsv(r: &H256, s: &H256, v: u8) -> Self {
        PackedEthSignature(ETHSignature::from_rsv(r, s, v))
    }

    pub fn r(&self) -> &[u8] {
        self.0.r()
    }

    pub fn s(&self) -> &[u8] {
        self.0.s()
    }

    pub fn v(&self) -> u8 {
        self.0.v()
    }

    pub fn v_with_chain_id(&self, chain_id: u64) -> u64 {
        self.0.v() as u64 + 35 + chain_id * 2
    }

    pub fn unpack_v(v: u64) -> Result<(u8, Option<u64>), CryptoError> {
        if v == 27 {
            return Ok((0, None));
        } else if v == 28 {
            return Ok((1, None));
        } else if v >= 35 {
            let chain_id = (v - 35) >> 1;
            let v = v - 35 - chain_id * 2;
            if v == 0 {
                return Ok((0, Some(chain_id)));
            } else if v == 1 {
                return Ok((1, Some(chain_id)));
            }
        }

        Err(CryptoError::Custom(format!("Invalid v: {v}")))
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum DeserializeError {
    #[error("Eth signature length should be 65 bytes, got {0}")]
    IncorrectSignatureLength(usize),
}

impl Serialize for PackedEthSignature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let packed_signature = self.serialize_packed();
        serializer.serialize_str(&format!("0x{}", hex::encode(packed_signature)))
    }
}

impl<'de> Deserialize<'de> for PackedEthSignature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let string = String::deserialize(deserializer)?;
        let string = string.strip_prefix("0x").unwrap_or(&string);
        let bytes = hex::decode(string).map_err(serde::de::Error::custom)?;
        Self::deserialize_packed(&bytes).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use test_casing::test_casing;

    use super::*;

    #[test_casing(7, [
        (27, (0, None)),
        (28, (1, None)),
        (35, (0, Some(0))),
        (36, (1, Some(0))),
        (58, (1, Some(11))),
        (575, (0, Some(270))),
        (576, (1, Some(270))),
    ])]
    fn unpacking_v(v: u64, expected: (u8, Option<u64>)) {
        assert_eq!(PackedEthSignature::unpack_v(v).unwrap(), expected);
    }

    #[test_casing(2, [10, 30])]
    fn unpacking_wrong_v_without_chain_id(v: u64) {
        assert!(PackedEthSignature::unpack_v(v).is_err());
    }

    #[test]
    fn packed_signature_shifts_v() {
        let key = K256PrivateKey::random();
        let digest = H256::repeat_byte(0x11);
        let signature = PackedEthSignature::sign_raw(&key, &digest).unwrap();

        let packed = signature.serialize_packed();
        assert!(packed[64] == 27 || packed[64] == 28);

        let restored = PackedEthSignature::deserialize_packed(&packed).unwrap();
        assert_eq!(restored, signature);
        assert_eq!(restored.signature_recover_signer(&digest).unwrap(), key.address());
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert_eq!(
            PackedEthSignature::deserialize_packed(&[0; 64]).unwrap_err(),
            DeserializeError::IncorrectSignatureLength(64)
        );
    }

    #[test]
    fn personal_message_hash_matches_known_value() {
        // `ethers.hashMessage("Hello World")`
        let expected: H256 = "0xa1de988600a42c4b4ab089b619297c17d53cffae5d5120d82d8a92d0bb3b78f2"
            .parse()
            .unwrap();
        assert_eq!(
            PackedEthSignature::personal_message_hash(b"Hello World"),
            expected
        );
    }

    #[test]
    fn serde_uses_prefixed_hex() {
        let key = K256PrivateKey::random();
        let signature = PackedEthSignature::sign_message(&key, b"msg").unwrap();
        let json = serde_json::to_value(&signature).unwrap();
        assert!(json.as_str().unwrap().starts_with("0x"));
        let restored: PackedEthSignature = serde_json::from_value(json).unwrap();
        assert_eq!(restored, signature);
    }
}
