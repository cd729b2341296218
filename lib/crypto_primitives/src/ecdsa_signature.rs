//! Thin layer over `secp256k1` producing Ethereum-compatible recoverable signatures.

use std::{fmt, str::FromStr};

use rand::Rng;
use secp256k1::{
    ecdsa::{RecoverableSignature, RecoveryId},
    Message, PublicKey, SecretKey, SECP256K1,
};
use web3::{
    signing::keccak256,
    types::{Address, H256},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid secret key")]
    InvalidSecretKey,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid recovery id: {0}")]
    InvalidRecoveryId(u8),
    #[error("secp256k1 failure: {0}")]
    Secp256k1(#[from] secp256k1::Error),
    #[error("{0}")]
    Custom(String),
}

/// Recoverable ECDSA signature laid out as `r || s || v`, where `v` is the raw
/// recovery id (0 or 1).
#[derive(Clone, PartialEq, Eq)]
pub struct Signature([u8; 65]);

impl Default for Signature {
    fn default() -> Self {
        Self([0; 65])
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "Signature(0x{})", hex::encode(self.0))
    }
}

impl From<[u8; 65]> for Signature {
    fn from(bytes: [u8; 65]) -> Self {
        Self(bytes)
    }
}

impl Signature {
    pub fn from_rsv(r: &H256, s: &H256, v: u8) -> Self {
        let mut bytes = [0_u8; 65];
        bytes[..32].copy_from_slice(r.as_bytes());
        bytes[32..64].copy_from_slice(s.as_bytes());
        bytes[64] = v;
        Self(bytes)
    }

    pub fn r(&self) -> &[u8] {
        &self.0[..32]
    }

    pub fn s(&self) -> &[u8] {
        &self.0[32..64]
    }

    pub fn v(&self) -> u8 {
        self.0[64]
    }

    /// Converts the signature into the "electrum" notation (`v` is shifted by 27).
    pub fn into_electrum(mut self) -> [u8; 65] {
        self.0[64] = self.0[64].wrapping_add(27);
        self.0
    }
}

/// secp256k1 private key.
#[derive(Clone, PartialEq, Eq)]
pub struct K256PrivateKey(SecretKey);

impl fmt::Debug for K256PrivateKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Key material never ends up in logs.
        formatter
            .debug_tuple("K256PrivateKey")
            .field(&self.address())
            .finish()
    }
}

impl K256PrivateKey {
    pub fn from_bytes(bytes: H256) -> Result<Self, Error> {
        SecretKey::from_slice(bytes.as_bytes())
            .map(Self)
            .map_err(|_| Error::InvalidSecretKey)
    }

    pub fn random() -> Self {
        Self::random_using(&mut rand::thread_rng())
    }

    pub fn random_using(rng: &mut impl Rng) -> Self {
        loop {
            let bytes: [u8; 32] = rng.gen();
            if let Ok(secret) = SecretKey::from_slice(&bytes) {
                return Self(secret);
            }
        }
    }

    pub fn expose_secret(&self) -> H256 {
        H256(self.0.secret_bytes())
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_secret_key(SECP256K1, &self.0)
    }

    pub fn address(&self) -> Address {
        public_to_address(&self.public_key())
    }

    /// Signs a 32-byte digest as is, without any prefixing.
    pub fn sign_prehashed(&self, digest: &H256) -> Result<Signature, Error> {
        sign(self, digest)
    }
}

impl FromStr for K256PrivateKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|_| Error::InvalidSecretKey)?;
        if bytes.len() != 32 {
            return Err(Error::InvalidSecretKey);
        }
        Self::from_bytes(H256::from_slice(&bytes))
    }
}

pub fn sign(private_key: &K256PrivateKey, message: &H256) -> Result<Signature, Error> {
    let message = Message::from_slice(message.as_bytes())?;
    let signature = SECP256K1.sign_ecdsa_recoverable(&message, &private_key.0);
    let (recovery_id, data) = signature.serialize_compact();

    let mut bytes = [0_u8; 65];
    bytes[..64].copy_from_slice(&data);
    bytes[64] = recovery_id.to_i32() as u8;
    Ok(Signature(bytes))
}

pub fn recover(signature: &Signature, message: &H256) -> Result<PublicKey, Error> {
    let v = signature.v();
    let recovery_id =
        RecoveryId::from_i32(i32::from(v)).map_err(|_| Error::InvalidRecoveryId(v))?;
    let signature = RecoverableSignature::from_compact(&signature.0[..64], recovery_id)
        .map_err(|_| Error::InvalidSignature)?;
    let message = Message::from_slice(message.as_bytes())?;
    Ok(SECP256K1.recover_ecdsa(&message, &signature)?)
}

pub fn public_to_address(public: &PublicKey) -> Address {
    let uncompressed = public.serialize_uncompressed();
    let hash = keccak256(&uncompressed[1..]);
    Address::from_slice(&hash[12..])
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known development key (Hardhat account #0).
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn derives_known_address() {
        let key: K256PrivateKey = DEV_KEY.parse().unwrap();
        let expected: Address = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap();
        assert_eq!(key.address(), expected);
    }

    #[test]
    fn signature_recovers_signer() {
        let key = K256PrivateKey::random();
        let message = H256::repeat_byte(0x42);
        let signature = sign(&key, &message).unwrap();
        assert!(signature.v() <= 1);

        let public = recover(&signature, &message).unwrap();
        assert_eq!(public_to_address(&public), key.address());
    }

    #[test]
    fn signing_is_deterministic() {
        let key = K256PrivateKey::random();
        let message = H256::repeat_byte(7);
        assert_eq!(sign(&key, &message).unwrap(), sign(&key, &message).unwrap());
    }

    #[test]
    fn zero_key_is_rejected() {
        assert!(K256PrivateKey::from_bytes(H256::zero()).is_err());
        assert!("0x1234".parse::<K256PrivateKey>().is_err());
    }

    #[test]
    fn debug_output_does_not_leak_key() {
        let key: K256PrivateKey = DEV_KEY.parse().unwrap();
        let debug = format!("{key:?}");
        assert!(!debug.contains("ac0974bec39a17e3"));
    }
}
