use std::{any::Any, fmt, sync::Arc};

use zksync_aa_crypto::K256PrivateKey;

use crate::SignerError;

/// Secret material of an account. What it holds is only meaningful to the account's signer.
#[derive(Clone)]
pub enum Secret {
    PrivateKey(K256PrivateKey),
    /// Ordered keys of a multisig account.
    PrivateKeys(Vec<K256PrivateKey>),
    /// Anything else, e.g. a handle to a hardware wallet.
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl fmt::Debug for Secret {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrivateKey(key) => formatter.debug_tuple("PrivateKey").field(key).finish(),
            Self::PrivateKeys(keys) => formatter.debug_tuple("PrivateKeys").field(keys).finish(),
            Self::Opaque(_) => formatter.write_str("Opaque(..)"),
        }
    }
}

impl From<K256PrivateKey> for Secret {
    fn from(key: K256PrivateKey) -> Self {
        Self::PrivateKey(key)
    }
}

impl From<Vec<K256PrivateKey>> for Secret {
    fn from(keys: Vec<K256PrivateKey>) -> Self {
        Self::PrivateKeys(keys)
    }
}

impl Secret {
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Self::Opaque(Arc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Opaque(value) => value.downcast_ref(),
            _ => None,
        }
    }

    pub fn private_key(&self) -> Result<&K256PrivateKey, SignerError> {
        match self {
            Self::PrivateKey(key) => Ok(key),
            other => Err(SignerError::InvalidSecret(format!(
                "expected a single private key, got {other:?}"
            ))),
        }
    }

    /// Returns a non-empty sequence of keys.
    pub fn private_keys(&self) -> Result<&[K256PrivateKey], SignerError> {
        match self {
            Self::PrivateKeys(keys) if !keys.is_empty() => Ok(keys),
            Self::PrivateKeys(_) => Err(SignerError::InvalidSecret(
                "multisig secret holds no keys".into(),
            )),
            other => Err(SignerError::InvalidSecret(format!(
                "expected a sequence of private keys, got {other:?}"
            ))),
        }
    }
}
