//! Strategies turning a 32-byte payload into the signature an account validates on-chain.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use futures::future::BoxFuture;
use zksync_aa_crypto::PackedEthSignature;
use zksync_aa_provider::DynProvider;
use zksync_aa_types::H256;

use crate::{Secret, SignerError};

#[async_trait]
pub trait PayloadSigner: 'static + Send + Sync + fmt::Debug {
    async fn sign(
        &self,
        payload: H256,
        secret: &Secret,
        provider: Option<&DynProvider>,
    ) -> Result<Vec<u8>, SignerError>;
}

/// Single-key ECDSA; returns a 65-byte `r || s || v` signature.
#[derive(Debug, Clone, Copy, Default)]
pub struct EcdsaSigner;

#[async_trait]
impl PayloadSigner for EcdsaSigner {
    async fn sign(
        &self,
        payload: H256,
        secret: &Secret,
        _provider: Option<&DynProvider>,
    ) -> Result<Vec<u8>, SignerError> {
        let signature = PackedEthSignature::sign_raw(secret.private_key()?, &payload)?;
        Ok(signature.serialize_packed().to_vec())
    }
}

/// Concatenation of one ECDSA signature per key, in key order (`65 * N` bytes).
#[derive(Debug, Clone, Copy, Default)]
pub struct MultisigEcdsaSigner;

#[async_trait]
impl PayloadSigner for MultisigEcdsaSigner {
    async fn sign(
        &self,
        payload: H256,
        secret: &Secret,
        _provider: Option<&DynProvider>,
    ) -> Result<Vec<u8>, SignerError> {
        let keys = secret.private_keys()?;
        let mut signatures = Vec::with_capacity(PackedEthSignature::LEN * keys.len());
        for key in keys {
            let signature = PackedEthSignature::sign_raw(key, &payload)?;
            signatures.extend_from_slice(&signature.serialize_packed());
        }
        Ok(signatures)
    }
}

/// Future returned by a [`CustomSigner`] function.
pub type SignFuture = BoxFuture<'static, Result<Vec<u8>, SignerError>>;

type SignFn = dyn Fn(H256, Secret, Option<DynProvider>) -> SignFuture + Send + Sync;

/// Signer backed by a caller-supplied function. Its output is passed through unchecked.
#[derive(Clone)]
pub struct CustomSigner {
    inner: Arc<SignFn>,
}

impl fmt::Debug for CustomSigner {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("CustomSigner").finish_non_exhaustive()
    }
}

impl CustomSigner {
    pub fn new<F>(sign_fn: F) -> Self
    where
        F: Fn(H256, Secret, Option<DynProvider>) -> SignFuture + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(sign_fn),
        }
    }
}

#[async_trait]
impl PayloadSigner for CustomSigner {
    async fn sign(
        &self,
        payload: H256,
        secret: &Secret,
        provider: Option<&DynProvider>,
    ) -> Result<Vec<u8>, SignerError> {
        (self.inner)(payload, secret.clone(), provider.cloned()).await
    }
}
