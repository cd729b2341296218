use async_trait::async_trait;
use zksync_aa_crypto::K256PrivateKey;
use zksync_aa_types::{
    Address, EIP712TypedStructure, Eip712Domain, PackedEthSignature, PopulatedTransaction, H256,
};

use crate::{EthereumSigner, SignerError};

/// Signer holding a private key in memory.
#[derive(Debug, Clone)]
pub struct PrivateKeySigner {
    private_key: K256PrivateKey,
}

impl PrivateKeySigner {
    pub fn new(private_key: K256PrivateKey) -> Self {
        Self { private_key }
    }

    pub fn address(&self) -> Address {
        self.private_key.address()
    }

    /// Signs a precomputed digest.
    pub fn sign_hash(&self, digest: &H256) -> Result<PackedEthSignature, SignerError> {
        Ok(PackedEthSignature::sign_raw(&self.private_key, digest)?)
    }
}

#[async_trait]
impl EthereumSigner for PrivateKeySigner {
    async fn sign_typed_data<S: EIP712TypedStructure + Sync>(
        &self,
        domain: &Eip712Domain,
        typed_struct: &S,
    ) -> Result<PackedEthSignature, SignerError> {
        Ok(PackedEthSignature::sign_typed_data(
            &self.private_key,
            domain,
            typed_struct,
        )?)
    }

    /// Custom transactions get the signature as `customSignature`; other types carry it
    /// in the standard `(v, r, s)` fields.
    async fn sign_transaction(&self, tx: &PopulatedTransaction) -> Result<Vec<u8>, SignerError> {
        let message = tx.get_default_signed_message()?;
        let signature = PackedEthSignature::sign_raw(&self.private_key, &message)?;
        let bytes = if tx.is_eip712_tx() {
            let mut tx = tx.clone();
            tx.set_custom_signature(signature.serialize_packed().to_vec());
            tx.serialize(None)?
        } else {
            tx.serialize(Some(&signature))?
        };
        Ok(bytes.0)
    }

    async fn sign_message(&self, message: &[u8]) -> Result<PackedEthSignature, SignerError> {
        Ok(PackedEthSignature::sign_message(&self.private_key, message)?)
    }

    async fn get_address(&self) -> Result<Address, SignerError> {
        Ok(self.address())
    }
}
