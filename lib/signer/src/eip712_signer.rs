use zksync_aa_types::{Eip712Domain, PackedEthSignature, PopulatedTransaction};

use crate::{EthereumSigner, SignerError};

/// Signs custom transactions under the domain of a fixed chain.
#[derive(Debug, Clone)]
pub struct Eip712Signer<S> {
    signer: S,
    chain_id: u64,
}

impl<S: EthereumSigner> Eip712Signer<S> {
    pub fn new(signer: S, chain_id: u64) -> Self {
        Self { signer, chain_id }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn domain(&self) -> Eip712Domain {
        Eip712Domain::new(self.chain_id)
    }

    pub async fn sign(&self, tx: &PopulatedTransaction) -> Result<PackedEthSignature, SignerError> {
        self.signer
            .sign_typed_data(&self.domain(), &tx.sign_input()?)
            .await
    }
}

#[cfg(test)]
mod tests {
    use zksync_aa_crypto::K256PrivateKey;
    use zksync_aa_types::{PopulatedTransaction, TransactionType};

    use super::*;
    use crate::PrivateKeySigner;

    #[tokio::test]
    async fn signature_matches_transaction_digest() {
        let signer = PrivateKeySigner::new(K256PrivateKey::random());
        let eip712 = Eip712Signer::new(signer.clone(), 270);
        let tx = PopulatedTransaction {
            transaction_type: TransactionType::Eip712,
            chain_id: Some(270),
            from: Some(signer.address()),
            ..PopulatedTransaction::default()
        };

        let signature = eip712.sign(&tx).await.unwrap();
        let digest = tx.get_signed_digest().unwrap();
        assert_eq!(
            signature.signature_recover_signer(&digest).unwrap(),
            signer.address()
        );
    }
}
