use serde::{Deserialize, Serialize};
use web3::{
    signing::keccak256,
    types::{H256, U256},
};

use super::struct_builder::{EncodeBuilder, StructBuilder, TypeBuilder};

/// Structure that can be hashed according to EIP-712.
pub trait EIP712TypedStructure {
    const TYPE_NAME: &'static str;

    fn build_structure<BUILDER: StructBuilder>(&self, builder: &mut BUILDER);

    fn encode_type(&self) -> String {
        let mut builder = TypeBuilder::default();
        self.build_structure(&mut builder);
        builder.encode_type(Self::TYPE_NAME)
    }

    fn type_hash(&self) -> H256 {
        keccak256(self.encode_type().as_bytes()).into()
    }

    fn encode_data(&self) -> Vec<H256> {
        let mut builder = EncodeBuilder::default();
        self.build_structure(&mut builder);
        builder.into_words()
    }

    fn hash_struct(&self) -> H256 {
        let words = self.encode_data();
        let mut bytes = Vec::with_capacity(32 * (words.len() + 1));
        bytes.extend_from_slice(self.type_hash().as_bytes());
        for word in &words {
            bytes.extend_from_slice(word.as_bytes());
        }
        keccak256(&bytes).into()
    }
}

/// Domain of the zkSync typed transaction:
/// `EIP712Domain(string name,string version,uint256 chainId)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip712Domain {
    pub name: String,
    pub version: String,
    pub chain_id: U256,
}

impl Eip712Domain {
    /// Name of the protocol.
    pub const NAME: &'static str = "zkSync";
    /// Version of the protocol. Minor `2.x` releases are not breaking, so `VERSION` only
    /// carries the major version.
    pub const VERSION: &'static str = "2";

    pub fn new(chain_id: u64) -> Self {
        Self {
            name: Self::NAME.to_owned(),
            version: Self::VERSION.to_owned(),
            chain_id: U256::from(chain_id),
        }
    }
}

impl EIP712TypedStructure for Eip712Domain {
    const TYPE_NAME: &'static str = "EIP712Domain";

    fn build_structure<BUILDER: StructBuilder>(&self, builder: &mut BUILDER) {
        builder.add_member("name", &self.name.as_str());
        builder.add_member("version", &self.version.as_str());
        builder.add_member("chainId", &self.chain_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_type_encoding() {
        let domain = Eip712Domain::new(270);
        assert_eq!(
            domain.encode_type(),
            "EIP712Domain(string name,string version,uint256 chainId)"
        );
        assert_eq!(domain.encode_data().len(), 3);
        assert_eq!(domain.encode_data()[2], H256::from_low_u64_be(270));
    }

    #[test]
    fn domain_hash_depends_on_chain_id() {
        assert_ne!(
            Eip712Domain::new(270).hash_struct(),
            Eip712Domain::new(280).hash_struct()
        );
    }
}
