use web3::{
    signing::keccak256,
    types::{Address, H256, U256},
};

/// A single member of an EIP-712 structure that knows its Solidity type and encoding.
pub trait StructMember {
    const MEMBER_TYPE: &'static str;

    /// Encodes the member into a single 32-byte word as defined by `encodeData`.
    fn encode_member_data(&self) -> H256;
}

impl StructMember for U256 {
    const MEMBER_TYPE: &'static str = "uint256";

    fn encode_member_data(&self) -> H256 {
        let mut bytes = [0_u8; 32];
        self.to_big_endian(&mut bytes);
        H256(bytes)
    }
}

impl StructMember for H256 {
    const MEMBER_TYPE: &'static str = "bytes32";

    fn encode_member_data(&self) -> H256 {
        *self
    }
}

impl StructMember for Address {
    const MEMBER_TYPE: &'static str = "address";

    fn encode_member_data(&self) -> H256 {
        let mut bytes = [0_u8; 32];
        bytes[12..].copy_from_slice(self.as_bytes());
        H256(bytes)
    }
}

impl StructMember for &[u8] {
    const MEMBER_TYPE: &'static str = "bytes";

    fn encode_member_data(&self) -> H256 {
        keccak256(self).into()
    }
}

impl StructMember for &str {
    const MEMBER_TYPE: &'static str = "string";

    fn encode_member_data(&self) -> H256 {
        keccak256(self.as_bytes()).into()
    }
}

impl StructMember for &[H256] {
    const MEMBER_TYPE: &'static str = "bytes32[]";

    fn encode_member_data(&self) -> H256 {
        let bytes: Vec<u8> = self.iter().flat_map(|hash| hash.0).collect();
        keccak256(&bytes).into()
    }
}

/// Visitor over the members of a structure, in declaration order.
pub trait StructBuilder {
    fn add_member<M: StructMember>(&mut self, name: &str, member: &M);
}

/// Collects the `type name` pairs used by `encodeType`.
#[derive(Debug, Default)]
pub(crate) struct TypeBuilder {
    members: Vec<String>,
}

impl TypeBuilder {
    pub fn encode_type(self, type_name: &str) -> String {
        format!("{type_name}({})", self.members.join(","))
    }
}

impl StructBuilder for TypeBuilder {
    fn add_member<M: StructMember>(&mut self, name: &str, _member: &M) {
        self.members.push(format!("{} {name}", M::MEMBER_TYPE));
    }
}

/// Collects encoded member words used by `encodeData`.
#[derive(Debug, Default)]
pub(crate) struct EncodeBuilder {
    words: Vec<H256>,
}

impl EncodeBuilder {
    pub fn into_words(self) -> Vec<H256> {
        self.words
    }
}

impl StructBuilder for EncodeBuilder {
    fn add_member<M: StructMember>(&mut self, _name: &str, member: &M) {
        self.words.push(member.encode_member_data());
    }
}
