use web3::types::{Address, H160};

pub const LEGACY_TX_TYPE: u8 = 0;
pub const EIP_2930_TX_TYPE: u8 = 0x01;
pub const EIP_1559_TX_TYPE: u8 = 0x02;
pub const EIP_712_TX_TYPE: u8 = 0x71;

/// Gas limit per published byte used when a transaction doesn't specify its own.
pub const DEFAULT_L2_TX_GAS_PER_PUBDATA_BYTE: u64 = 50_000;

/// Pseudo-address of the base token (ETH) in balance and intent APIs.
pub const ETHEREUM_ADDRESS: Address = H160([0; 20]);

pub const NONCE_HOLDER_ADDRESS: Address = H160([
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x80, 0x03,
]);

pub const L2_BASE_TOKEN_ADDRESS: Address = H160([
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x80, 0x0a,
]);
