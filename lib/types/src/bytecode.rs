//! Hashing of zkEVM bytecodes passed as factory dependencies.

use sha2::{Digest, Sha256};
use web3::types::H256;

const MAX_BYTECODE_LENGTH_IN_WORDS: usize = (1 << 16) - 1;
const MAX_BYTECODE_LENGTH_BYTES: usize = MAX_BYTECODE_LENGTH_IN_WORDS * 32;

/// Version byte placed at the start of every bytecode hash.
const BYTECODE_HASH_VERSION: u8 = 1;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InvalidBytecodeError {
    #[error("Bytecode too long: {0} bytes, while max {1} allowed")]
    BytecodeTooLong(usize, usize),
    #[error("Bytecode has even number of 32-byte words")]
    BytecodeLengthInWordsIsEven,
    #[error("Bytecode length is not divisible by 32")]
    BytecodeLengthIsNotDivisibleBy32,
}

pub fn validate_bytecode(code: &[u8]) -> Result<(), InvalidBytecodeError> {
    let bytecode_len = code.len();

    if bytecode_len > MAX_BYTECODE_LENGTH_BYTES {
        return Err(InvalidBytecodeError::BytecodeTooLong(
            bytecode_len,
            MAX_BYTECODE_LENGTH_BYTES,
        ));
    }

    if bytecode_len % 32 != 0 {
        return Err(InvalidBytecodeError::BytecodeLengthIsNotDivisibleBy32);
    }

    let bytecode_len_words = bytecode_len / 32;

    if bytecode_len_words % 2 == 0 {
        return Err(InvalidBytecodeError::BytecodeLengthInWordsIsEven);
    }

    Ok(())
}

/// Hashes a bytecode the way the chain identifies it: `sha256` with the first four bytes
/// replaced by the version, a zero byte and the big-endian length in words.
pub fn hash_bytecode(code: &[u8]) -> Result<H256, InvalidBytecodeError> {
    validate_bytecode(code)?;

    let digest = Sha256::digest(code);
    let mut output = [0u8; 32];
    output.copy_from_slice(&digest);

    let len_in_words = (code.len() / 32) as u16;
    output[0] = BYTECODE_HASH_VERSION;
    output[1] = 0;
    output[2..4].copy_from_slice(&len_in_words.to_be_bytes());
    Ok(H256(output))
}
