//! Wire encoding of blocks and txs: a 2-byte big endian codec version followed by the
//! borsh encoding of the value.

use borsh::{BorshDeserialize, BorshSerialize};
use thiserror::Error;

pub const CODEC_VERSION: u16 = 0;

const VERSION_LEN: usize = size_of::<u16>();

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("input of {0} bytes is too short to carry a codec version")]
    MissingVersion(usize),

    #[error("unknown codec version {0}")]
    UnknownVersion(u16),

    #[error("malformed payload: {0}")]
    Malformed(#[from] std::io::Error),
}

pub fn encode<T: BorshSerialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
    let mut bytes = Vec::with_capacity(64);
    bytes.extend_from_slice(&CODEC_VERSION.to_be_bytes());
    value.serialize(&mut bytes)?;
    Ok(bytes)
}

/// Decodes a value, failing on unknown versions and on trailing bytes
pub fn decode<T: BorshDeserialize>(bytes: &[u8]) -> Result<T, CodecError> {
    if bytes.len() < VERSION_LEN {
        return Err(CodecError::MissingVersion(bytes.len()));
    }
    let version = u16::from_be_bytes([bytes[0], bytes[1]]);
    if version != CODEC_VERSION {
        return Err(CodecError::UnknownVersion(version));
    }
    Ok(T::try_from_slice(&bytes[VERSION_LEN..])?)
}
