// Error types for the wire codec

use thiserror::Error;

/// Errors raised while encoding, decoding or building Bitcoin structures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Fewer bytes remained than the field being read requires
    #[error("Truncated input while reading {0}")]
    TruncatedInput(&'static str),

    /// VarInt prefix that does not use the smallest width for its value
    #[error("Malformed VarInt: non-canonical encoding of {0}")]
    MalformedVarInt(u64),

    #[error("Invalid input index {index} (transaction has {count} inputs)")]
    InvalidInputIndex { index: usize, count: usize },

    /// Push data beyond what `OP_PUSHDATA1` can express
    #[error("Push of {0} bytes exceeds the 255-byte minimal push range")]
    PushTooLarge(usize),

    #[error("Checksum mismatch")]
    ChecksumMismatch,

    #[error("Invalid hex string: {0}")]
    InvalidHex(String),

    #[error("Invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("{0} trailing bytes after end of structure")]
    TrailingBytes(usize),

    #[error("Unsupported segwit flag 0x{0:02x}")]
    UnsupportedSegWitFlag(u8),

    #[error("Segwit-layout bytes where a transaction without witnesses was expected")]
    UnexpectedWitness,

    #[error("Witness count {witnesses} does not match input count {inputs}")]
    WitnessCountMismatch { inputs: usize, witnesses: usize },

    #[error("Unsupported sighash flag 0x{0:08x}")]
    UnsupportedSighash(u32),

    #[error("Output value sum overflows u64")]
    ValueOverflow,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Signing failed: {0}")]
    Signing(String),
}

impl From<hex::FromHexError> for CodecError {
    fn from(e: hex::FromHexError) -> Self {
        CodecError::InvalidHex(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
