// Basic types for Bitcoin wire structures

use crate::core::{CodecError, Result};
use serde::{Serialize, Serializer};
use std::fmt;

/// 256-bit double-SHA256 digest (32 bytes)
///
/// Bytes are kept in the order the hash function produced them, which is also
/// the order they take on the wire. The conventional hex form (block explorers,
/// RPC) is the reversed order; `to_hex`/`from_hex` speak that form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// Create a new Hash256 from a byte array
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create a Hash256 from a slice
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        let bytes: [u8; 32] = slice.try_into().map_err(|_| CodecError::InvalidLength {
            expected: 32,
            actual: slice.len(),
        })?;
        Ok(Self(bytes))
    }

    /// Get the hash as a byte slice
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Zero hash (genesis predecessor, coinbase outpoint)
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    /// The same digest with its bytes reversed
    pub fn reversed(&self) -> Self {
        let mut bytes = self.0;
        bytes.reverse();
        Self(bytes)
    }

    /// Convert to hex string (reversed for display, Bitcoin convention)
    pub fn to_hex(&self) -> String {
        hex::encode(self.reversed().0)
    }

    /// Create from hex string (expects reversed byte order)
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        Ok(Self::from_internal_hex(hex_str)?.reversed())
    }

    /// Hex of the bytes exactly as stored and written on the wire
    pub fn to_internal_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse hex that is already in wire order
    pub fn from_internal_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str)?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}
