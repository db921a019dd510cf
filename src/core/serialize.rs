// Serialization utilities for Bitcoin data structures

use crate::core::{CodecError, Hash256, Result};
use std::io::{Cursor, Read};

/// Upper bound on speculative `Vec` preallocation from untrusted counts
pub(crate) const MAX_PREALLOC: usize = 1024;

/// Trait for types with a canonical wire encoding
pub trait Serializable: Sized {
    /// Append the wire encoding to `buf`
    fn write_to(&self, buf: &mut Vec<u8>);

    /// Read one value from the front of `reader`
    fn read_from<R: Read + ?Sized>(reader: &mut R) -> Result<Self>;

    /// Exact size of the wire encoding
    fn byte_len(&self) -> usize;

    fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.byte_len());
        self.write_to(&mut buf);
        buf
    }

    /// Decode a complete value; leftover bytes are an error
    fn deserialize(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        let value = Self::read_from(&mut cursor)?;
        let consumed = cursor.position() as usize;
        if consumed != data.len() {
            return Err(CodecError::TrailingBytes(data.len() - consumed));
        }
        Ok(value)
    }

    fn to_hex(&self) -> String {
        hex::encode(self.serialize())
    }

    fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str.trim())?;
        Self::deserialize(&bytes)
    }
}

/// Encoded width of a VarInt
pub fn varint_size(value: u64) -> usize {
    match value {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x10000..=0xffffffff => 5,
        _ => 9,
    }
}

/// Write a variable-length integer (VarInt)
/// Bitcoin uses a compact format for integers
pub fn write_varint(buf: &mut Vec<u8>, value: u64) {
    match value {
        0..=0xfc => {
            buf.push(value as u8);
        }
        0xfd..=0xffff => {
            buf.push(0xfd);
            buf.extend_from_slice(&(value as u16).to_le_bytes());
        }
        0x10000..=0xffffffff => {
            buf.push(0xfe);
            buf.extend_from_slice(&(value as u32).to_le_bytes());
        }
        _ => {
            buf.push(0xff);
            buf.extend_from_slice(&value.to_le_bytes());
        }
    }
}

/// Read a variable-length integer (VarInt)
///
/// Only the minimal-width form of each value is accepted.
pub fn read_varint<R: Read + ?Sized>(reader: &mut R) -> Result<u64> {
    let first_byte = read_u8(reader, "varint prefix")?;

    let (value, min) = match first_byte {
        0..=0xfc => return Ok(first_byte as u64),
        0xfd => (read_u16(reader, "varint")? as u64, 0xfd),
        0xfe => (read_u32(reader, "varint")? as u64, 0x10000),
        0xff => (read_u64(reader, "varint")?, 0x100000000),
    };

    if value < min {
        return Err(CodecError::MalformedVarInt(value));
    }
    Ok(value)
}

/// Decode a VarInt from the front of a slice, returning the value and the
/// number of bytes consumed
pub fn decode_varint(data: &[u8]) -> Result<(u64, usize)> {
    let mut cursor = Cursor::new(data);
    let value = read_varint(&mut cursor)?;
    Ok((value, cursor.position() as usize))
}

/// Read a VarInt that counts in-memory items
pub(crate) fn read_count<R: Read + ?Sized>(reader: &mut R) -> Result<usize> {
    let count = read_varint(reader)?;
    usize::try_from(count).map_err(|_| CodecError::MalformedVarInt(count))
}

/// Write bytes with length prefix (VarInt length + data)
pub fn write_var_bytes(buf: &mut Vec<u8>, data: &[u8]) {
    write_varint(buf, data.len() as u64);
    buf.extend_from_slice(data);
}

/// Read bytes with length prefix
pub fn read_var_bytes<R: Read + ?Sized>(reader: &mut R, field: &'static str) -> Result<Vec<u8>> {
    let len = read_count(reader)?;
    read_bytes(reader, len, field)
}

/// Read exactly `len` bytes without trusting `len` for the allocation
pub fn read_bytes<R: Read + ?Sized>(reader: &mut R, len: usize, field: &'static str) -> Result<Vec<u8>> {
    let mut data = Vec::with_capacity(len.min(64 * 1024));
    let read = reader
        .take(len as u64)
        .read_to_end(&mut data)
        .map_err(|_| CodecError::TruncatedInput(field))?;
    if read != len {
        return Err(CodecError::TruncatedInput(field));
    }
    Ok(data)
}

fn read_array<R: Read + ?Sized, const N: usize>(reader: &mut R, field: &'static str) -> Result<[u8; N]> {
    let mut bytes = [0u8; N];
    reader
        .read_exact(&mut bytes)
        .map_err(|_| CodecError::TruncatedInput(field))?;
    Ok(bytes)
}

pub fn read_u8<R: Read + ?Sized>(reader: &mut R, field: &'static str) -> Result<u8> {
    Ok(read_array::<R, 1>(reader, field)?[0])
}

pub fn read_u16<R: Read + ?Sized>(reader: &mut R, field: &'static str) -> Result<u16> {
    Ok(u16::from_le_bytes(read_array(reader, field)?))
}

pub fn read_u32<R: Read + ?Sized>(reader: &mut R, field: &'static str) -> Result<u32> {
    Ok(u32::from_le_bytes(read_array(reader, field)?))
}

pub fn read_u64<R: Read + ?Sized>(reader: &mut R, field: &'static str) -> Result<u64> {
    Ok(u64::from_le_bytes(read_array(reader, field)?))
}

/// Read a 32-byte digest in wire order
pub fn read_hash<R: Read + ?Sized>(reader: &mut R, field: &'static str) -> Result<Hash256> {
    Ok(Hash256::new(read_array(reader, field)?))
}
