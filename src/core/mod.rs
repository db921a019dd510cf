// Core wire-format data structures

mod error;
mod types;
mod hash;
mod serialize;
pub mod opcodes;
pub mod script;
mod transaction;
pub mod sighash;
pub mod merkle;
mod block;

pub use error::{CodecError, Result};
pub use types::*;
pub use hash::*;
pub use serialize::{
    decode_varint, read_u16, read_u32, read_u64, read_u8, read_var_bytes, read_varint, varint_size,
    write_var_bytes, write_varint, Serializable,
};
pub use script::{Op, Script};
pub use transaction::*;
pub use sighash::{sig_hash_preimage, signature_hash, SighashType};
pub use merkle::{merkle_path, merkle_root, MerklePath, MerkleStep};
pub use block::*;
