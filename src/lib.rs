// Bitcoin wire-format codec: transactions, scripts, sighash, merkle trees
// and block headers

pub mod core;
pub mod consensus;
pub mod wallet;
pub mod cli;

// Re-exports for convenience
pub use crate::core::{
    Block, BlockHeader, CodecError, Hash256, MerklePath, Script, Serializable, Transaction, TxInput,
    TxOutput, Witness,
};
pub use consensus::{HeaderValidator, Target, ValidationError};
pub use wallet::{Address, KeyPair, Signer};
pub use cli::{Cli, CliHandler};
