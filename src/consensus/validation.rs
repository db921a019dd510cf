// Header and block checks beyond the wire format

use crate::core::{Block, BlockHeader, CodecError};
use thiserror::Error;

/// Number of preceding timestamps the median time past is taken over
pub const MEDIAN_TIME_SPAN: usize = 11;

/// 21M BTC in satoshis
pub const MAX_MONEY: u64 = 21_000_000 * 100_000_000;

/// Validation error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("block id does not meet the target of bits {bits:#010x}")]
    InvalidProofOfWork { bits: u32 },

    #[error("merkle root does not commit to the block's transactions")]
    InvalidMerkleRoot,

    #[error("block has no transactions")]
    NoTransactions,

    #[error("first transaction is not a coinbase")]
    MissingCoinbase,

    #[error("coinbase transaction at position {0}")]
    CoinbaseNotFirst(usize),

    #[error("header does not build on the given predecessor")]
    PrevBlockMismatch,

    #[error("timestamp {timestamp} is not after median time past {median}")]
    TimestampTooOld { timestamp: u32, median: u32 },

    #[error("invalid version {0}")]
    InvalidVersion(u32),

    #[error("transaction {0} outputs exceed the maximum supply")]
    OutputValueExceedsMax(usize),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Median of the last `MEDIAN_TIME_SPAN` timestamps (oldest first).
/// `None` when no timestamps are given.
pub fn median_time_past(timestamps: &[u32]) -> Option<u32> {
    if timestamps.is_empty() {
        return None;
    }

    let start = timestamps.len().saturating_sub(MEDIAN_TIME_SPAN);
    let mut window = timestamps[start..].to_vec();
    window.sort_unstable();
    Some(window[window.len() / 2])
}

/// Header and block validator
#[derive(Debug, Clone, Default)]
pub struct HeaderValidator {
    /// Accept headers whose id misses their own target
    pub skip_proof_of_work: bool,
}

impl HeaderValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context-free header checks
    pub fn validate_header(&self, header: &BlockHeader) -> Result<(), ValidationError> {
        if header.version < 1 {
            return Err(ValidationError::InvalidVersion(header.version));
        }

        if !self.skip_proof_of_work && !header.verify_proof_of_work() {
            return Err(ValidationError::InvalidProofOfWork { bits: header.bits });
        }

        Ok(())
    }

    /// Check `header` against its predecessor and the timestamps of the
    /// blocks before it (oldest first, ending with `prev`)
    pub fn validate_successor(
        &self,
        header: &BlockHeader,
        prev: &BlockHeader,
        recent_timestamps: &[u32],
    ) -> Result<(), ValidationError> {
        self.validate_header(header)?;

        let median = median_time_past(recent_timestamps).unwrap_or(prev.timestamp);
        if header.verify_predecessor(prev, median) {
            return Ok(());
        }

        if header.prev_block_hash != prev.id() {
            return Err(ValidationError::PrevBlockMismatch);
        }
        Err(ValidationError::TimestampTooOld {
            timestamp: header.timestamp,
            median,
        })
    }

    /// Validate a complete block
    pub fn validate_block(&self, block: &Block) -> Result<(), ValidationError> {
        self.validate_header(&block.header)?;

        // Must have at least one transaction
        let (first, rest) = block
            .transactions
            .split_first()
            .ok_or(ValidationError::NoTransactions)?;

        if !first.is_coinbase() {
            return Err(ValidationError::MissingCoinbase);
        }

        // Only first transaction can be coinbase
        if let Some(pos) = rest.iter().position(|tx| tx.is_coinbase()) {
            return Err(ValidationError::CoinbaseNotFirst(pos + 1));
        }

        if !block.verify_merkle_root() {
            return Err(ValidationError::InvalidMerkleRoot);
        }

        for (i, tx) in block.transactions.iter().enumerate() {
            if tx.total_output_value()? > MAX_MONEY {
                return Err(ValidationError::OutputValueExceedsMax(i));
            }
        }

        log::debug!("block {} valid with {} transactions", block.id(), block.transactions.len());
        Ok(())
    }
}
