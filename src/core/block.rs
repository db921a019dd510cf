// Block data structures

use crate::consensus::Target;
use crate::core::merkle::{merkle_path, merkle_root, MerklePath};
use crate::core::serialize::{read_count, read_hash, read_u32, varint_size, write_varint, MAX_PREALLOC};
use crate::core::{hash256, Hash256, Result, Serializable, Transaction};
use std::io::Read;

/// Serialized size of a block header
pub const BLOCK_HEADER_SIZE: usize = 80;

/// Block header - 80 bytes
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct BlockHeader {
    /// Block version
    pub version: u32,
    /// Id of the previous block
    pub prev_block_hash: Hash256,
    /// Merkle root of all transaction ids in the block
    pub merkle_root: Hash256,
    /// Block timestamp (Unix epoch)
    pub timestamp: u32,
    /// Difficulty target (compact format)
    pub bits: u32,
    /// Nonce for proof-of-work
    pub nonce: u32,
}

impl BlockHeader {
    /// Create a new block header
    pub fn new(
        version: u32,
        prev_block_hash: Hash256,
        merkle_root: Hash256,
        timestamp: u32,
        bits: u32,
        nonce: u32,
    ) -> Self {
        Self {
            version,
            prev_block_hash,
            merkle_root,
            timestamp,
            bits,
            nonce,
        }
    }

    /// Block id: double SHA256 of the 80 header bytes
    pub fn id(&self) -> Hash256 {
        hash256(&self.serialize())
    }

    pub fn target(&self) -> Target {
        Target::from_bits(self.bits)
    }

    /// Id, read as a big-endian integer, must be strictly below the target
    /// encoded in `bits`
    pub fn verify_proof_of_work(&self) -> bool {
        let id = self.id();
        let valid = self.target().is_met_by(&id);
        log::debug!("pow check for {} against bits {:#010x}: {}", id, self.bits, valid);
        valid
    }

    /// `prev` is the parent of this header and this header is newer than the
    /// median time of the preceding blocks
    pub fn verify_predecessor(&self, prev: &BlockHeader, median_time_past: u32) -> bool {
        self.prev_block_hash == prev.id() && self.timestamp > median_time_past
    }
}

impl Serializable for BlockHeader {
    fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(self.prev_block_hash.as_bytes());
        buf.extend_from_slice(self.merkle_root.as_bytes());
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        buf.extend_from_slice(&self.bits.to_le_bytes());
        buf.extend_from_slice(&self.nonce.to_le_bytes());
    }

    fn read_from<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            version: read_u32(reader, "header version")?,
            prev_block_hash: read_hash(reader, "header prev block")?,
            merkle_root: read_hash(reader, "header merkle root")?,
            timestamp: read_u32(reader, "header timestamp")?,
            bits: read_u32(reader, "header bits")?,
            nonce: read_u32(reader, "header nonce")?,
        })
    }

    fn byte_len(&self) -> usize {
        BLOCK_HEADER_SIZE
    }
}

/// Block - contains header and transactions
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Block {
    /// Block header
    pub header: BlockHeader,
    /// Transactions in this block
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Create a new block
    pub fn new(header: BlockHeader, transactions: Vec<Transaction>) -> Self {
        Self {
            header,
            transactions,
        }
    }

    /// Get the block id
    pub fn id(&self) -> Hash256 {
        self.header.id()
    }

    pub fn transaction_ids(&self) -> Vec<Hash256> {
        self.transactions.iter().map(Transaction::id).collect()
    }

    /// Merkle root over the transaction ids, `None` for an empty block
    pub fn merkle_root(&self) -> Option<Hash256> {
        merkle_root(&self.transaction_ids())
    }

    /// Inclusion path for the transaction at `index`
    pub fn merkle_path(&self, index: usize) -> Option<MerklePath> {
        merkle_path(&self.transaction_ids(), index)
    }

    /// Header commits to exactly these transactions
    pub fn verify_merkle_root(&self) -> bool {
        self.merkle_root() == Some(self.header.merkle_root)
    }
}

impl Serializable for Block {
    fn write_to(&self, buf: &mut Vec<u8>) {
        self.header.write_to(buf);
        write_varint(buf, self.transactions.len() as u64);
        for tx in &self.transactions {
            tx.write_to(buf);
        }
    }

    fn read_from<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let header = BlockHeader::read_from(reader)?;
        let tx_count = read_count(reader)?;

        let mut transactions = Vec::with_capacity(tx_count.min(MAX_PREALLOC));
        for _ in 0..tx_count {
            transactions.push(Transaction::read_from(reader)?);
        }

        Ok(Self {
            header,
            transactions,
        })
    }

    fn byte_len(&self) -> usize {
        BLOCK_HEADER_SIZE
            + varint_size(self.transactions.len() as u64)
            + self.transactions.iter().map(Transaction::byte_len).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CodecError;

    const HEADER_100000: &str = "0100000050120119172a610421a6c3011dd330d9df07b63616c2cc1f1cd00200000000006657a9252aacd5c0b2940996ecff952228c3067cc38d4885efb5a4ac4247e9f337221b4d4c86041b0f2b5710";
    const HEADER_100001: &str = "0100000006e533fd1ada86391f3f6c343204b0d278d4aaec1c0b20aa27ba0300000000006abbb3eb3d733a9fe18967fd7d4c117e4ccbbac5bec4d910d900b3ae0793e77f54241b4d4c86041b4089cc9b";

    const GENESIS_BLOCK: &str = "0100000000000000000000000000000000000000000000000000000000000000000000003ba3edfd7a7b12b27ac72c3e67768f617fc81bc3888a51323a9fb8aa4b1e5e4a29ab5f49ffff001d1dac2b7c0101000000010000000000000000000000000000000000000000000000000000000000000000ffffffff4d04ffff001d0104455468652054696d65732030332f4a616e2f32303039204368616e63656c6c6f72206f6e206272696e6b206f66207365636f6e64206261696c6f757420666f722062616e6b73ffffffff0100f2052a01000000434104678afdb0fe5548271967f1a67130b7105cd6a828e03909a67962e0ea1f61deb649f6bc3f4cef38c4f35504e51ec112de5c384df7ba0b8d578a4c702b6bf11d5fac00000000";

    #[test]
    fn test_block_header_serialization() {
        let header = BlockHeader::new(
            1,
            Hash256::zero(),
            Hash256::zero(),
            1234567890,
            0x1d00ffff,
            0,
        );

        let serialized = header.serialize();
        assert_eq!(serialized.len(), BLOCK_HEADER_SIZE);

        let deserialized = BlockHeader::deserialize(&serialized).unwrap();
        assert_eq!(header, deserialized);
    }

    #[test]
    fn test_header_100000_fields_and_id() {
        let header = BlockHeader::from_hex(HEADER_100000).unwrap();
        assert_eq!(header.version, 1);
        assert_eq!(header.timestamp, 1293623863);
        assert_eq!(header.bits, 0x1b04864c);
        assert_eq!(
            header.merkle_root.to_hex(),
            "f3e94742aca4b5ef85488dc37c06c3282295ffec960994b2c0d5ac2a25a95766"
        );
        assert_eq!(
            header.id().to_hex(),
            "000000000003ba27aa200b1cecaad478d2b00432346c3f1f3986da1afd33e506"
        );
        assert_eq!(header.to_hex(), HEADER_100000);
    }

    #[test]
    fn test_proof_of_work() {
        let mut header = BlockHeader::from_hex(HEADER_100000).unwrap();
        assert!(header.verify_proof_of_work());

        header.nonce = header.nonce.wrapping_add(1);
        assert!(!header.verify_proof_of_work());
    }

    #[test]
    fn test_predecessor() {
        let parent = BlockHeader::from_hex(HEADER_100000).unwrap();
        let child = BlockHeader::from_hex(HEADER_100001).unwrap();
        assert_eq!(child.prev_block_hash, parent.id());

        assert!(child.verify_predecessor(&parent, parent.timestamp));
        // Not newer than the median time past
        assert!(!child.verify_predecessor(&parent, child.timestamp));
        // Wrong parent
        assert!(!parent.verify_predecessor(&child, 0));
    }

    #[test]
    fn test_truncated_header() {
        let bytes = hex::decode(HEADER_100000).unwrap();
        assert_eq!(
            BlockHeader::deserialize(&bytes[..79]),
            Err(CodecError::TruncatedInput("header nonce"))
        );
    }

    #[test]
    fn test_genesis_block() {
        let block = Block::from_hex(GENESIS_BLOCK).unwrap();
        assert_eq!(block.transactions.len(), 1);
        assert!(block.transactions[0].is_coinbase());
        assert_eq!(
            block.id().to_hex(),
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
        );
        assert_eq!(
            block.transactions[0].id().to_hex(),
            "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b"
        );
        assert!(block.verify_merkle_root());
        assert!(block.header.verify_proof_of_work());
        assert_eq!(block.to_hex(), GENESIS_BLOCK);
        assert_eq!(block.byte_len(), 285);
    }

    #[test]
    fn test_merkle_root_single_tx() {
        let block = Block::from_hex(GENESIS_BLOCK).unwrap();
        assert_eq!(block.merkle_root(), Some(block.transactions[0].id()));
        assert!(block.merkle_path(0).unwrap().is_empty());
        assert_eq!(block.merkle_path(1), None);
    }

    #[test]
    fn test_tampered_transaction_breaks_merkle_commitment() {
        let mut block = Block::from_hex(GENESIS_BLOCK).unwrap();
        block.transactions[0].outputs_mut().push(crate::core::TxOutput::new(1, crate::core::Script::new()));
        assert!(!block.verify_merkle_root());
    }

    #[test]
    fn test_empty_block_has_no_root() {
        let block = Block::new(BlockHeader::from_hex(HEADER_100000).unwrap(), vec![]);
        assert_eq!(block.merkle_root(), None);
        assert!(!block.verify_merkle_root());
    }
}
