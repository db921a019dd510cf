// Proof of Work target handling

use crate::core::Hash256;
use primitive_types::U256;

/// Difficulty target representation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    /// Compact representation (bits field in block header)
    pub bits: u32,
}

impl Target {
    /// Create a new target from bits (compact format)
    pub fn from_bits(bits: u32) -> Self {
        Self { bits }
    }

    pub fn exponent(&self) -> u32 {
        self.bits >> 24
    }

    pub fn mantissa(&self) -> u32 {
        self.bits & 0x00ffffff
    }

    /// Convert compact bits to the full 256-bit target.
    /// Formula: target = mantissa * 256^(exponent - 3)
    ///
    /// `None` when the target does not fit in 256 bits.
    pub fn to_u256(&self) -> Option<U256> {
        let exponent = self.exponent();
        let mantissa = U256::from(self.mantissa());

        if exponent <= 3 {
            return Some(mantissa >> (8 * (3 - exponent) as usize));
        }

        if mantissa.is_zero() {
            return Some(U256::zero());
        }

        let shift = 8 * (exponent - 3) as usize;
        if shift + mantissa.bits() > 256 {
            log::debug!("compact target {:#010x} overflows 256 bits", self.bits);
            return None;
        }
        Some(mantissa << shift)
    }

    /// Check if a block id meets this target (id < target), reading the id
    /// as a big-endian integer in its display order
    pub fn is_met_by(&self, id: &Hash256) -> bool {
        match self.to_u256() {
            Some(target) => hash_to_u256(id) < target,
            None => false,
        }
    }

    /// Expected number of hashes to meet this target: 2^256 / (target + 1)
    pub fn work(&self) -> U256 {
        match self.to_u256() {
            Some(target) if !target.is_zero() => {
                // 2^256 / (t + 1) == (!t / (t + 1)) + 1
                (!target / (target + U256::one())) + U256::one()
            }
            _ => U256::zero(),
        }
    }

    /// Count leading zero bits in target (difficulty indicator)
    pub fn leading_zeros(&self) -> u32 {
        self.to_u256().map_or(0, |target| target.leading_zeros())
    }

    /// Target as 32 big-endian bytes
    pub fn to_be_bytes(&self) -> Option<[u8; 32]> {
        self.to_u256().map(|target| {
            let mut bytes = [0u8; 32];
            target.to_big_endian(&mut bytes);
            bytes
        })
    }
}

/// Digest bytes are little-endian relative to the displayed number
pub fn hash_to_u256(hash: &Hash256) -> U256 {
    U256::from_little_endian(hash.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BlockHeader, Serializable};

    const HEADER_100000: &str = "0100000050120119172a610421a6c3011dd330d9df07b63616c2cc1f1cd00200000000006657a9252aacd5c0b2940996ecff952228c3067cc38d4885efb5a4ac4247e9f337221b4d4c86041b0f2b5710";

    #[test]
    fn test_target_conversion() {
        // Initial mainnet difficulty
        let target = Target::from_bits(0x1d00ffff).to_u256().unwrap();
        assert_eq!(target, U256::from(0xffffu64) << (8 * 26));
    }

    #[test]
    fn test_block_100000_target() {
        let target = Target::from_bits(0x1b04864c).to_u256().unwrap();
        assert_eq!(target, U256::from(0x04864cu64) << (8 * 24));
        assert_eq!(
            hex::encode(Target::from_bits(0x1b04864c).to_be_bytes().unwrap()),
            "000000000004864c000000000000000000000000000000000000000000000000"
        );
    }

    #[test]
    fn test_small_exponents_shift_right() {
        assert_eq!(Target::from_bits(0x03123456).to_u256(), Some(U256::from(0x123456u64)));
        assert_eq!(Target::from_bits(0x02123456).to_u256(), Some(U256::from(0x1234u64)));
        assert_eq!(Target::from_bits(0x01123456).to_u256(), Some(U256::from(0x12u64)));
        assert_eq!(Target::from_bits(0x00123456).to_u256(), Some(U256::zero()));
    }

    #[test]
    fn test_overflowing_target() {
        assert_eq!(Target::from_bits(0x21010000).to_u256(), None);
        assert_eq!(Target::from_bits(0xff123456).to_u256(), None);
        assert!(Target::from_bits(0x20ffffff).to_u256().is_some());
        assert!(!Target::from_bits(0xff123456).is_met_by(&Hash256::zero()));
    }

    #[test]
    fn test_target_validation() {
        let target = Target::from_bits(0x1d00ffff);

        // Zero hash should always be valid (lowest possible)
        assert!(target.is_met_by(&Hash256::zero()));

        // All 0xff hash should be invalid (highest possible)
        assert!(!target.is_met_by(&Hash256::new([0xff; 32])));
    }

    #[test]
    fn test_id_compared_in_display_order() {
        let header = BlockHeader::from_hex(HEADER_100000).unwrap();
        let id = header.id();
        // Leading zeros are at the end of the digest bytes
        assert_eq!(&id.as_bytes()[27..], &[0u8; 5]);
        assert!(header.target().is_met_by(&id));
        assert!(!header.target().is_met_by(&id.reversed()));
    }

    #[test]
    fn test_work() {
        assert_eq!(Target::from_bits(0x1d00ffff).work(), U256::from(0x0100010001u64));
        assert_eq!(Target::from_bits(0x00000000).work(), U256::zero());
    }

    #[test]
    fn test_leading_zeros() {
        assert_eq!(Target::from_bits(0x1d00ffff).leading_zeros(), 32);
    }
}
