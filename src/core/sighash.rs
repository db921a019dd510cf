// Legacy signature-hash preimage (SIGHASH_ALL only)

use crate::core::{hash256, CodecError, Hash256, Result, Script, Serializable, Transaction};

pub const SIGHASH_ALL: u32 = 0x01;
pub const SIGHASH_NONE: u32 = 0x02;
pub const SIGHASH_SINGLE: u32 = 0x03;
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;

/// Sighash flag carried in the last byte of a signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SighashType {
    All,
    None,
    Single,
    AllAnyoneCanPay,
    NoneAnyoneCanPay,
    SingleAnyoneCanPay,
}

impl SighashType {
    pub fn from_u32(flag: u32) -> Option<Self> {
        match flag {
            SIGHASH_ALL => Some(SighashType::All),
            SIGHASH_NONE => Some(SighashType::None),
            SIGHASH_SINGLE => Some(SighashType::Single),
            0x81 => Some(SighashType::AllAnyoneCanPay),
            0x82 => Some(SighashType::NoneAnyoneCanPay),
            0x83 => Some(SighashType::SingleAnyoneCanPay),
            _ => None,
        }
    }

    pub fn to_u32(self) -> u32 {
        match self {
            SighashType::All => SIGHASH_ALL,
            SighashType::None => SIGHASH_NONE,
            SighashType::Single => SIGHASH_SINGLE,
            SighashType::AllAnyoneCanPay => SIGHASH_ALL | SIGHASH_ANYONECANPAY,
            SighashType::NoneAnyoneCanPay => SIGHASH_NONE | SIGHASH_ANYONECANPAY,
            SighashType::SingleAnyoneCanPay => SIGHASH_SINGLE | SIGHASH_ANYONECANPAY,
        }
    }

    /// Byte appended to a DER signature
    pub fn to_byte(self) -> u8 {
        self.to_u32() as u8
    }
}

/// Bytes that are double-SHA256 hashed and signed for `input_index`.
///
/// `subscript` is the locking script of the output being spent. `tx` is not
/// modified. Flags other than `SIGHASH_ALL` fail with `UnsupportedSighash`.
pub fn sig_hash_preimage(
    tx: &Transaction,
    input_index: usize,
    flag: u32,
    subscript: &Script,
) -> Result<Vec<u8>> {
    if flag != SIGHASH_ALL {
        return Err(CodecError::UnsupportedSighash(flag));
    }

    // Validate before copying
    let count = tx.inputs().len();
    if input_index >= count {
        return Err(CodecError::InvalidInputIndex { index: input_index, count });
    }

    let mut scratch = tx.to_standard();
    scratch.inputs.empty_scripts();
    scratch.inputs.set_script(input_index, subscript.clone())?;

    let mut preimage = Vec::with_capacity(scratch.byte_len() + 4);
    scratch.write_to(&mut preimage);
    preimage.extend_from_slice(&flag.to_le_bytes());

    log::trace!(
        "sighash preimage for input {}/{} flag {:#04x}: {} bytes",
        input_index,
        count,
        flag,
        preimage.len()
    );
    Ok(preimage)
}

/// Double SHA256 of the preimage; the 32-byte message an ECDSA signer signs
pub fn signature_hash(
    tx: &Transaction,
    input_index: usize,
    flag: u32,
    subscript: &Script,
) -> Result<Hash256> {
    let preimage = sig_hash_preimage(tx, input_index, flag, subscript)?;
    Ok(hash256(&preimage))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TX_HEX: &str = "01000000017967a5185e907a25225574544c31f7b059c1a191d65b53dcc1554d339c4f9efc010000006a47304402206a2eb16b7b92051d0fa38c133e67684ed064effada1d7f925c842da401d4f22702201f196b10e6e4b4a9fff948e5c5d71ec5da53e90529c8dbd122bff2b1d21dc8a90121039b7bcd0824b9a9164f7ba098408e63e5b7e3cf90835cceb19868f54f8961a825ffffffff014baf2100000000001976a914db4d1141d0048b1ed15839d0b7a4c488cd368b0e88ac00000000";
    // P2PKH of the spending key, i.e. the output this transaction spends
    const SUBSCRIPT_HEX: &str = "76a914824d8a679134215d6d21d25bde3cc63f89ec92eb88ac";
    const PREIMAGE_HEX: &str = "01000000017967a5185e907a25225574544c31f7b059c1a191d65b53dcc1554d339c4f9efc010000001976a914824d8a679134215d6d21d25bde3cc63f89ec92eb88acffffffff014baf2100000000001976a914db4d1141d0048b1ed15839d0b7a4c488cd368b0e88ac0000000001000000";
    const MESSAGE_HEX: &str = "35e5116551a18213cbc567354659b90d14cb6fb2d2edc49ad30bd6a693fc50e0";

    #[test]
    fn test_preimage_vector() {
        let tx = Transaction::from_hex(TX_HEX).unwrap();
        let subscript = Script::from_hex(SUBSCRIPT_HEX).unwrap();

        let preimage = sig_hash_preimage(&tx, 0, SIGHASH_ALL, &subscript).unwrap();
        assert_eq!(hex::encode(&preimage), PREIMAGE_HEX);

        let message = signature_hash(&tx, 0, SIGHASH_ALL, &subscript).unwrap();
        assert_eq!(message.to_internal_hex(), MESSAGE_HEX);
    }

    #[test]
    fn test_preimage_is_repeatable_and_leaves_tx_alone() {
        let tx = Transaction::from_hex(TX_HEX).unwrap();
        let subscript = Script::from_hex(SUBSCRIPT_HEX).unwrap();

        let first = sig_hash_preimage(&tx, 0, SIGHASH_ALL, &subscript).unwrap();
        let second = sig_hash_preimage(&tx, 0, SIGHASH_ALL, &subscript).unwrap();
        assert_eq!(first, second);
        assert_eq!(tx.to_hex(), TX_HEX);
    }

    #[test]
    fn test_other_inputs_are_blanked() {
        let mut tx = Transaction::from_hex(TX_HEX).unwrap();
        let mut second = tx.inputs().as_slice()[0].clone();
        second.prev_index = 0;
        tx.add_input(second);

        let subscript = Script::from_hex(SUBSCRIPT_HEX).unwrap();
        let preimage = sig_hash_preimage(&tx, 1, SIGHASH_ALL, &subscript).unwrap();
        let body = Transaction::deserialize(&preimage[..preimage.len() - 4]).unwrap();

        assert!(body.inputs().as_slice()[0].script_sig.is_empty());
        assert_eq!(body.inputs().as_slice()[1].script_sig, subscript);
    }

    #[test]
    fn test_segwit_preimage_has_no_witness_section() {
        let hex = "02000000000101e32158dccb5b1573e133ff86be1b05fccf0590febf2ae01fa310820995e6b4c10000000000fdffffff0150c3000000000000160014db4d1141d0048b1ed15839d0b7a4c488cd368b0e02473044022011223344556677889900aabbccddeeff11223344556677889900aabbccddeeff02207766554433221100ffeeddccbbaa99887766554433221100ffeeddccbbaa99880121039b7bcd0824b9a9164f7ba098408e63e5b7e3cf90835cceb19868f54f8961a82500000000";
        let tx = Transaction::from_hex(hex).unwrap();
        let preimage = sig_hash_preimage(&tx, 0, SIGHASH_ALL, &Script::new()).unwrap();

        let expected = format!("{}01000000", tx.to_standard().to_hex());
        assert_eq!(hex::encode(preimage), expected);
    }

    #[test]
    fn test_input_index_out_of_range() {
        let tx = Transaction::from_hex(TX_HEX).unwrap();
        assert_eq!(
            sig_hash_preimage(&tx, 1, SIGHASH_ALL, &Script::new()),
            Err(CodecError::InvalidInputIndex { index: 1, count: 1 })
        );
    }

    #[test]
    fn test_unsupported_flags() {
        let tx = Transaction::from_hex(TX_HEX).unwrap();
        for flag in [SIGHASH_NONE, SIGHASH_SINGLE, 0x81, 0x00] {
            assert_eq!(
                sig_hash_preimage(&tx, 0, flag, &Script::new()),
                Err(CodecError::UnsupportedSighash(flag))
            );
        }
    }

    #[test]
    fn test_sighash_type_codes() {
        assert_eq!(SighashType::from_u32(0x01), Some(SighashType::All));
        assert_eq!(SighashType::from_u32(0x83), Some(SighashType::SingleAnyoneCanPay));
        assert_eq!(SighashType::from_u32(0x04), None);
        assert_eq!(SighashType::AllAnyoneCanPay.to_u32(), 0x81);
        assert_eq!(SighashType::All.to_byte(), 0x01);
    }
}
