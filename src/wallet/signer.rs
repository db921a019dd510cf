// ECDSA signing of transaction inputs

use crate::core::sighash::{signature_hash, SIGHASH_ALL};
use crate::core::{hash160, CodecError, Op, Result, Script, Transaction};
use rand::rngs::OsRng;
use secp256k1::ecdsa::Signature;
use secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};

/// Key pair
#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new key pair
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let mut rng = OsRng;

        let secret_key = SecretKey::new(&mut rng);
        let public_key = secret_key.public_key(&secp);

        Self {
            secret_key,
            public_key,
        }
    }

    /// Create from secret key bytes
    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let secp = Secp256k1::new();
        let secret_key =
            SecretKey::from_slice(bytes).map_err(|e| CodecError::Signing(format!("invalid secret key: {}", e)))?;
        let public_key = secret_key.public_key(&secp);

        Ok(Self {
            secret_key,
            public_key,
        })
    }

    /// Compressed public key bytes
    pub fn pubkey_bytes(&self) -> [u8; 33] {
        self.public_key.serialize()
    }

    pub fn pubkey_hash(&self) -> [u8; 20] {
        hash160(&self.pubkey_bytes())
    }

    /// Locking script this key can spend (P2PKH)
    pub fn script_pubkey(&self) -> Script {
        Script::p2pkh(&self.pubkey_hash())
    }
}

/// Signs and checks legacy inputs
pub struct Signer {
    secp: Secp256k1<All>,
}

impl Signer {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::new(),
        }
    }

    /// Sign `input_index` with SIGHASH_ALL and append `<sig> <pubkey>` to
    /// its scriptSig. `subscript` is the locking script of the spent output.
    /// Returns the DER signature with its sighash byte.
    pub fn sign_input(
        &self,
        tx: &mut Transaction,
        input_index: usize,
        subscript: &Script,
        keypair: &KeyPair,
    ) -> Result<Vec<u8>> {
        let digest = signature_hash(tx, input_index, SIGHASH_ALL, subscript)?;
        let message = Message::from_digest(*digest.as_bytes());

        let signature = self.secp.sign_ecdsa(&message, &keypair.secret_key);
        let mut sig_bytes = signature.serialize_der().to_vec();
        sig_bytes.push(SIGHASH_ALL as u8);

        tx.add_witness(input_index, &sig_bytes, &keypair.pubkey_bytes())?;
        log::debug!("signed input {} with key {}", input_index, hex::encode(keypair.pubkey_hash()));
        Ok(sig_bytes)
    }

    /// Check a DER signature (with trailing sighash byte) over the sighash
    /// message of `input_index`
    pub fn verify_input_signature(
        &self,
        tx: &Transaction,
        input_index: usize,
        subscript: &Script,
        signature: &[u8],
        public_key: &[u8],
    ) -> Result<bool> {
        let (flag, der) = signature
            .split_last()
            .ok_or_else(|| CodecError::Signing("empty signature".to_string()))?;

        let digest = signature_hash(tx, input_index, *flag as u32, subscript)?;
        let message = Message::from_digest(*digest.as_bytes());

        let mut sig =
            Signature::from_der(der).map_err(|e| CodecError::Signing(format!("invalid signature: {}", e)))?;
        sig.normalize_s();
        let key =
            PublicKey::from_slice(public_key).map_err(|e| CodecError::Signing(format!("invalid public key: {}", e)))?;

        Ok(self.secp.verify_ecdsa(&message, &sig, &key).is_ok())
    }

    /// Verify a standard `<sig> <pubkey>` scriptSig spending a P2PKH output
    pub fn verify_p2pkh_input(&self, tx: &Transaction, input_index: usize) -> Result<bool> {
        let input = tx.inputs().get(input_index)?;
        let (signature, public_key) = match input.script_sig.disassemble().as_slice() {
            [Op::Push(sig), Op::Push(pubkey)] => (sig.clone(), pubkey.clone()),
            _ => return Ok(false),
        };

        let subscript = Script::p2pkh(&hash160(&public_key));
        self.verify_input_signature(tx, input_index, &subscript, &signature, &public_key)
    }
}

impl Default for Signer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Hash256, Serializable, TxInput, TxOutput};

    const TX_HEX: &str = "01000000017967a5185e907a25225574544c31f7b059c1a191d65b53dcc1554d339c4f9efc010000006a47304402206a2eb16b7b92051d0fa38c133e67684ed064effada1d7f925c842da401d4f22702201f196b10e6e4b4a9fff948e5c5d71ec5da53e90529c8dbd122bff2b1d21dc8a90121039b7bcd0824b9a9164f7ba098408e63e5b7e3cf90835cceb19868f54f8961a825ffffffff014baf2100000000001976a914db4d1141d0048b1ed15839d0b7a4c488cd368b0e88ac00000000";

    fn unsigned_tx() -> Transaction {
        Transaction::new(
            vec![
                TxInput::new(Hash256::new([1; 32]), 0, Script::new()),
                TxInput::new(Hash256::new([2; 32]), 3, Script::new()),
            ],
            vec![TxOutput::new(1000, Script::p2pkh(&[9; 20]))],
        )
    }

    #[test]
    fn test_keypair_generation() {
        let kp = KeyPair::generate();

        assert_eq!(kp.pubkey_bytes().len(), 33); // Compressed pubkey
        assert_eq!(kp.script_pubkey().len(), 25); // P2PKH script length
    }

    #[test]
    fn test_reference_signature_verifies() {
        let tx = Transaction::from_hex(TX_HEX).unwrap();
        assert!(Signer::new().verify_p2pkh_input(&tx, 0).unwrap());
    }

    #[test]
    fn test_reference_signature_fails_for_wrong_subscript() {
        let tx = Transaction::from_hex(TX_HEX).unwrap();
        let ops = tx.inputs().as_slice()[0].script_sig.disassemble();
        let (sig, pubkey) = match ops.as_slice() {
            [Op::Push(sig), Op::Push(pubkey)] => (sig.clone(), pubkey.clone()),
            other => panic!("unexpected scriptSig {:?}", other),
        };

        // The output script is not the one that was spent
        let wrong = tx.outputs().as_slice()[0].script_pubkey.clone();
        assert!(!Signer::new().verify_input_signature(&tx, 0, &wrong, &sig, &pubkey).unwrap());
    }

    #[test]
    fn test_sign_then_verify_each_input() {
        let signer = Signer::new();
        let keypair = KeyPair::from_secret_bytes(&[7; 32]).unwrap();
        let subscript = keypair.script_pubkey();

        let mut tx = unsigned_tx();
        signer.sign_input(&mut tx, 0, &subscript, &keypair).unwrap();
        signer.sign_input(&mut tx, 1, &subscript, &keypair).unwrap();

        assert!(signer.verify_p2pkh_input(&tx, 0).unwrap());
        assert!(signer.verify_p2pkh_input(&tx, 1).unwrap());

        // Survives a round trip through the wire format
        let reparsed = Transaction::from_hex(&tx.to_hex()).unwrap();
        assert!(signer.verify_p2pkh_input(&reparsed, 1).unwrap());
    }

    #[test]
    fn test_signing_is_deterministic() {
        let signer = Signer::new();
        let keypair = KeyPair::from_secret_bytes(&[7; 32]).unwrap();
        let subscript = keypair.script_pubkey();

        let mut a = unsigned_tx();
        let mut b = unsigned_tx();
        let sig_a = signer.sign_input(&mut a, 0, &subscript, &keypair).unwrap();
        let sig_b = signer.sign_input(&mut b, 0, &subscript, &keypair).unwrap();
        assert_eq!(sig_a, sig_b);
        assert_eq!(sig_a.last(), Some(&0x01));
    }

    #[test]
    fn test_tampered_output_breaks_signature() {
        let signer = Signer::new();
        let keypair = KeyPair::from_secret_bytes(&[7; 32]).unwrap();

        let mut tx = unsigned_tx();
        signer.sign_input(&mut tx, 0, &keypair.script_pubkey(), &keypair).unwrap();
        tx.add_output(TxOutput::new(1, Script::new()));
        assert!(!signer.verify_p2pkh_input(&tx, 0).unwrap());
    }

    #[test]
    fn test_sign_out_of_range() {
        let keypair = KeyPair::from_secret_bytes(&[7; 32]).unwrap();
        let mut tx = unsigned_tx();
        assert_eq!(
            Signer::new()
                .sign_input(&mut tx, 2, &keypair.script_pubkey(), &keypair)
                .unwrap_err(),
            CodecError::InvalidInputIndex { index: 2, count: 2 }
        );
    }

    #[test]
    fn test_invalid_secret_key() {
        assert!(matches!(KeyPair::from_secret_bytes(&[0; 32]), Err(CodecError::Signing(_))));
    }
}
