// Base58Check addresses and the locking scripts they stand for

use crate::core::{hash160, CodecError, Result, Script};
use std::fmt;
use std::str::FromStr;

const P2PKH_MAINNET: u8 = 0x00;
const P2SH_MAINNET: u8 = 0x05;
const P2PKH_TESTNET: u8 = 0x6f;
const P2SH_TESTNET: u8 = 0xc4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

/// Legacy address payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(tag = "type", content = "hash", rename_all = "lowercase")]
pub enum Payload {
    P2pkh(#[serde(with = "hex_bytes")] [u8; 20]),
    P2sh(#[serde(with = "hex_bytes")] [u8; 20]),
}

/// Bitcoin address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct Address {
    pub network: Network,
    pub payload: Payload,
}

impl Address {
    /// Create a P2PKH address from a serialized public key
    pub fn p2pkh_from_pubkey(public_key: &[u8], network: Network) -> Self {
        Self {
            network,
            payload: Payload::P2pkh(hash160(public_key)),
        }
    }

    /// Create a P2SH address for a redeem script
    pub fn p2sh_from_script(redeem_script: &Script, network: Network) -> Self {
        Self {
            network,
            payload: Payload::P2sh(redeem_script.script_hash()),
        }
    }

    fn version_byte(&self) -> u8 {
        match (self.network, self.payload) {
            (Network::Mainnet, Payload::P2pkh(_)) => P2PKH_MAINNET,
            (Network::Mainnet, Payload::P2sh(_)) => P2SH_MAINNET,
            (Network::Testnet, Payload::P2pkh(_)) => P2PKH_TESTNET,
            (Network::Testnet, Payload::P2sh(_)) => P2SH_TESTNET,
        }
    }

    pub fn hash(&self) -> &[u8; 20] {
        match &self.payload {
            Payload::P2pkh(hash) | Payload::P2sh(hash) => hash,
        }
    }

    /// Locking script paying to this address
    pub fn script_pubkey(&self) -> Script {
        match &self.payload {
            Payload::P2pkh(hash) => Script::p2pkh(hash),
            Payload::P2sh(hash) => Script::p2sh(hash),
        }
    }
}

impl FromStr for Address {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self> {
        let data = bs58::decode(s).with_check(None).into_vec().map_err(|e| match e {
            bs58::decode::Error::InvalidChecksum { .. } => CodecError::ChecksumMismatch,
            other => CodecError::InvalidAddress(other.to_string()),
        })?;

        let (version, hash) = data
            .split_first()
            .ok_or_else(|| CodecError::InvalidAddress("empty payload".to_string()))?;
        let hash: [u8; 20] = hash.try_into().map_err(|_| CodecError::InvalidLength {
            expected: 20,
            actual: hash.len(),
        })?;

        let (network, payload) = match *version {
            P2PKH_MAINNET => (Network::Mainnet, Payload::P2pkh(hash)),
            P2SH_MAINNET => (Network::Mainnet, Payload::P2sh(hash)),
            P2PKH_TESTNET => (Network::Testnet, Payload::P2pkh(hash)),
            P2SH_TESTNET => (Network::Testnet, Payload::P2sh(hash)),
            other => {
                return Err(CodecError::InvalidAddress(format!("unknown version byte {:#04x}", other)));
            }
        };

        Ok(Self { network, payload })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut data = Vec::with_capacity(21);
        data.push(self.version_byte());
        data.extend_from_slice(self.hash());
        write!(f, "{}", bs58::encode(data).with_check().into_string())
    }
}

/// Decode a Base58Check address into the locking script it pays to
pub fn address_to_script_pubkey(address: &str) -> Result<Script> {
    Ok(address.parse::<Address>()?.script_pubkey())
}

mod hex_bytes {
    pub fn serialize<S: serde::Serializer>(bytes: &[u8; 20], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_p2pkh_mainnet() {
        let script = address_to_script_pubkey("1LzZJkQfz9ahY2SfetBHLcwyWmQRE9CwfU").unwrap();
        assert_eq!(script.to_hex(), "76a914db4d1141d0048b1ed15839d0b7a4c488cd368b0e88ac");
        assert!(script.is_p2pkh());
    }

    #[test]
    fn test_address_from_pubkey() {
        let pubkey = hex::decode("039b7bcd0824b9a9164f7ba098408e63e5b7e3cf90835cceb19868f54f8961a825").unwrap();
        let address = Address::p2pkh_from_pubkey(&pubkey, Network::Mainnet);
        assert_eq!(address.to_string(), "1CsyjZGHctdQ1fnvKMzmga7LYoHNycZXeC");
    }

    #[test]
    fn test_all_version_bytes() {
        let cases = [
            ("3MgaEHu7Y3u5dC96myqsmFJufHh8nztXBA", Network::Mainnet, true),
            ("n1WWboVeoB1xK8vHNT9fAYAJNm18AzcAxU", Network::Testnet, false),
            ("2NDEnJ2q99WQRpymeT7TkPCJAsduJYakhBj", Network::Testnet, true),
        ];
        for (text, network, is_p2sh) in cases {
            let address: Address = text.parse().unwrap();
            assert_eq!(address.network, network);
            assert_eq!(address.script_pubkey().is_p2sh(), is_p2sh);
            assert_eq!(hex::encode(address.hash()), "db4d1141d0048b1ed15839d0b7a4c488cd368b0e");
            assert_eq!(address.to_string(), text);
        }
    }

    #[test]
    fn test_bad_checksum_surfaces_unchanged() {
        assert_eq!(
            address_to_script_pubkey("1LzZJkQfz9ahY2SfetBHLcwyWmQRE9CwfV"),
            Err(CodecError::ChecksumMismatch)
        );
    }

    #[test]
    fn test_invalid_text() {
        assert!(matches!(
            address_to_script_pubkey("0OIl"),
            Err(CodecError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_p2sh_round_trip() {
        let redeem = Script::from_hex("51").unwrap();
        let address = Address::p2sh_from_script(&redeem, Network::Mainnet);
        let parsed: Address = address.to_string().parse().unwrap();
        assert_eq!(parsed, address);
        assert_eq!(parsed.script_pubkey(), redeem.to_p2sh_script_pubkey());
    }
}
