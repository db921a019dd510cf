// Bitcoin Script: raw bytes, minimal-push building and disassembly

use crate::core::opcodes::{
    self, MAX_DIRECT_PUSH, OP_0, OP_CHECKSIG, OP_DUP, OP_EQUAL, OP_EQUALVERIFY, OP_HASH160,
    OP_PUSHDATA1, OP_PUSHDATA2, OP_PUSHDATA4,
};
use crate::core::serialize::{read_var_bytes, varint_size, write_var_bytes};
use crate::core::{hash160, CodecError, Result, Serializable};
use std::fmt;
use std::io::Read;

/// Largest push `Script::append` will emit (`OP_PUSHDATA1` range)
pub const MAX_APPEND_PUSH: usize = 0xff;

/// One disassembled script instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Opcodes 0x01..=0x4b: the opcode is the length of the data
    Push(Vec<u8>),
    PushData1(Vec<u8>),
    PushData2(Vec<u8>),
    PushData4(Vec<u8>),
    /// Any other opcode
    Opcode(u8),
    /// A push whose declared length runs past the end of the script.
    /// Disassembly stops here.
    TruncatedPush { opcode: u8, declared: usize, available: usize },
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Op::Push(data) => write!(f, "{}", hex::encode(data)),
            Op::PushData1(data) => write!(f, "OP_PUSHDATA1 {}", operand_hex(data)),
            Op::PushData2(data) => write!(f, "OP_PUSHDATA2 {}", operand_hex(data)),
            Op::PushData4(data) => write!(f, "OP_PUSHDATA4 {}", operand_hex(data)),
            Op::Opcode(op) => match opcodes::opcode_name(*op) {
                Some(name) => f.write_str(name),
                None => write!(f, "OP_UNKNOWN_{:#04x}", op),
            },
            Op::TruncatedPush { opcode, declared, available } => write!(
                f,
                "[push past end: opcode {:#04x} declares {} bytes, {} available]",
                opcode, declared, available
            ),
        }
    }
}

/// Explicit-push operand; an empty one is written `0x` so it stays a token
fn operand_hex(data: &[u8]) -> String {
    if data.is_empty() {
        "0x".to_string()
    } else {
        hex::encode(data)
    }
}

/// Hex token, with or without a `0x` prefix
fn decode_operand(token: &str) -> Result<Vec<u8>> {
    Ok(hex::decode(token.strip_prefix("0x").unwrap_or(token))?)
}

/// A script: the opaque byte sequence carried in inputs and outputs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Script(Vec<u8>);

impl Script {
    /// Empty script
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Script from raw hex (no length prefix)
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        Ok(Self(hex::decode(hex_str.trim())?))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Raw hex (no length prefix)
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append a single opcode byte
    pub fn push_opcode(&mut self, opcode: u8) {
        self.0.push(opcode);
    }

    /// Append `data` as a minimally encoded push.
    ///
    /// Up to 75 bytes use the length as the opcode, up to 255 bytes use
    /// `OP_PUSHDATA1`. Anything larger is rejected; `OP_PUSHDATA2`/`4` are
    /// never emitted here.
    pub fn append(&mut self, data: &[u8]) -> Result<()> {
        match data.len() {
            len if len <= MAX_DIRECT_PUSH => self.0.push(len as u8),
            len if len <= MAX_APPEND_PUSH => {
                self.0.push(OP_PUSHDATA1);
                self.0.push(len as u8);
            }
            len => return Err(CodecError::PushTooLarge(len)),
        }
        self.0.extend_from_slice(data);
        Ok(())
    }

    /// Decode the script into instructions (best effort, never fails)
    pub fn disassemble(&self) -> Vec<Op> {
        let bytes = &self.0;
        let mut ops = Vec::new();
        let mut pos = 0;

        while pos < bytes.len() {
            let opcode = bytes[pos];
            pos += 1;

            let (width, declared) = match opcode {
                op if opcodes::is_direct_push(op) => (0, op as usize),
                OP_PUSHDATA1 => (1, 0),
                OP_PUSHDATA2 => (2, 0),
                OP_PUSHDATA4 => (4, 0),
                op => {
                    ops.push(Op::Opcode(op));
                    continue;
                }
            };

            // Length field of an explicit push
            let declared = if width == 0 {
                declared
            } else {
                if pos + width > bytes.len() {
                    ops.push(Op::TruncatedPush {
                        opcode,
                        declared: width,
                        available: bytes.len() - pos,
                    });
                    break;
                }
                let mut len_bytes = [0u8; 4];
                len_bytes[..width].copy_from_slice(&bytes[pos..pos + width]);
                pos += width;
                u32::from_le_bytes(len_bytes) as usize
            };

            let available = bytes.len() - pos;
            if declared > available {
                ops.push(Op::TruncatedPush { opcode, declared, available });
                break;
            }

            let data = bytes[pos..pos + declared].to_vec();
            pos += declared;
            ops.push(match opcode {
                OP_PUSHDATA1 => Op::PushData1(data),
                OP_PUSHDATA2 => Op::PushData2(data),
                OP_PUSHDATA4 => Op::PushData4(data),
                _ => Op::Push(data),
            });
        }

        ops
    }

    /// Human-readable assembly, one token per instruction
    pub fn to_asm(&self) -> String {
        self.disassemble()
            .iter()
            .map(|op| op.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Parse assembly text.
    ///
    /// Mnemonics (including `OP_UNKNOWN_0x..`) become opcodes and hex tokens
    /// become minimal pushes. An explicit `OP_PUSHDATA1/2/4` takes the
    /// following hex token as its data, `0x` for none. `to_asm` output of a
    /// script without a truncated push parses back to the same bytes.
    pub fn from_asm(asm: &str) -> Result<Self> {
        let mut script = Script::new();
        let mut tokens = asm.split_whitespace();

        while let Some(token) = tokens.next() {
            match opcodes::opcode_from_name(token) {
                Some(op @ (OP_PUSHDATA1 | OP_PUSHDATA2 | OP_PUSHDATA4)) => {
                    let data = decode_operand(tokens.next().unwrap_or_default())?;
                    script.push_explicit(op, &data)?;
                }
                Some(op) => script.push_opcode(op),
                None => match token.strip_prefix("OP_UNKNOWN_0x") {
                    Some(value) => {
                        let op = u8::from_str_radix(value, 16)
                            .map_err(|_| CodecError::InvalidHex(token.to_string()))?;
                        script.push_opcode(op);
                    }
                    None => script.append(&decode_operand(token)?)?,
                },
            }
        }

        Ok(script)
    }

    fn push_explicit(&mut self, opcode: u8, data: &[u8]) -> Result<()> {
        let len = data.len();
        match opcode {
            OP_PUSHDATA1 if len <= 0xff => {
                self.0.push(opcode);
                self.0.push(len as u8);
            }
            OP_PUSHDATA2 if len <= 0xffff => {
                self.0.push(opcode);
                self.0.extend_from_slice(&(len as u16).to_le_bytes());
            }
            OP_PUSHDATA4 if len <= u32::MAX as usize => {
                self.0.push(opcode);
                self.0.extend_from_slice(&(len as u32).to_le_bytes());
            }
            _ => return Err(CodecError::PushTooLarge(len)),
        }
        self.0.extend_from_slice(data);
        Ok(())
    }

    /// HASH160 of the script bytes, as committed to by a P2SH output
    pub fn script_hash(&self) -> [u8; 20] {
        hash160(&self.0)
    }

    /// P2SH locking script paying to this script
    pub fn to_p2sh_script_pubkey(&self) -> Script {
        Script::p2sh(&self.script_hash())
    }

    /// OP_DUP OP_HASH160 <pubKeyHash> OP_EQUALVERIFY OP_CHECKSIG
    pub fn p2pkh(pubkey_hash: &[u8; 20]) -> Self {
        let mut script = Vec::with_capacity(25);
        script.push(OP_DUP);
        script.push(OP_HASH160);
        script.push(20);
        script.extend_from_slice(pubkey_hash);
        script.push(OP_EQUALVERIFY);
        script.push(OP_CHECKSIG);
        Self(script)
    }

    /// OP_HASH160 <scriptHash> OP_EQUAL
    pub fn p2sh(script_hash: &[u8; 20]) -> Self {
        let mut script = Vec::with_capacity(23);
        script.push(OP_HASH160);
        script.push(20);
        script.extend_from_slice(script_hash);
        script.push(OP_EQUAL);
        Self(script)
    }

    /// OP_0 <pubKeyHash>
    pub fn p2wpkh(pubkey_hash: &[u8; 20]) -> Self {
        let mut script = Vec::with_capacity(22);
        script.push(OP_0);
        script.push(20);
        script.extend_from_slice(pubkey_hash);
        Self(script)
    }

    /// <signature> <pubkey>
    pub fn p2pkh_unlock(signature: &[u8], public_key: &[u8]) -> Result<Self> {
        let mut script = Script::new();
        script.append(signature)?;
        script.append(public_key)?;
        Ok(script)
    }

    pub fn is_p2pkh(&self) -> bool {
        let s = &self.0;
        s.len() == 25
            && s[0] == OP_DUP
            && s[1] == OP_HASH160
            && s[2] == 20
            && s[23] == OP_EQUALVERIFY
            && s[24] == OP_CHECKSIG
    }

    pub fn is_p2sh(&self) -> bool {
        let s = &self.0;
        s.len() == 23 && s[0] == OP_HASH160 && s[1] == 20 && s[22] == OP_EQUAL
    }

    pub fn is_p2wpkh(&self) -> bool {
        let s = &self.0;
        s.len() == 22 && s[0] == OP_0 && s[1] == 20
    }
}

impl Serializable for Script {
    fn write_to(&self, buf: &mut Vec<u8>) {
        write_var_bytes(buf, &self.0);
    }

    fn read_from<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        Ok(Self(read_var_bytes(reader, "script")?))
    }

    fn byte_len(&self) -> usize {
        varint_size(self.0.len() as u64) + self.0.len()
    }
}

impl From<Vec<u8>> for Script {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_asm())
    }
}

// Scripts appear in JSON output as raw hex
impl serde::Serialize for Script {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}
