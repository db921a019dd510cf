// CLI commands

use crate::core::{
    merkle_path, merkle_root, sig_hash_preimage, BlockHeader, Hash256, Script, Serializable,
    Transaction,
};
use crate::wallet::Address;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "bitcoin-wire")]
#[command(about = "Decode, hash and check Bitcoin wire structures", long_about = None)]
pub struct Cli {
    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Transaction commands
    #[command(subcommand)]
    Tx(TxCommands),

    /// Script commands
    #[command(subcommand)]
    Script(ScriptCommands),

    /// Block header commands
    #[command(subcommand)]
    Header(HeaderCommands),

    /// Merkle tree commands
    #[command(subcommand)]
    Merkle(MerkleCommands),

    /// Address commands
    #[command(subcommand)]
    Address(AddressCommands),
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// Decode a raw transaction
    Decode {
        /// Transaction hex
        hex: String,
    },

    /// Print the txid and wtxid
    Id {
        /// Transaction hex
        hex: String,
    },

    /// Print the legacy signature-hash preimage and digest of one input
    Sighash {
        /// Transaction hex
        hex: String,
        /// Input index
        index: usize,
        /// Locking script of the spent output, hex
        subscript: String,
        /// Sighash flag (decimal or 0x-prefixed hex)
        #[arg(long, default_value = "0x01", value_parser = parse_u32)]
        flag: u32,
    },
}

#[derive(Subcommand)]
pub enum ScriptCommands {
    /// Disassemble a raw script
    Disasm {
        /// Script hex (no length prefix)
        hex: String,
    },

    /// Assemble script text into hex
    FromAsm {
        /// Assembly tokens, e.g. OP_DUP OP_HASH160 <hex> OP_EQUALVERIFY OP_CHECKSIG
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        asm: Vec<String>,
    },

    /// HASH160 of a script and its P2SH locking script
    Hash {
        /// Script hex (no length prefix)
        hex: String,
    },
}

#[derive(Subcommand)]
pub enum HeaderCommands {
    /// Decode an 80-byte block header
    Decode {
        /// Header hex
        hex: String,
    },

    /// Check proof of work, and optionally the link to a predecessor
    Verify {
        /// Header hex
        hex: String,
        /// Predecessor header hex
        #[arg(long)]
        prev: Option<String>,
        /// Median time past; defaults to the predecessor's timestamp
        #[arg(long)]
        mtp: Option<u32>,
    },
}

#[derive(Subcommand)]
pub enum MerkleCommands {
    /// Merkle root of transaction ids (display hex)
    Root {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Inclusion path for the id at `index`
    Path {
        index: usize,
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum AddressCommands {
    /// Locking script for a Base58Check address
    Script {
        address: String,
    },
}

fn parse_u32(s: &str) -> Result<u32, String> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex_digits) => u32::from_str_radix(hex_digits, 16),
        None => s.parse(),
    }
    .map_err(|e| format!("invalid number {:?}: {}", s, e))
}

/// Result of one command, in both output forms
#[derive(Debug)]
pub struct Output {
    pub text: String,
    pub json: Value,
}

impl Output {
    fn new(text: String, json: Value) -> Self {
        Self { text, json }
    }
}

/// CLI handler
pub struct CliHandler {
    json: bool,
}

impl CliHandler {
    /// Create a new CLI handler
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    /// Handle CLI command and print its output
    pub fn handle(&self, cli: Cli) -> Result<(), String> {
        let (output, ok) = self.run(cli.command)?;

        if self.json {
            let pretty = serde_json::to_string_pretty(&output.json).map_err(|e| e.to_string())?;
            println!("{}", pretty);
        } else {
            println!("{}", output.text);
        }

        if ok { Ok(()) } else { Err("verification failed".to_string()) }
    }

    /// Run a command; the flag is false when a verification check failed
    pub fn run(&self, command: Commands) -> Result<(Output, bool), String> {
        match command {
            Commands::Tx(cmd) => self.handle_tx(cmd).map(|o| (o, true)),
            Commands::Script(cmd) => self.handle_script(cmd).map(|o| (o, true)),
            Commands::Header(cmd) => self.handle_header(cmd),
            Commands::Merkle(cmd) => self.handle_merkle(cmd).map(|o| (o, true)),
            Commands::Address(cmd) => self.handle_address(cmd).map(|o| (o, true)),
        }
    }

    /// Handle transaction commands
    fn handle_tx(&self, cmd: TxCommands) -> Result<Output, String> {
        match cmd {
            TxCommands::Decode { hex } => {
                let tx = Transaction::from_hex(&hex).map_err(|e| e.to_string())?;
                log::info!("decoded {:?} transaction {}", tx.layout(), tx.id());

                let mut text = vec![
                    format!("Transaction {}", tx.id()),
                    format!("  Layout: {:?}", tx.layout()),
                    format!("  Version: {}", tx.version()),
                    format!("  Size: {} bytes", tx.byte_len()),
                    format!("  Inputs ({}):", tx.inputs().len()),
                ];
                for (i, input) in tx.inputs().iter().enumerate() {
                    text.push(format!("    [{}] {}:{}", i, input.prev_tx_hash, input.prev_index));
                    text.push(format!("        scriptSig: {}", input.script_sig));
                    text.push(format!("        sequence: {:#010x}", input.sequence));
                }
                text.push(format!("  Outputs ({}):", tx.outputs().len()));
                for (i, output) in tx.outputs().iter().enumerate() {
                    text.push(format!("    [{}] {} satoshis", i, output.value));
                    text.push(format!("        scriptPubKey: {}", output.script_pubkey));
                }
                for (i, witness) in tx.witnesses().iter().enumerate() {
                    let items: Vec<String> = witness.items().iter().map(hex::encode).collect();
                    text.push(format!("  Witness [{}]: {}", i, items.join(" ")));
                }
                text.push(format!("  Lock time: {}", tx.lock_time()));

                let mut value = serde_json::to_value(&tx).map_err(|e| e.to_string())?;
                value["txid"] = json!(tx.id());
                value["wtxid"] = json!(tx.witness_id());
                value["size"] = json!(tx.byte_len());
                Ok(Output::new(text.join("\n"), value))
            }
            TxCommands::Id { hex } => {
                let tx = Transaction::from_hex(&hex).map_err(|e| e.to_string())?;
                let (txid, wtxid) = (tx.id(), tx.witness_id());
                Ok(Output::new(
                    format!("txid:  {}\nwtxid: {}", txid, wtxid),
                    json!({ "txid": txid, "wtxid": wtxid }),
                ))
            }
            TxCommands::Sighash { hex, index, subscript, flag } => {
                let tx = Transaction::from_hex(&hex).map_err(|e| e.to_string())?;
                let subscript = Script::from_hex(&subscript).map_err(|e| e.to_string())?;
                let preimage = sig_hash_preimage(&tx, index, flag, &subscript).map_err(|e| e.to_string())?;
                let digest = crate::core::hash256(&preimage);
                log::info!("sighash for input {} of {}", index, tx.id());

                Ok(Output::new(
                    format!(
                        "preimage: {}\ndigest:   {}",
                        hex::encode(&preimage),
                        digest.to_internal_hex()
                    ),
                    json!({
                        "input": index,
                        "flag": flag,
                        "preimage": hex::encode(&preimage),
                        "digest": digest.to_internal_hex(),
                    }),
                ))
            }
        }
    }

    /// Handle script commands
    fn handle_script(&self, cmd: ScriptCommands) -> Result<Output, String> {
        match cmd {
            ScriptCommands::Disasm { hex } => {
                let script = Script::from_hex(&hex).map_err(|e| e.to_string())?;
                let ops: Vec<String> = script.disassemble().iter().map(|op| op.to_string()).collect();
                Ok(Output::new(ops.join("\n"), json!({ "asm": script.to_asm(), "ops": ops })))
            }
            ScriptCommands::FromAsm { asm } => {
                let script = Script::from_asm(&asm.join(" ")).map_err(|e| e.to_string())?;
                Ok(Output::new(script.to_hex(), json!({ "hex": script.to_hex() })))
            }
            ScriptCommands::Hash { hex } => {
                let script = Script::from_hex(&hex).map_err(|e| e.to_string())?;
                let hash = hex::encode(script.script_hash());
                let p2sh = script.to_p2sh_script_pubkey();
                Ok(Output::new(
                    format!("hash160: {}\np2sh:    {}", hash, p2sh.to_hex()),
                    json!({ "hash160": hash, "p2sh_script_pubkey": p2sh.to_hex() }),
                ))
            }
        }
    }

    /// Handle block header commands
    fn handle_header(&self, cmd: HeaderCommands) -> Result<(Output, bool), String> {
        match cmd {
            HeaderCommands::Decode { hex } => {
                let header = BlockHeader::from_hex(&hex).map_err(|e| e.to_string())?;
                let target = header
                    .target()
                    .to_be_bytes()
                    .map(hex::encode)
                    .unwrap_or_else(|| "out of range".to_string());

                let text = [
                    format!("Block {}", header.id()),
                    format!("  Version: {}", header.version),
                    format!("  Previous: {}", header.prev_block_hash),
                    format!("  Merkle root: {}", header.merkle_root),
                    format!("  Timestamp: {}", header.timestamp),
                    format!("  Bits: {:#010x}", header.bits),
                    format!("  Target: {}", target),
                    format!("  Nonce: {}", header.nonce),
                ]
                .join("\n");

                let mut value = serde_json::to_value(&header).map_err(|e| e.to_string())?;
                value["id"] = json!(header.id());
                value["target"] = json!(target);
                Ok((Output::new(text, value), true))
            }
            HeaderCommands::Verify { hex, prev, mtp } => {
                let header = BlockHeader::from_hex(&hex).map_err(|e| e.to_string())?;
                let pow = header.verify_proof_of_work();
                let mut text = vec![format!("proof of work: {}", if pow { "valid" } else { "INVALID" })];
                let mut value = json!({ "id": header.id(), "proof_of_work": pow });
                let mut ok = pow;

                if let Some(prev_hex) = prev {
                    let prev = BlockHeader::from_hex(&prev_hex).map_err(|e| e.to_string())?;
                    let median = mtp.unwrap_or(prev.timestamp);
                    let linked = header.verify_predecessor(&prev, median);
                    text.push(format!(
                        "predecessor: {} (median time past {})",
                        if linked { "valid" } else { "INVALID" },
                        median
                    ));
                    value["predecessor"] = json!(linked);
                    value["median_time_past"] = json!(median);
                    ok &= linked;
                }

                log::info!("verified header {}: {}", header.id(), ok);
                Ok((Output::new(text.join("\n"), value), ok))
            }
        }
    }

    /// Handle merkle commands
    fn handle_merkle(&self, cmd: MerkleCommands) -> Result<Output, String> {
        match cmd {
            MerkleCommands::Root { ids } => {
                let leaves = parse_ids(&ids)?;
                let root = merkle_root(&leaves).ok_or("no transaction ids given")?;
                Ok(Output::new(root.to_string(), json!({ "root": root })))
            }
            MerkleCommands::Path { index, ids } => {
                let leaves = parse_ids(&ids)?;
                let path = merkle_path(&leaves, index)
                    .ok_or_else(|| format!("index {} out of range for {} ids", index, leaves.len()))?;
                let root = path.root_from(&leaves[index]);

                let mut text: Vec<String> = path
                    .steps()
                    .iter()
                    .map(|step| format!("{} {}", if step.orientation { "L" } else { "R" }, step.hash))
                    .collect();
                text.push(format!("root {}", root));
                Ok(Output::new(text.join("\n"), json!({ "path": path, "root": root })))
            }
        }
    }

    /// Handle address commands
    fn handle_address(&self, cmd: AddressCommands) -> Result<Output, String> {
        match cmd {
            AddressCommands::Script { address } => {
                let parsed: Address = address.parse().map_err(|e: crate::core::CodecError| e.to_string())?;
                let script = parsed.script_pubkey();
                let mut value = serde_json::to_value(parsed).map_err(|e| e.to_string())?;
                value["script_pubkey"] = json!(script.to_hex());
                Ok(Output::new(format!("{}\n{}", script.to_hex(), script), value))
            }
        }
    }
}

fn parse_ids(ids: &[String]) -> Result<Vec<Hash256>, String> {
    ids.iter()
        .map(|id| Hash256::from_hex(id).map_err(|e| format!("{}: {}", id, e)))
        .collect()
}
