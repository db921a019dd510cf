// Transaction data structures

use crate::core::serialize::{
    read_bytes, read_count, read_hash, read_u32, read_u64, read_u8, varint_size, write_var_bytes,
    write_varint, MAX_PREALLOC,
};
use crate::core::{hash256, CodecError, Hash256, Result, Script, Serializable};
use std::io::Read;

/// Sequence number of an input that opts out of lock-time rules
pub const DEFAULT_SEQUENCE: u32 = 0xffffffff;
/// Byte after the version that announces the segwit layout
pub const SEGWIT_MARKER: u8 = 0x00;
pub const SEGWIT_FLAG: u8 = 0x01;

/// Transaction input - references a previous transaction output
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TxInput {
    /// Hash of the previous transaction, in wire order
    pub prev_tx_hash: Hash256,
    /// Index of the output in the previous transaction
    pub prev_index: u32,
    /// Signature script (scriptSig) - proves ownership
    pub script_sig: Script,
    /// Sequence number (used for locktime, usually 0xffffffff)
    pub sequence: u32,
}

impl TxInput {
    /// Create a new transaction input
    pub fn new(prev_tx_hash: Hash256, prev_index: u32, script_sig: Script) -> Self {
        Self {
            prev_tx_hash,
            prev_index,
            script_sig,
            sequence: DEFAULT_SEQUENCE,
        }
    }

    /// Build an input from a txid as shown by explorers (reversed hex) and a
    /// raw hex scriptSig
    pub fn from_display_hex(txid: &str, prev_index: u32, script_sig_hex: &str, sequence: u32) -> Result<Self> {
        Ok(Self {
            prev_tx_hash: Hash256::from_hex(txid)?,
            prev_index,
            script_sig: Script::from_hex(script_sig_hex)?,
            sequence,
        })
    }

    /// Create a coinbase input (for mining rewards)
    pub fn coinbase(script_sig: Script) -> Self {
        Self::new(Hash256::zero(), 0xffffffff, script_sig)
    }

    /// Check if this is a coinbase input
    pub fn is_coinbase(&self) -> bool {
        self.prev_tx_hash == Hash256::zero() && self.prev_index == 0xffffffff
    }
}

impl Serializable for TxInput {
    fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.prev_tx_hash.as_bytes());
        buf.extend_from_slice(&self.prev_index.to_le_bytes());
        self.script_sig.write_to(buf);
        buf.extend_from_slice(&self.sequence.to_le_bytes());
    }

    fn read_from<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let prev_tx_hash = read_hash(reader, "input prev hash")?;
        let prev_index = read_u32(reader, "input prev index")?;
        let script_sig = Script::read_from(reader)?;
        let sequence = read_u32(reader, "input sequence")?;

        Ok(Self {
            prev_tx_hash,
            prev_index,
            script_sig,
            sequence,
        })
    }

    fn byte_len(&self) -> usize {
        32 + 4 + self.script_sig.byte_len() + 4
    }
}

/// Transaction output - specifies amount and recipient
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TxOutput {
    /// Amount in satoshis (1 BTC = 100,000,000 satoshis)
    pub value: u64,
    /// Public key script (scriptPubKey) - specifies conditions for spending
    pub script_pubkey: Script,
}

impl TxOutput {
    /// Create a new transaction output
    pub fn new(value: u64, script_pubkey: Script) -> Self {
        Self {
            value,
            script_pubkey,
        }
    }
}

impl Serializable for TxOutput {
    fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.value.to_le_bytes());
        self.script_pubkey.write_to(buf);
    }

    fn read_from<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let value = read_u64(reader, "output value")?;
        let script_pubkey = Script::read_from(reader)?;
        Ok(Self {
            value,
            script_pubkey,
        })
    }

    fn byte_len(&self) -> usize {
        8 + self.script_pubkey.byte_len()
    }
}

/// Ordered inputs of a transaction.
/// The count prefix is always derived from the length.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
#[serde(transparent)]
pub struct TxInputs(Vec<TxInput>);

impl TxInputs {
    pub fn new(inputs: Vec<TxInput>) -> Self {
        Self(inputs)
    }

    pub(crate) fn push(&mut self, input: TxInput) {
        self.0.push(input);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TxInput> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[TxInput] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Result<&TxInput> {
        let count = self.0.len();
        self.0.get(index).ok_or(CodecError::InvalidInputIndex { index, count })
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut TxInput> {
        let count = self.0.len();
        self.0.get_mut(index).ok_or(CodecError::InvalidInputIndex { index, count })
    }

    /// Blank every input's scriptSig
    pub fn empty_scripts(&mut self) {
        for input in &mut self.0 {
            input.script_sig = Script::new();
        }
    }

    /// Replace one input's scriptSig
    pub fn set_script(&mut self, index: usize, script: Script) -> Result<()> {
        self.get_mut(index)?.script_sig = script;
        Ok(())
    }

    /// Append `<signature> <public_key>` to an input's existing scriptSig
    pub fn add_witness(&mut self, index: usize, signature: &[u8], public_key: &[u8]) -> Result<()> {
        let input = self.get_mut(index)?;
        // Build on a copy so a failed push leaves the input untouched
        let mut script = input.script_sig.clone();
        script.append(signature)?;
        script.append(public_key)?;
        input.script_sig = script;
        Ok(())
    }

    fn read_with_count<R: Read + ?Sized>(reader: &mut R, count: usize) -> Result<Self> {
        let mut inputs = Vec::with_capacity(count.min(MAX_PREALLOC));
        for _ in 0..count {
            inputs.push(TxInput::read_from(reader)?);
        }
        Ok(Self(inputs))
    }
}

impl Serializable for TxInputs {
    fn write_to(&self, buf: &mut Vec<u8>) {
        write_varint(buf, self.0.len() as u64);
        for input in &self.0 {
            input.write_to(buf);
        }
    }

    fn read_from<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let count = read_count(reader)?;
        Self::read_with_count(reader, count)
    }

    fn byte_len(&self) -> usize {
        varint_size(self.0.len() as u64) + self.0.iter().map(TxInput::byte_len).sum::<usize>()
    }
}

impl From<Vec<TxInput>> for TxInputs {
    fn from(inputs: Vec<TxInput>) -> Self {
        Self(inputs)
    }
}

impl<'a> IntoIterator for &'a TxInputs {
    type Item = &'a TxInput;
    type IntoIter = std::slice::Iter<'a, TxInput>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Ordered outputs of a transaction
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
#[serde(transparent)]
pub struct TxOutputs(Vec<TxOutput>);

impl TxOutputs {
    pub fn new(outputs: Vec<TxOutput>) -> Self {
        Self(outputs)
    }

    pub fn push(&mut self, output: TxOutput) {
        self.0.push(output);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TxOutput> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[TxOutput] {
        &self.0
    }

    /// Sum of output values, failing on u64 overflow
    pub fn total_value(&self) -> Result<u64> {
        self.0
            .iter()
            .try_fold(0u64, |sum, out| sum.checked_add(out.value))
            .ok_or(CodecError::ValueOverflow)
    }
}

impl Serializable for TxOutputs {
    fn write_to(&self, buf: &mut Vec<u8>) {
        write_varint(buf, self.0.len() as u64);
        for output in &self.0 {
            output.write_to(buf);
        }
    }

    fn read_from<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let count = read_count(reader)?;
        let mut outputs = Vec::with_capacity(count.min(MAX_PREALLOC));
        for _ in 0..count {
            outputs.push(TxOutput::read_from(reader)?);
        }
        Ok(Self(outputs))
    }

    fn byte_len(&self) -> usize {
        varint_size(self.0.len() as u64) + self.0.iter().map(TxOutput::byte_len).sum::<usize>()
    }
}

impl From<Vec<TxOutput>> for TxOutputs {
    fn from(outputs: Vec<TxOutput>) -> Self {
        Self(outputs)
    }
}

impl<'a> IntoIterator for &'a TxOutputs {
    type Item = &'a TxOutput;
    type IntoIter = std::slice::Iter<'a, TxOutput>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Witness stack of one input
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Witness(Vec<Vec<u8>>);

impl Witness {
    pub fn new(items: Vec<Vec<u8>>) -> Self {
        Self(items)
    }

    /// P2WPKH witness: DER signature with sighash byte, then compressed pubkey
    pub fn p2wpkh(signature: Vec<u8>, public_key: Vec<u8>) -> Self {
        Self(vec![signature, public_key])
    }

    pub fn items(&self) -> &[Vec<u8>] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Signature item of a two-item (P2WPKH) witness
    pub fn signature(&self) -> Option<&[u8]> {
        match self.0.as_slice() {
            [signature, _] => Some(signature.as_slice()),
            _ => None,
        }
    }

    /// Public key item of a two-item (P2WPKH) witness
    pub fn public_key(&self) -> Option<&[u8]> {
        match self.0.as_slice() {
            [_, public_key] => Some(public_key.as_slice()),
            _ => None,
        }
    }
}

impl Serializable for Witness {
    fn write_to(&self, buf: &mut Vec<u8>) {
        write_varint(buf, self.0.len() as u64);
        for item in &self.0 {
            write_var_bytes(buf, item);
        }
    }

    fn read_from<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let count = read_count(reader)?;
        let mut items = Vec::with_capacity(count.min(MAX_PREALLOC));
        for _ in 0..count {
            let len = read_count(reader)?;
            items.push(read_bytes(reader, len, "witness item")?);
        }
        Ok(Self(items))
    }

    fn byte_len(&self) -> usize {
        varint_size(self.0.len() as u64)
            + self
                .0
                .iter()
                .map(|item| varint_size(item.len() as u64) + item.len())
                .sum::<usize>()
    }
}

impl serde::Serialize for Witness {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(hex::encode))
    }
}

/// Wire layout of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TxLayout {
    Standard,
    SegWit,
}

/// What the header of a transaction told the body reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ParseContext {
    version: u32,
    layout: TxLayout,
    input_count: usize,
}

/// Decide the layout from the VarInt following the version.
///
/// A value of zero is the segwit marker: the flag byte and the real input
/// count follow. Any other value is the input count of a standard
/// transaction. This is the only place the two read paths diverge.
fn read_layout<R: Read + ?Sized>(reader: &mut R, version: u32) -> Result<ParseContext> {
    let marker_or_count = read_count(reader)?;

    let ctx = if marker_or_count == SEGWIT_MARKER as usize {
        let flag = read_u8(reader, "segwit flag")?;
        if flag != SEGWIT_FLAG {
            return Err(CodecError::UnsupportedSegWitFlag(flag));
        }
        ParseContext {
            version,
            layout: TxLayout::SegWit,
            input_count: read_count(reader)?,
        }
    } else {
        ParseContext {
            version,
            layout: TxLayout::Standard,
            input_count: marker_or_count,
        }
    };

    log::trace!("tx v{} layout {:?} with {} inputs", ctx.version, ctx.layout, ctx.input_count);
    Ok(ctx)
}

/// Transaction without a witness section
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct StandardTransaction {
    pub version: u32,
    pub inputs: TxInputs,
    pub outputs: TxOutputs,
    /// Lock time (block height or timestamp when tx becomes valid)
    pub lock_time: u32,
}

impl StandardTransaction {
    pub fn new(version: u32, inputs: TxInputs, outputs: TxOutputs, lock_time: u32) -> Self {
        Self {
            version,
            inputs,
            outputs,
            lock_time,
        }
    }

    fn read_body<R: Read + ?Sized>(reader: &mut R, ctx: &ParseContext) -> Result<Self> {
        let inputs = TxInputs::read_with_count(reader, ctx.input_count)?;
        let outputs = TxOutputs::read_from(reader)?;
        let lock_time = read_u32(reader, "lock time")?;
        Ok(Self::new(ctx.version, inputs, outputs, lock_time))
    }
}

/// Transaction with marker, flag and one witness per input.
/// Fields are private so the witness count cannot drift from the input count.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SegWitTransaction {
    version: u32,
    inputs: TxInputs,
    outputs: TxOutputs,
    witnesses: Vec<Witness>,
    lock_time: u32,
}

impl SegWitTransaction {
    pub fn new(
        version: u32,
        inputs: TxInputs,
        outputs: TxOutputs,
        witnesses: Vec<Witness>,
        lock_time: u32,
    ) -> Result<Self> {
        if witnesses.len() != inputs.len() {
            return Err(CodecError::WitnessCountMismatch {
                inputs: inputs.len(),
                witnesses: witnesses.len(),
            });
        }
        Ok(Self {
            version,
            inputs,
            outputs,
            witnesses,
            lock_time,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn inputs(&self) -> &TxInputs {
        &self.inputs
    }

    pub fn outputs(&self) -> &TxOutputs {
        &self.outputs
    }

    pub fn witnesses(&self) -> &[Witness] {
        &self.witnesses
    }

    pub fn lock_time(&self) -> u32 {
        self.lock_time
    }

    pub fn marker(&self) -> u8 {
        SEGWIT_MARKER
    }

    pub fn flag(&self) -> u8 {
        SEGWIT_FLAG
    }

    /// Copy without marker, flag and witnesses
    pub fn stripped(&self) -> StandardTransaction {
        StandardTransaction::new(self.version, self.inputs.clone(), self.outputs.clone(), self.lock_time)
    }

    fn read_body<R: Read + ?Sized>(reader: &mut R, ctx: &ParseContext) -> Result<Self> {
        let inputs = TxInputs::read_with_count(reader, ctx.input_count)?;
        let outputs = TxOutputs::read_from(reader)?;
        // One witness per input; the count is implied, not encoded
        let mut witnesses = Vec::with_capacity(inputs.len());
        for _ in 0..inputs.len() {
            witnesses.push(Witness::read_from(reader)?);
        }
        let lock_time = read_u32(reader, "lock time")?;
        Self::new(ctx.version, inputs, outputs, witnesses, lock_time)
    }

    fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.push(SEGWIT_MARKER);
        buf.push(SEGWIT_FLAG);
        self.inputs.write_to(buf);
        self.outputs.write_to(buf);
        for witness in &self.witnesses {
            witness.write_to(buf);
        }
        buf.extend_from_slice(&self.lock_time.to_le_bytes());
    }

    /// Same bytes `stripped().serialize()` would produce, without the copy
    fn write_stripped(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.version.to_le_bytes());
        self.inputs.write_to(buf);
        self.outputs.write_to(buf);
        buf.extend_from_slice(&self.lock_time.to_le_bytes());
    }

    fn stripped_len(&self) -> usize {
        4 + self.inputs.byte_len() + self.outputs.byte_len() + 4
    }

    fn byte_len(&self) -> usize {
        self.stripped_len() + 2 + self.witnesses.iter().map(Witness::byte_len).sum::<usize>()
    }
}

/// Transaction, in either wire layout
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "layout", rename_all = "lowercase")]
pub enum Transaction {
    Standard(StandardTransaction),
    SegWit(SegWitTransaction),
}

impl Transaction {
    /// Create a new version 1 standard transaction
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        Transaction::Standard(StandardTransaction::new(1, inputs.into(), outputs.into(), 0))
    }

    /// Create a coinbase transaction (mining reward)
    pub fn coinbase(script_sig: Script, output: TxOutput) -> Self {
        Self::new(vec![TxInput::coinbase(script_sig)], vec![output])
    }

    pub fn layout(&self) -> TxLayout {
        match self {
            Transaction::Standard(_) => TxLayout::Standard,
            Transaction::SegWit(_) => TxLayout::SegWit,
        }
    }

    pub fn version(&self) -> u32 {
        match self {
            Transaction::Standard(tx) => tx.version,
            Transaction::SegWit(tx) => tx.version,
        }
    }

    pub fn lock_time(&self) -> u32 {
        match self {
            Transaction::Standard(tx) => tx.lock_time,
            Transaction::SegWit(tx) => tx.lock_time,
        }
    }

    pub fn inputs(&self) -> &TxInputs {
        match self {
            Transaction::Standard(tx) => &tx.inputs,
            Transaction::SegWit(tx) => &tx.inputs,
        }
    }

    // Private: callers add inputs through `add_input` only
    fn inputs_mut(&mut self) -> &mut TxInputs {
        match self {
            Transaction::Standard(tx) => &mut tx.inputs,
            Transaction::SegWit(tx) => &mut tx.inputs,
        }
    }

    pub fn outputs(&self) -> &TxOutputs {
        match self {
            Transaction::Standard(tx) => &tx.outputs,
            Transaction::SegWit(tx) => &tx.outputs,
        }
    }

    pub fn outputs_mut(&mut self) -> &mut TxOutputs {
        match self {
            Transaction::Standard(tx) => &mut tx.outputs,
            Transaction::SegWit(tx) => &mut tx.outputs,
        }
    }

    /// Witness stacks, empty for a standard transaction
    pub fn witnesses(&self) -> &[Witness] {
        match self {
            Transaction::Standard(_) => &[],
            Transaction::SegWit(tx) => &tx.witnesses,
        }
    }

    /// Transaction ID: double SHA256 of the serialization without witness data
    pub fn id(&self) -> Hash256 {
        match self {
            Transaction::Standard(tx) => hash256(&tx.serialize()),
            Transaction::SegWit(tx) => {
                let mut buf = Vec::with_capacity(tx.stripped_len());
                tx.write_stripped(&mut buf);
                hash256(&buf)
            }
        }
    }

    /// Witness transaction ID: double SHA256 of the full serialization.
    /// Equal to `id()` for a standard transaction.
    pub fn witness_id(&self) -> Hash256 {
        hash256(&self.serialize())
    }

    /// Deep copy sharing no buffers with `self`
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Witness-stripped copy in the standard layout
    pub fn to_standard(&self) -> StandardTransaction {
        match self {
            Transaction::Standard(tx) => tx.clone(),
            Transaction::SegWit(tx) => tx.stripped(),
        }
    }

    /// Add an input; a segwit transaction gets an empty witness alongside it
    pub fn add_input(&mut self, input: TxInput) {
        match self {
            Transaction::Standard(tx) => tx.inputs.push(input),
            Transaction::SegWit(tx) => {
                tx.inputs.push(input);
                tx.witnesses.push(Witness::default());
            }
        }
    }

    pub fn add_output(&mut self, output: TxOutput) {
        self.outputs_mut().push(output);
    }

    /// Append `<signature> <public_key>` pushes to the scriptSig of
    /// `input_index`. Call once per input.
    pub fn add_witness(&mut self, input_index: usize, signature: &[u8], public_key: &[u8]) -> Result<()> {
        self.inputs_mut().add_witness(input_index, signature, public_key)
    }

    pub fn set_script_sig(&mut self, input_index: usize, script: Script) -> Result<()> {
        self.inputs_mut().set_script(input_index, script)
    }

    /// Blank every input's scriptSig
    pub fn empty_scripts(&mut self) {
        self.inputs_mut().empty_scripts();
    }

    /// Set the witness stack of one input, switching a standard transaction
    /// to the segwit layout first
    pub fn set_witness(&mut self, input_index: usize, witness: Witness) -> Result<()> {
        let count = self.inputs().len();
        if input_index >= count {
            return Err(CodecError::InvalidInputIndex { index: input_index, count });
        }

        if let Transaction::Standard(tx) = self {
            let upgraded = SegWitTransaction {
                version: tx.version,
                inputs: std::mem::take(&mut tx.inputs),
                outputs: std::mem::take(&mut tx.outputs),
                witnesses: vec![Witness::default(); count],
                lock_time: tx.lock_time,
            };
            *self = Transaction::SegWit(upgraded);
        }

        if let Transaction::SegWit(tx) = self {
            let slot = tx
                .witnesses
                .get_mut(input_index)
                .ok_or(CodecError::InvalidInputIndex { index: input_index, count })?;
            *slot = witness;
        }
        Ok(())
    }

    /// Check if this is a coinbase transaction
    pub fn is_coinbase(&self) -> bool {
        let inputs = self.inputs();
        inputs.len() == 1 && inputs.as_slice()[0].is_coinbase()
    }

    /// Calculate total output value
    pub fn total_output_value(&self) -> Result<u64> {
        self.outputs().total_value()
    }
}

/// Always written without witness data. Reading rejects the segwit layout;
/// use `Transaction` to decode either.
impl Serializable for StandardTransaction {
    fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.version.to_le_bytes());
        self.inputs.write_to(buf);
        self.outputs.write_to(buf);
        buf.extend_from_slice(&self.lock_time.to_le_bytes());
    }

    fn read_from<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let version = read_u32(reader, "version")?;
        let ctx = read_layout(reader, version)?;
        match ctx.layout {
            TxLayout::Standard => Self::read_body(reader, &ctx),
            TxLayout::SegWit => Err(CodecError::UnexpectedWitness),
        }
    }

    fn byte_len(&self) -> usize {
        4 + self.inputs.byte_len() + self.outputs.byte_len() + 4
    }
}

impl Serializable for Transaction {
    fn write_to(&self, buf: &mut Vec<u8>) {
        match self {
            Transaction::Standard(tx) => tx.write_to(buf),
            Transaction::SegWit(tx) => tx.write_to(buf),
        }
    }

    fn read_from<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let version = read_u32(reader, "version")?;
        let ctx = read_layout(reader, version)?;

        match ctx.layout {
            TxLayout::Standard => Ok(Transaction::Standard(StandardTransaction::read_body(reader, &ctx)?)),
            TxLayout::SegWit => Ok(Transaction::SegWit(SegWitTransaction::read_body(reader, &ctx)?)),
        }
    }

    fn byte_len(&self) -> usize {
        match self {
            Transaction::Standard(tx) => tx.byte_len(),
            Transaction::SegWit(tx) => tx.byte_len(),
        }
    }
}
