//! Core bytecode structures: opcodes, constant pool, line table, chunk.

use core::{fmt, ops::Range, slice};

use crate::value::Value;

/// Hard limit of the constant pool: indices are encoded on one operand byte.
pub const MAX_CONSTANTS: usize = u8::MAX as usize + 1;

/* ─────────────────────────── Opcodes ─────────────────────────── */

/// VM instruction set. Discriminants are the encoded byte and are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// Pop the last value and end the chunk with it.
    Return = 0,
    /// Pop one value, push its negation.
    Negate = 1,
    /// Pop `b`, pop `a`, push `a + b`.
    Add = 2,
    /// Pop `b`, pop `a`, push `a - b`.
    Sub = 3,
    /// Pop `b`, pop `a`, push `a * b`.
    Mult = 4,
    /// Pop `b`, pop `a`, push `a / b`.
    Div = 5,
    /// Push `constants[operand]`. Followed by one operand byte.
    LoadConstant = 6,
}

impl OpCode {
    /// Every opcode, in encoding order.
    pub const ALL: [OpCode; 7] = [
        OpCode::Return,
        OpCode::Negate,
        OpCode::Add,
        OpCode::Sub,
        OpCode::Mult,
        OpCode::Div,
        OpCode::LoadConstant,
    ];

    /// Number of operand bytes following the opcode.
    pub const fn operand_len(self) -> usize {
        match self {
            OpCode::LoadConstant => 1,
            _ => 0,
        }
    }

    /// Mnemonic used by the disassembler.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            OpCode::Return => "RETURN",
            OpCode::Negate => "NEGATE",
            OpCode::Add => "ADD",
            OpCode::Sub => "SUB",
            OpCode::Mult => "MULT",
            OpCode::Div => "DIV",
            OpCode::LoadConstant => "LOAD_CONSTANT",
        }
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> Self { op as u8 }
}

impl TryFrom<u8> for OpCode {
    type Error = ChunkError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        OpCode::ALL.get(byte as usize).copied().ok_or(ChunkError::UnknownOpcode(byte))
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.mnemonic()) }
}

/* ─────────────────────────── Erreurs ─────────────────────────── */

/// Errors raised while building or decoding a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkError {
    /// The constant pool already holds [`MAX_CONSTANTS`] entries.
    TooManyConstants,
    /// Byte does not encode any [`OpCode`].
    UnknownOpcode(u8),
}

impl fmt::Display for ChunkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkError::TooManyConstants => {
                write!(f, "too many constants in one chunk (max {MAX_CONSTANTS})")
            }
            ChunkError::UnknownOpcode(b) => write!(f, "unknown opcode 0x{b:02X}"),
        }
    }
}

impl std::error::Error for ChunkError {}

/* ─────────────────────────── Constantes ─────────────────────────── */

/// Constant pool with stable 0-based indices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstPool {
    values: Vec<Value>,
}

impl ConstPool {
    /// Create an empty pool.
    pub fn new() -> Self { Self { values: Vec::new() } }

    /// Number of stored constants.
    pub fn len(&self) -> usize { self.values.len() }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    /// Iterate as `(index, value)`.
    pub fn iter(&self) -> ConstIter<'_> { ConstIter { inner: self.values.iter().enumerate() } }

    /// Pushes a value and returns its index, refusing to grow past one byte of index space.
    pub fn add(&mut self, value: Value) -> Result<u8, ChunkError> {
        let idx = u8::try_from(self.values.len()).map_err(|_| ChunkError::TooManyConstants)?;
        self.values.push(value);
        Ok(idx)
    }

    /// Lookup a constant by index.
    pub fn get(&self, idx: u8) -> Option<Value> { self.values.get(idx as usize).copied() }

    /// Remove all constants.
    pub fn clear(&mut self) { self.values.clear(); }
}

/// Iterator returned by [`ConstPool::iter`].
pub struct ConstIter<'a> {
    inner: core::iter::Enumerate<slice::Iter<'a, Value>>,
}

impl Iterator for ConstIter<'_> {
    type Item = (u8, Value);

    fn next(&mut self) -> Option<Self::Item> {
        // the pool never exceeds MAX_CONSTANTS entries, the cast is lossless
        self.inner.next().map(|(idx, value)| (idx as u8, *value))
    }
}

impl<'a> IntoIterator for &'a ConstPool {
    type Item = (u8, Value);
    type IntoIter = ConstIter<'a>;

    fn into_iter(self) -> Self::IntoIter { self.iter() }
}

/* ─────────────────────────── Lignes ─────────────────────────── */

/// Line table (code offset → source line), one entry per code byte.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineTable {
    lines: Vec<u32>,
}

impl LineTable {
    /// Create an empty line table.
    pub fn new() -> Self { Self { lines: Vec::new() } }
    /// Number of stored entries.
    pub fn len(&self) -> usize { self.lines.len() }
    /// True when no byte was recorded.
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }
    /// Source line of the byte at `offset` (0 when out of range).
    pub fn line_at(&self, offset: usize) -> u32 { self.lines.get(offset).copied().unwrap_or_default() }
    /// Iterate over contiguous ranges of the same line number.
    pub fn iter_ranges(&self) -> LineRangeIter<'_> { LineRangeIter { lines: &self.lines, index: 0 } }
    /// Raw per-byte lines.
    pub fn as_slice(&self) -> &[u32] { &self.lines }
    fn push(&mut self, line: u32) { self.lines.push(line); }
    fn clear(&mut self) { self.lines.clear(); }
}

/// Iterator yielding contiguous line ranges `(start..end, line)`.
pub struct LineRangeIter<'a> {
    lines: &'a [u32],
    index: usize,
}

impl Iterator for LineRangeIter<'_> {
    type Item = (Range<usize>, u32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.lines.len() {
            return None;
        }
        let start = self.index;
        let line = self.lines[start];
        self.index += 1;
        while self.index < self.lines.len() && self.lines[self.index] == line {
            self.index += 1;
        }
        Some((start..self.index, line))
    }
}

/* ─────────────────────────── Chunk ─────────────────────────── */

/// Compiled unit: instruction bytes, their source lines and the constant pool.
///
/// `code` and `lines` are only written together, so `code().len() == lines().len()`
/// holds at all times.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chunk {
    code: Vec<u8>,
    lines: LineTable,
    consts: ConstPool,
}

impl Chunk {
    /// Create an empty chunk.
    pub fn new() -> Self { Self::default() }

    /// Append one raw byte (opcode or operand) emitted for source `line`.
    pub fn write(&mut self, byte: u8, line: u32) {
        self.code.push(byte);
        self.lines.push(line);
    }

    /// Append an opcode emitted for source `line`.
    pub fn write_op(&mut self, op: OpCode, line: u32) { self.write(op.into(), line); }

    /// Append a constant and return its index.
    pub fn add_constant(&mut self, value: Value) -> Result<u8, ChunkError> { self.consts.add(value) }

    /// Instruction bytes.
    pub fn code(&self) -> &[u8] { &self.code }

    /// Per-byte line table.
    pub fn lines(&self) -> &LineTable { &self.lines }

    /// Constant pool.
    pub fn constants(&self) -> &ConstPool { &self.consts }

    /// Source line of the byte at `offset`.
    pub fn line_at(&self, offset: usize) -> u32 { self.lines.line_at(offset) }

    /// Number of code bytes.
    pub fn len(&self) -> usize { self.code.len() }

    /// True when nothing was emitted.
    pub fn is_empty(&self) -> bool { self.code.is_empty() }

    /// Drop code, lines and constants, keeping allocations.
    pub fn clear(&mut self) {
        self.code.clear();
        self.lines.clear();
        self.consts.clear();
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */
