//! ctcomp-core — primitives shared by the lexer, compiler and VM
//!
//! Provides:
//! - `Pos`, `Span` (byte offsets into a source buffer)
//! - `Value`, the runtime scalar pushed on the VM stack
//! - `bytecode`: `OpCode`, `Chunk` (code + line table + constant pool) and the disassembler

#![deny(missing_docs)]

/* ─────────────────────────── Modules publics ─────────────────────────── */

/// Bytecode primitives (opcodes, chunk, disassembler).
pub mod bytecode;

/// Runtime values.
pub mod value;

pub use bytecode::{Chunk, ChunkError, ConstPool, LineTable, OpCode};
pub use value::Value;

/* ─────────────────────────── Spans / Positions ─────────────────────────── */

/// Byte offset from the start of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Pos(pub u32);

impl Pos {
    /// Start of the source.
    pub const ZERO: Self = Pos(0);
    /// Saturating add.
    pub fn saturating_add(self, v: u32) -> Self { Pos(self.0.saturating_add(v)) }
}

/// Half-open range `[start, end)` in a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Inclusive start.
    pub start: Pos,
    /// Exclusive end.
    pub end: Pos,
}

impl Span {
    /// Builds a span.
    pub const fn new(start: Pos, end: Pos) -> Self { Self { start, end } }
    /// Builds a span from a start offset and a length. Offsets past `u32::MAX` saturate.
    pub fn at(start: usize, len: usize) -> Self {
        let start = u32::try_from(start).unwrap_or(u32::MAX);
        let len = u32::try_from(len).unwrap_or(u32::MAX);
        Self { start: Pos(start), end: Pos(start.saturating_add(len)) }
    }
    /// Length in bytes.
    pub fn len(&self) -> u32 { self.end.0.saturating_sub(self.start.0) }
    /// True when the span covers nothing.
    pub fn is_empty(&self) -> bool { self.start.0 >= self.end.0 }
    /// Byte range, usable to slice the source the span came from.
    pub fn range(&self) -> core::ops::Range<usize> { self.start.0 as usize..self.end.0 as usize }
}

/* ─────────────────────────── Prélude ─────────────────────────── */

/// Convenience re-exports.
pub mod prelude {
    pub use super::{Chunk, ChunkError, OpCode, Pos, Span, Value};
}

/* ─────────────────────────── Tests ─────────────────────────── */
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_len_and_range() {
        let sp = Span::at(3, 4);
        assert_eq!(sp.len(), 4);
        assert_eq!(sp.range(), 3..7);
        assert!(!sp.is_empty());
        assert!(Span::at(5, 0).is_empty());
        assert_eq!(&"let fnx = 1"[Span::at(4, 3).range()], "fnx");
    }

    #[test]
    fn pos_saturates() {
        assert_eq!(Pos(u32::MAX).saturating_add(1), Pos(u32::MAX));
        assert_eq!(Pos::ZERO.saturating_add(2), Pos(2));
    }

    #[test]
    fn span_offsets_saturate_instead_of_wrapping() {
        let past = u64::from(u32::MAX) + 10;
        if let Ok(start) = usize::try_from(past) {
            let sp = Span::at(start, 1);
            assert_eq!((sp.start, sp.end), (Pos(u32::MAX), Pos(u32::MAX)));
            assert_eq!(Span::at(8, start).end, Pos(u32::MAX));
        }
        let sp = Span::at(u32::MAX as usize - 1, 5);
        assert_eq!(sp.end, Pos(u32::MAX));
        assert_eq!(sp.len(), 1);
    }
}
