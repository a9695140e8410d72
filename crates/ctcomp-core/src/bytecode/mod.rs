//! Bytecode helpers: instruction set, chunk structure, disassembler.

/// Opcodes, constant pool, line table and chunk.
pub mod chunk;
/// Human readable listings.
pub mod disasm;

pub use chunk::{Chunk, ChunkError, ConstPool, LineTable, OpCode, MAX_CONSTANTS};
pub use disasm::{disassemble_chunk, disassemble_instruction};
