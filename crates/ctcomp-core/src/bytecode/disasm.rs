//! Textual disassembly used by the CLI (`--disasm`) and by VM execution traces.

use core::fmt::Write;

use crate::bytecode::chunk::{Chunk, OpCode};

/// Disassemble a whole chunk under a `== name ==` header.
pub fn disassemble_chunk(chunk: &Chunk, name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {name} ==");
    let mut offset = 0;
    while offset < chunk.len() {
        let (text, next) = disassemble_instruction(chunk, offset);
        let _ = writeln!(out, "{text}");
        offset = next;
    }
    out
}

/// Disassemble the instruction starting at `offset`.
///
/// Returns the rendered line and the offset of the next instruction.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize) -> (String, usize) {
    let mut out = String::new();
    let _ = write!(out, "{offset:04} ");
    let line = chunk.line_at(offset);
    if offset > 0 && line == chunk.line_at(offset - 1) {
        out.push_str("   | ");
    } else {
        let _ = write!(out, "{line:4} ");
    }

    let Some(&byte) = chunk.code().get(offset) else {
        out.push_str("<end of code>");
        return (out, offset);
    };

    match OpCode::try_from(byte) {
        Ok(op @ OpCode::LoadConstant) => match chunk.code().get(offset + 1) {
            Some(&idx) => {
                let shown = chunk
                    .constants()
                    .get(idx)
                    .map_or_else(|| "?".to_string(), |v| v.to_string());
                let _ = write!(out, "{:<16} {idx:4} '{shown}'", op.mnemonic());
                (out, offset + 2)
            }
            None => {
                let _ = write!(out, "{:<16} <missing operand>", op.mnemonic());
                (out, offset + 1)
            }
        },
        Ok(op) => {
            out.push_str(op.mnemonic());
            (out, offset + 1 + op.operand_len())
        }
        Err(_) => {
            let _ = write!(out, "unknown opcode {byte}");
            (out, offset + 1)
        }
    }
}
