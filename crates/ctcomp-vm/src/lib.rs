//! ctcomp-vm — stack-based bytecode interpreter
//!
//! - `Vm::run` executes one `Chunk` with a fetch/decode/dispatch loop over an explicit,
//!   bounded value stack
//! - `Vm::interpret` is the whole pipeline: compile, then run; callers act on its three
//!   outcomes (value, compile error, runtime error), see [`InterpretResult`]
//! - malformed bytecode (unknown opcode, dangling constant index, missing `RETURN`) is a
//!   runtime error, never a panic
//!
//! ```
//! use ctcomp_vm::{InterpretResult, Vm};
//! use ctcomp_core::Value;
//!
//! let mut vm = Vm::new();
//! let res = vm.interpret("1 + 2 * 3");
//! assert_eq!(InterpretResult::of(&res), InterpretResult::Ok);
//! assert_eq!(res.unwrap(), Value::Number(7.0));
//! ```

#![deny(missing_docs)]

use ctcomp_compiler::{compile_with, CompileError, CompilerOptions};
use ctcomp_core::{Chunk, OpCode, Value};
use thiserror::Error;

#[cfg(feature = "tracing")]
use ctcomp_core::bytecode::disassemble_instruction;

/* ------------------------------ Options ------------------------------ */

/// Default stack capacity, in values.
pub const STACK_MAX: usize = 256;

/// VM options.
#[derive(Debug, Clone)]
pub struct VmOptions {
    /// Maximum number of values on the stack.
    pub stack_capacity: usize,
    /// Log each instruction with the stack before executing it (needs the `tracing` feature).
    pub trace_execution: bool,
    /// Log every token the compiler consumes in [`Vm::interpret`].
    pub trace_tokens: bool,
}

impl Default for VmOptions {
    fn default() -> Self { Self { stack_capacity: STACK_MAX, trace_execution: false, trace_tokens: false } }
}

/* ------------------------------ Erreurs ------------------------------ */

/// Runtime errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    /// An instruction popped from an empty stack.
    #[error("[line {line}] stack underflow at offset {offset}")]
    StackUnderflow {
        /// Offset of the faulting instruction.
        offset: usize,
        /// Source line of the faulting instruction.
        line: u32,
    },

    /// A push went beyond the configured capacity.
    #[error("[line {line}] stack overflow (capacity {capacity})")]
    StackOverflow {
        /// Configured capacity.
        capacity: usize,
        /// Source line of the faulting instruction.
        line: u32,
    },

    /// Byte that encodes no opcode.
    #[error("[line {line}] invalid opcode {byte} at offset {offset}")]
    InvalidOpcode {
        /// Offending byte.
        byte: u8,
        /// Its offset in the code.
        offset: usize,
        /// Source line.
        line: u32,
    },

    /// `LOAD_CONSTANT` operand beyond the constant pool.
    #[error("[line {line}] constant {index} out of range at offset {offset}")]
    MissingConstant {
        /// Requested index.
        index: u8,
        /// Offset of the instruction.
        offset: usize,
        /// Source line.
        line: u32,
    },

    /// Code ended before `RETURN` (or in the middle of an operand).
    #[error("execution ran past the end of code at offset {offset}")]
    UnexpectedEnd {
        /// Offset that could not be read.
        offset: usize,
    },
}

impl VmError {
    /// Source line of the faulting instruction, when known.
    pub const fn line(&self) -> Option<u32> {
        match *self {
            VmError::StackUnderflow { line, .. }
            | VmError::StackOverflow { line, .. }
            | VmError::InvalidOpcode { line, .. }
            | VmError::MissingConstant { line, .. } => Some(line),
            VmError::UnexpectedEnd { .. } => None,
        }
    }
}

/// Failure of the compile-then-run pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterpretError {
    /// The source did not compile; the VM never ran.
    #[error(transparent)]
    Compile(#[from] CompileError),
    /// Execution failed.
    #[error(transparent)]
    Runtime(#[from] VmError),
}

/// Outcome of [`Vm::interpret`], reduced to its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterpretResult {
    /// Compiled and ran to `RETURN`.
    Ok,
    /// Compilation failed.
    CompileError,
    /// Execution failed.
    RuntimeError,
}

impl InterpretResult {
    /// Classifies a pipeline result.
    pub const fn of(result: &Result<Value, InterpretError>) -> Self {
        match result {
            Ok(_) => InterpretResult::Ok,
            Err(InterpretError::Compile(_)) => InterpretResult::CompileError,
            Err(InterpretError::Runtime(_)) => InterpretResult::RuntimeError,
        }
    }

    /// Process exit code for this outcome.
    pub const fn exit_code(self) -> u8 {
        match self {
            InterpretResult::Ok => 0,
            InterpretResult::CompileError => 2,
            InterpretResult::RuntimeError => 3,
        }
    }
}

/* ------------------------------ VM ------------------------------ */

/// Stack VM. Owns its stack and instruction cursor; chunks are borrowed per run.
#[derive(Debug, Clone)]
pub struct Vm {
    stack: Vec<Value>,
    ip: usize,
    options: VmOptions,
}

impl Default for Vm {
    fn default() -> Self { Self::new() }
}

impl Vm {
    /// VM with default options.
    pub fn new() -> Self { Self::with_options(VmOptions::default()) }

    /// VM with explicit options. The stack grows on demand; `push` enforces the capacity.
    pub fn with_options(options: VmOptions) -> Self {
        Self { stack: Vec::with_capacity(options.stack_capacity.min(STACK_MAX)), ip: 0, options }
    }

    /// Current options.
    pub const fn options(&self) -> &VmOptions { &self.options }

    /// Values currently on the stack, bottom first.
    pub fn stack(&self) -> &[Value] { &self.stack }

    /// Empties the stack and rewinds the cursor.
    pub fn reset(&mut self) {
        self.stack.clear();
        self.ip = 0;
    }

    /// Compiles `source` and runs it.
    pub fn interpret(&mut self, source: &str) -> Result<Value, InterpretError> {
        let chunk = compile_with(source, CompilerOptions { trace_tokens: self.options.trace_tokens })?;
        Ok(self.run(&chunk)?)
    }

    /// Executes `chunk` from offset 0 until `RETURN`, starting from an empty stack.
    pub fn run(&mut self, chunk: &Chunk) -> Result<Value, VmError> {
        self.reset();
        loop {
            let offset = self.ip;

            #[cfg(feature = "tracing")]
            if self.options.trace_execution {
                self.trace_instruction(chunk, offset);
            }

            let byte = self.read_byte(chunk)?;
            let line = chunk.line_at(offset);
            let op = OpCode::try_from(byte).map_err(|_| VmError::InvalidOpcode { byte, offset, line })?;

            match op {
                OpCode::LoadConstant => {
                    let index = self.read_byte(chunk)?;
                    let value = chunk
                        .constants()
                        .get(index)
                        .ok_or(VmError::MissingConstant { index, offset, line })?;
                    self.push(value, line)?;
                }
                OpCode::Negate => {
                    let v = self.pop(offset, line)?;
                    self.push(Value::Number(-v.as_number()), line)?;
                }
                OpCode::Add | OpCode::Sub | OpCode::Mult | OpCode::Div => {
                    let b = self.pop(offset, line)?.as_number();
                    let a = self.pop(offset, line)?.as_number();
                    let result = match op {
                        OpCode::Add => a + b,
                        OpCode::Sub => a - b,
                        OpCode::Mult => a * b,
                        _ => a / b,
                    };
                    self.push(Value::Number(result), line)?;
                }
                OpCode::Return => {
                    let result = self.pop(offset, line)?;
                    #[cfg(feature = "tracing")]
                    tracing::debug!(%result, "return");
                    return Ok(result);
                }
            }
        }
    }

    /* ----------------- primitives ----------------- */

    fn read_byte(&mut self, chunk: &Chunk) -> Result<u8, VmError> {
        let byte = chunk.code().get(self.ip).copied().ok_or(VmError::UnexpectedEnd { offset: self.ip })?;
        self.ip += 1;
        Ok(byte)
    }

    fn push(&mut self, value: Value, line: u32) -> Result<(), VmError> {
        if self.stack.len() >= self.options.stack_capacity {
            return Err(VmError::StackOverflow { capacity: self.options.stack_capacity, line });
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self, offset: usize, line: u32) -> Result<Value, VmError> {
        self.stack.pop().ok_or(VmError::StackUnderflow { offset, line })
    }

    // info level so the trace survives `release_max_level_info`
    #[cfg(feature = "tracing")]
    fn trace_instruction(&self, chunk: &Chunk, offset: usize) {
        use std::fmt::Write;

        let mut stack = String::from("          ");
        for v in &self.stack {
            let _ = write!(stack, "[ {v} ]");
        }
        let (text, _) = disassemble_instruction(chunk, offset);
        tracing::info!(target: "ctcomp::trace", "{stack}");
        tracing::info!(target: "ctcomp::trace", "{text}");
    }
}

/* ------------------------------ Tests ------------------------------ */

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn chunk_of(ops: &[(OpCode, Option<u8>)], consts: &[f64]) -> Chunk {
        let mut chunk = Chunk::new();
        for &c in consts {
            chunk.add_constant(Value::Number(c)).unwrap();
        }
        for &(op, operand) in ops {
            chunk.write_op(op, 1);
            if let Some(b) = operand {
                chunk.write(b, 1);
            }
        }
        chunk
    }

    #[test]
    fn runs_a_hand_built_chunk() {
        // -(1.2 + 3.4) / 2
        let chunk = chunk_of(
            &[
                (OpCode::LoadConstant, Some(0)),
                (OpCode::LoadConstant, Some(1)),
                (OpCode::Add, None),
                (OpCode::Negate, None),
                (OpCode::LoadConstant, Some(2)),
                (OpCode::Div, None),
                (OpCode::Return, None),
            ],
            &[1.2, 3.4, 2.0],
        );
        let mut vm = Vm::new();
        assert_eq!(vm.run(&chunk), Ok(Value::Number(-(1.2 + 3.4) / 2.0)));
        assert!(vm.stack().is_empty());
    }

    #[test]
    fn binary_op_with_one_operand_underflows() {
        let chunk = chunk_of(&[(OpCode::LoadConstant, Some(0)), (OpCode::Add, None), (OpCode::Return, None)], &[1.0]);
        assert_eq!(Vm::new().run(&chunk), Err(VmError::StackUnderflow { offset: 2, line: 1 }));
    }

    #[test]
    fn return_on_empty_stack_underflows() {
        let chunk = chunk_of(&[(OpCode::Return, None)], &[]);
        assert_eq!(Vm::new().run(&chunk), Err(VmError::StackUnderflow { offset: 0, line: 1 }));
    }

    #[test]
    fn pushes_beyond_capacity_overflow() {
        let ops = vec![(OpCode::LoadConstant, Some(0)); 3];
        let chunk = chunk_of(&ops, &[1.0]);
        let mut vm = Vm::with_options(VmOptions { stack_capacity: 2, ..VmOptions::default() });
        assert_eq!(vm.run(&chunk), Err(VmError::StackOverflow { capacity: 2, line: 1 }));
    }

    #[test]
    fn malformed_bytecode_is_reported() {
        let mut bad_op = Chunk::new();
        bad_op.write(0x7F, 4);
        assert_eq!(Vm::new().run(&bad_op), Err(VmError::InvalidOpcode { byte: 0x7F, offset: 0, line: 4 }));

        let dangling = chunk_of(&[(OpCode::LoadConstant, Some(9)), (OpCode::Return, None)], &[1.0]);
        assert_eq!(Vm::new().run(&dangling), Err(VmError::MissingConstant { index: 9, offset: 0, line: 1 }));

        let no_return = chunk_of(&[(OpCode::LoadConstant, Some(0))], &[1.0]);
        assert_eq!(Vm::new().run(&no_return), Err(VmError::UnexpectedEnd { offset: 2 }));

        let truncated = chunk_of(&[(OpCode::LoadConstant, None)], &[1.0]);
        assert_eq!(Vm::new().run(&truncated), Err(VmError::UnexpectedEnd { offset: 1 }));
    }

    #[test]
    fn vm_is_reusable_after_a_runtime_error() {
        let mut vm = Vm::new();
        let underflow = chunk_of(&[(OpCode::Negate, None)], &[]);
        assert!(vm.run(&underflow).is_err());
        assert_eq!(vm.interpret("2 * 21"), Ok(Value::Number(42.0)));
    }

    #[test]
    fn interpret_classifies_outcomes() {
        let mut vm = Vm::new();
        let ok = vm.interpret("(1 + 2) * 3");
        assert_eq!(InterpretResult::of(&ok), InterpretResult::Ok);
        assert_eq!(ok, Ok(Value::Number(9.0)));

        let bad = vm.interpret("1 +");
        assert_eq!(InterpretResult::of(&bad), InterpretResult::CompileError);
        assert_eq!(InterpretResult::of(&bad).exit_code(), 2);
        assert_eq!(bad.unwrap_err().to_string(), "[line 1] Error at end: Expect expression.");
    }

    #[test]
    fn runtime_errors_carry_their_line() {
        let err = VmError::StackOverflow { capacity: 1, line: 3 };
        assert_eq!(err.line(), Some(3));
        assert_eq!(err.to_string(), "[line 3] stack overflow (capacity 1)");
        assert_eq!(VmError::UnexpectedEnd { offset: 5 }.line(), None);
        assert_eq!(InterpretResult::RuntimeError.exit_code(), 3);
    }

    #[test]
    fn huge_capacity_is_not_preallocated() {
        let mut vm = Vm::with_options(VmOptions { stack_capacity: usize::MAX, ..VmOptions::default() });
        assert_eq!(vm.options().stack_capacity, usize::MAX);
        assert_eq!(vm.interpret("1 + 2"), Ok(Value::Number(3.0)));
    }

    #[test]
    fn tracing_execution_does_not_change_results() {
        let mut vm = Vm::with_options(VmOptions { trace_execution: true, trace_tokens: true, ..VmOptions::default() });
        assert_eq!(vm.interpret("-2 * 3"), Ok(Value::Number(-6.0)));
    }
}
