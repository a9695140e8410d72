//! ctcomp-compiler — single-pass expression compiler
//!
//! - Input: source text, pulled token by token from `ctcomp_lexer::Lexer`
//! - Output: a `ctcomp_core::Chunk` ready for the VM
//! - Parsing: precedence climbing (prefix/infix dispatch per token kind), no AST
//! - Diagnostics: panic-mode recovery, the first error is reported and the cascade behind it
//!   is suppressed; any error fails the whole compilation
//!
//! ```
//! use ctcomp_compiler::compile;
//! use ctcomp_core::OpCode;
//!
//! let chunk = compile("1 + 2 * 3").unwrap();
//! assert_eq!(chunk.code().last(), Some(&u8::from(OpCode::Return)));
//!
//! let err = compile("1 +").unwrap_err();
//! assert_eq!(err.diagnostics[0].to_string(), "[line 1] Error at end: Expect expression.");
//! ```

#![deny(missing_docs)]

use core::fmt;

use ctcomp_core::{Chunk, OpCode, Span, Value};
use ctcomp_lexer::{Lexer, Token, TokenKind};
use log::debug;

// ─────────────────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────────────────

/// Compiler options.
#[derive(Debug, Clone, Default)]
pub struct CompilerOptions {
    /// Log every consumed token at debug level.
    pub trace_tokens: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
/* Diagnostics */
// ─────────────────────────────────────────────────────────────────────────────

/// A compile error located on a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Line of the offending token.
    pub line: u32,
    /// Offending lexeme, `None` when the error is at end of input.
    pub lexeme: Option<String>,
    /// Byte range of the offending token.
    pub span: Span,
    /// Human readable message.
    pub message: String,
}

impl Diagnostic {
    fn at(token: &Token<'_>, message: impl Into<String>) -> Self {
        let lexeme = (!token.is_eof()).then(|| token.lexeme.to_string());
        Self { line: token.line, lexeme, span: token.span, message: message.into() }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}] Error", self.line)?;
        match &self.lexeme {
            Some(lx) => write!(f, " at '{lx}'")?,
            None => f.write_str(" at end")?,
        }
        write!(f, ": {}", self.message)
    }
}

/// Failed compilation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", join_lines(.diagnostics))]
pub struct CompileError {
    /// Reported diagnostics, in source order.
    pub diagnostics: Vec<Diagnostic>,
}

fn join_lines(diagnostics: &[Diagnostic]) -> String {
    diagnostics.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
}

// ─────────────────────────────────────────────────────────────────────────────
// Precedence
// ─────────────────────────────────────────────────────────────────────────────

/// Binding power, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    None,
    /// `+` `-`
    Term,
    /// `*` `/`
    Factor,
    /// unary `-`
    Unary,
    Primary,
}

impl Precedence {
    const fn next(self) -> Self {
        match self {
            Precedence::None => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary | Precedence::Primary => Precedence::Primary,
        }
    }

    /// Precedence of `kind` used as an infix operator.
    const fn of_infix(kind: TokenKind) -> Self {
        match kind {
            TokenKind::Plus | TokenKind::Minus => Precedence::Term,
            TokenKind::Star | TokenKind::Slash => Precedence::Factor,
            _ => Precedence::None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
/* Compiler */
// ─────────────────────────────────────────────────────────────────────────────

/// Deepest nesting of sub-expressions (unary operands, groups, right operands) accepted.
pub const MAX_NESTING: u32 = 256;

/// Compiles `source` with default options.
pub fn compile(source: &str) -> Result<Chunk, CompileError> {
    compile_with(source, CompilerOptions::default())
}

/// Compiles `source` with explicit options.
pub fn compile_with(source: &str, options: CompilerOptions) -> Result<Chunk, CompileError> {
    Compiler::new(source, options).compile()
}

/// Parser state for one compilation: the token window, the chunk being filled and the error
/// flags.
pub struct Compiler<'src> {
    lexer: Lexer<'src>,
    current: Token<'src>,
    previous: Token<'src>,
    chunk: Chunk,
    had_error: bool,
    panic_mode: bool,
    /// Current `parse_precedence` nesting.
    depth: u32,
    diagnostics: Vec<Diagnostic>,
    options: CompilerOptions,
}

impl<'src> Compiler<'src> {
    /// Prepares a compiler over `source`. No token is read until [`Compiler::compile`].
    pub fn new(source: &'src str, options: CompilerOptions) -> Self {
        let start = Token { kind: TokenKind::Eof, lexeme: "", span: Span::default(), line: 1 };
        Self {
            lexer: Lexer::new(source),
            current: start,
            previous: start,
            chunk: Chunk::new(),
            had_error: false,
            panic_mode: false,
            depth: 0,
            diagnostics: Vec::new(),
            options,
        }
    }

    /// Compiles one expression followed by end of input, terminated by `RETURN`.
    pub fn compile(mut self) -> Result<Chunk, CompileError> {
        self.advance();
        self.expression();
        self.consume(TokenKind::Eof, "Expect end of expression.");
        self.emit_op(OpCode::Return);

        if self.had_error {
            debug!("compilation failed with {} diagnostic(s)", self.diagnostics.len());
            return Err(CompileError { diagnostics: self.diagnostics });
        }
        debug!(
            "compiled {} byte(s), {} constant(s)",
            self.chunk.len(),
            self.chunk.constants().len()
        );
        Ok(self.chunk)
    }

    /* ────────── Token window ────────── */

    fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.lexer.next_token();
            if self.options.trace_tokens {
                debug!("{:4} {:?} '{}'", self.current.line, self.current.kind, self.current.lexeme);
            }
            let Some(err) = self.current.error() else { break };
            self.error_at_current(err.message());
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.current.kind == kind {
            self.advance();
        } else {
            self.error_at_current(message);
        }
    }

    /* ────────── Grammar ────────── */

    fn expression(&mut self) { self.parse_precedence(Precedence::Term); }

    fn parse_precedence(&mut self, precedence: Precedence) {
        if self.depth >= MAX_NESTING {
            self.error_at_current("Expression nests too deeply.");
            return;
        }
        self.depth += 1;
        self.parse_operand_and_infixes(precedence);
        self.depth -= 1;
    }

    fn parse_operand_and_infixes(&mut self, precedence: Precedence) {
        self.advance();
        if !self.prefix(self.previous.kind) {
            self.error("Expect expression.");
            return;
        }
        while precedence <= Precedence::of_infix(self.current.kind) {
            self.advance();
            self.binary();
        }
    }

    /// Runs the prefix rule for `kind`; false when the token cannot start an expression.
    fn prefix(&mut self, kind: TokenKind) -> bool {
        match kind {
            TokenKind::Number => self.number(),
            TokenKind::Minus => self.unary(),
            TokenKind::LeftParen => self.grouping(),
            _ => return false,
        }
        true
    }

    fn number(&mut self) {
        match self.previous.lexeme.parse::<f64>() {
            Ok(n) => self.emit_constant(Value::Number(n)),
            Err(_) => self.error("Invalid number literal."),
        }
    }

    fn unary(&mut self) {
        self.parse_precedence(Precedence::Unary);
        self.emit_op(OpCode::Negate);
    }

    fn binary(&mut self) {
        let operator = self.previous.kind;
        self.parse_precedence(Precedence::of_infix(operator).next());
        match operator {
            TokenKind::Plus => self.emit_op(OpCode::Add),
            TokenKind::Minus => self.emit_op(OpCode::Sub),
            TokenKind::Star => self.emit_op(OpCode::Mult),
            TokenKind::Slash => self.emit_op(OpCode::Div),
            _ => {}
        }
    }

    fn grouping(&mut self) {
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after expression.");
    }

    /* ────────── Emission ────────── */

    fn emit_op(&mut self, op: OpCode) { self.chunk.write_op(op, self.previous.line); }

    fn emit_constant(&mut self, value: Value) {
        match self.chunk.add_constant(value) {
            Ok(idx) => {
                self.emit_op(OpCode::LoadConstant);
                self.chunk.write(idx, self.previous.line);
            }
            Err(_) => self.error("Too many constants in one chunk."),
        }
    }

    /* ────────── Errors ────────── */

    fn error(&mut self, message: &str) { self.error_at(self.previous, message); }

    fn error_at_current(&mut self, message: &str) { self.error_at(self.current, message); }

    // panic mode is only left by synchronising, and the sole sync point here is end of input
    fn error_at(&mut self, token: Token<'src>, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        self.had_error = true;
        let diag = Diagnostic::at(&token, message);
        debug!("{diag}");
        self.diagnostics.push(diag);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LOAD: u8 = OpCode::LoadConstant as u8;
    const RET: u8 = OpCode::Return as u8;

    fn bytes(src: &str) -> Vec<u8> { compile(src).unwrap().code().to_vec() }

    fn errors(src: &str) -> Vec<String> {
        compile(src).unwrap_err().diagnostics.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn factor_binds_tighter_than_term() {
        assert_eq!(bytes("1 + 2 * 3"), vec![LOAD, 0, LOAD, 1, LOAD, 2, OpCode::Mult as u8, OpCode::Add as u8, RET]);
    }

    #[test]
    fn unary_binds_tightest() {
        assert_eq!(bytes("-2 * 3"), vec![LOAD, 0, OpCode::Negate as u8, LOAD, 1, OpCode::Mult as u8, RET]);
        assert_eq!(bytes("--4"), vec![LOAD, 0, OpCode::Negate as u8, OpCode::Negate as u8, RET]);
    }

    #[test]
    fn binary_operators_are_left_associative() {
        let sub = OpCode::Sub as u8;
        assert_eq!(bytes("8 - 3 - 2"), vec![LOAD, 0, LOAD, 1, sub, LOAD, 2, sub, RET]);
        let div = OpCode::Div as u8;
        assert_eq!(bytes("8 / 4 / 2"), vec![LOAD, 0, LOAD, 1, div, LOAD, 2, div, RET]);
    }

    #[test]
    fn grouping_overrides_precedence() {
        assert_eq!(bytes("(1 + 2) * 3"), vec![LOAD, 0, LOAD, 1, OpCode::Add as u8, LOAD, 2, OpCode::Mult as u8, RET]);
    }

    #[test]
    fn literals_land_in_the_constant_pool() {
        let chunk = compile("42 + 0.5").unwrap();
        let consts: Vec<_> = chunk.constants().iter().collect();
        assert_eq!(consts, vec![(0, Value::Number(42.0)), (1, Value::Number(0.5))]);
    }

    #[test]
    fn bytes_carry_the_line_of_their_token() {
        let chunk = compile("1 +\n2").unwrap();
        assert_eq!(chunk.lines().as_slice(), &[1, 1, 2, 2, 2, 2]);
    }

    #[test]
    fn syntax_errors_report_location() {
        assert_eq!(errors(""), vec!["[line 1] Error at end: Expect expression."]);
        assert_eq!(errors("1 +"), vec!["[line 1] Error at end: Expect expression."]);
        assert_eq!(errors("* 3"), vec!["[line 1] Error at '*': Expect expression."]);
        assert_eq!(errors("1 2"), vec!["[line 1] Error at '2': Expect end of expression."]);
        assert_eq!(errors("(1\n+ 2"), vec!["[line 2] Error at end: Expect ')' after expression."]);
        assert_eq!(errors("fn"), vec!["[line 1] Error at 'fn': Expect expression."]);
    }

    #[test]
    fn lexical_errors_fail_compilation_once() {
        assert_eq!(errors("\"abc"), vec!["[line 1] Error at '\"abc': Unterminated string."]);
        // the cascade after '@' is suppressed
        assert_eq!(errors("1 @ 2 )"), vec!["[line 1] Error at '@': Unexpected character."]);
    }

    #[test]
    fn constant_pool_overflow_is_a_compile_error() {
        let src = vec!["1"; 257].join(" + ");
        let err = compile(&src).unwrap_err();
        assert_eq!(err.diagnostics.len(), 1);
        assert_eq!(err.diagnostics[0].message, "Too many constants in one chunk.");

        let fits = vec!["1"; 256].join(" + ");
        assert!(compile(&fits).is_ok());
    }

    #[test]
    fn deep_nesting_is_a_compile_error() {
        let unary = compile(&format!("{}1", "-".repeat(100_000))).unwrap_err();
        assert_eq!(unary.diagnostics.len(), 1);
        assert_eq!(unary.diagnostics[0].message, "Expression nests too deeply.");

        let groups = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        assert_eq!(
            compile(&groups).unwrap_err().diagnostics[0].to_string(),
            "[line 1] Error at '(': Expression nests too deeply."
        );
    }

    #[test]
    fn nesting_below_the_limit_compiles() {
        let depth = (MAX_NESTING - 1) as usize;
        let groups = format!("{}1{}", "(".repeat(depth - 1), ")".repeat(depth - 1));
        assert!(compile(&groups).is_ok());
        assert!(compile(&format!("{}1", "-".repeat(depth - 1))).is_ok());
    }

    #[test]
    fn compile_error_displays_every_diagnostic() {
        let err = compile("(").unwrap_err();
        assert_eq!(err.to_string(), "[line 1] Error at end: Expect expression.");
    }

    #[test]
    fn tracing_tokens_does_not_change_output() {
        let traced = compile_with("3 * (4 - 1)", CompilerOptions { trace_tokens: true }).unwrap();
        assert_eq!(traced, compile("3 * (4 - 1)").unwrap());
    }
}
