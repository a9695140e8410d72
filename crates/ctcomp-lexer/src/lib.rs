//! ctcomp-lexer — lexical analysis for ctcomp
//!
//! Highlights:
//! - `Lexer::next_token` hands out one `Token` at a time, borrowing the source; once the
//!   input is exhausted it keeps returning `Eof`
//! - `#` line comments, `"…"` / `'…'` strings, decimal numbers (`12`, `3.25`)
//! - keywords resolved by a fixed decision tree over the lexeme bytes (exact length only)
//! - lexical errors are tokens (`TokenKind::Error`), scanning goes on after them
//!
//! Quick example:
//! ```
//! use ctcomp_lexer::{Lexer, TokenKind};
//!
//! let mut lx = Lexer::new("1 + 2 # trailing comment");
//! let kinds: Vec<_> = std::iter::from_fn(|| {
//!     let t = lx.next_token();
//!     (t.kind != TokenKind::Eof).then_some(t.kind)
//! })
//! .collect();
//! assert_eq!(kinds, [TokenKind::Number, TokenKind::Plus, TokenKind::Number]);
//! ```

#![deny(missing_docs)]

use core::fmt;

use ctcomp_core::Span;

/* ─────────────────────────── Tokens ─────────────────────────── */

/// Reserved keywords. Recognised for a fuller grammar, inert in the expression compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    /// `fn`
    Fn,
    /// `struct`
    Struct,
    /// `return`
    Return,
    /// `this`
    This,
    /// `super`
    Super,
    /// `nil`
    Nil,
    /// `include`
    Include,
    /// `exclude`
    Exclude,
    /// `match`
    Match,
    /// `if`
    If,
    /// `elif`
    Elif,
    /// `else`
    Else,
    /// `for`
    For,
    /// `while`
    While,
    /// `block`
    Block,
    /// `namespace`
    Namespace,
    /// `error`
    Error,
    /// `try`
    Try,
    /// `catch`
    Catch,
    /// `private`
    Private,
    /// `public`
    Public,
    /// `protected`
    Protected,
    /// `enum`
    Enum,
    /// `extends`
    Extends,
    /// `cons`
    Cons,
    /// `generic`
    Generic,
}

/// Primitive type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimType {
    /// `real`
    Real,
    /// `char`
    Char,
    /// `bool`
    Bool,
    /// `void`
    Void,
    /// `free`
    Free,
}

/// Kind of lexical error carried by an error token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LexErrorKind {
    /// Character that starts no token.
    UnexpectedChar,
    /// End of input reached before the closing delimiter.
    UnterminatedString,
}

impl LexErrorKind {
    /// Human readable message.
    pub const fn message(self) -> &'static str {
        match self {
            LexErrorKind::UnexpectedChar => "Unexpected character.",
            LexErrorKind::UnterminatedString => "Unterminated string.",
        }
    }
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.message()) }
}

/// Token kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `[`
    LeftSquare,
    /// `]`
    RightSquare,
    /// `{`
    LeftCurly,
    /// `}`
    RightCurly,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `;`
    Semicolon,
    /// `:`
    Colon,

    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,

    /// `++` (reserved, never produced)
    Increment,
    /// `--` (reserved, never produced)
    Decrement,

    /// `<`
    Less,
    /// `<=`
    LessEq,
    /// `>`
    Greater,
    /// `>=`
    GreaterEq,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,

    /// `and`
    And,
    /// `or`
    Or,
    /// `!`
    Not,

    /// `=`
    Assign,
    /// `->`
    Arrow,
    /// lone `_`
    Underscore,

    /// Identifier.
    Identifier,
    /// Number literal (`12`, `3.25`).
    Number,
    /// String literal, delimiters included in the lexeme.
    String,
    /// `true` / `false`.
    Boolean,

    /// Reserved keyword.
    Kw(Keyword),
    /// Primitive type name.
    Type(PrimType),

    /// Lexical error; the token's lexeme is the offending source text.
    Error(LexErrorKind),
    /// End of input.
    Eof,
}

/// A token, borrowing its lexeme from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'src> {
    /// Kind.
    pub kind: TokenKind,
    /// Exact source text (empty for `Eof`).
    pub lexeme: &'src str,
    /// Byte range of `lexeme` in the source.
    pub span: Span,
    /// 1-based line where the token ends.
    pub line: u32,
}

impl Token<'_> {
    /// True for the end-of-input sentinel.
    pub fn is_eof(&self) -> bool { self.kind == TokenKind::Eof }

    /// Error payload of a lexical-error token.
    pub fn error(&self) -> Option<LexErrorKind> {
        match self.kind {
            TokenKind::Error(e) => Some(e),
            _ => None,
        }
    }
}

/* ─────────────────────────── Lexer ─────────────────────────── */

/// On-demand lexer.
#[derive(Debug, Clone)]
pub struct Lexer<'src> {
    src: &'src str,
    bytes: &'src [u8],
    /// Start of the token being scanned.
    start: usize,
    /// Current byte offset.
    off: usize,
    line: u32,
    /// Set once the iterator has yielded `Eof`.
    finished: bool,
}

impl<'src> Lexer<'src> {
    /// Creates a lexer at the start of `src`, line 1.
    pub fn new(src: &'src str) -> Self {
        Self { src, bytes: src.as_bytes(), start: 0, off: 0, line: 1, finished: false }
    }

    /// Current line (1-based).
    pub fn line(&self) -> u32 { self.line }

    /// Next token. Returns `Eof` forever once the source is exhausted.
    pub fn next_token(&mut self) -> Token<'src> {
        self.skip_ws_and_comments();
        self.start = self.off;

        let Some(c) = self.bump() else {
            return self.make(TokenKind::Eof);
        };

        let kind = match c {
            b if is_ident_start(b) => {
                self.consume_while(is_ident_continue);
                identifier_kind(&self.bytes[self.start..self.off])
            }
            b if b.is_ascii_digit() => self.lex_number(),
            b'"' | b'\'' => self.lex_string(c),

            b'-' => if self.eat(b'>') { TokenKind::Arrow } else { TokenKind::Minus },
            b'<' => if self.eat(b'=') { TokenKind::LessEq } else { TokenKind::Less },
            b'>' => if self.eat(b'=') { TokenKind::GreaterEq } else { TokenKind::Greater },
            b'=' => if self.eat(b'=') { TokenKind::EqEq } else { TokenKind::Assign },
            b'!' => if self.eat(b'=') { TokenKind::NotEq } else { TokenKind::Not },

            b'(' => TokenKind::LeftParen,
            b')' => TokenKind::RightParen,
            b'[' => TokenKind::LeftSquare,
            b']' => TokenKind::RightSquare,
            b'{' => TokenKind::LeftCurly,
            b'}' => TokenKind::RightCurly,
            b',' => TokenKind::Comma,
            b'.' => TokenKind::Dot,
            b';' => TokenKind::Semicolon,
            b':' => TokenKind::Colon,
            b'+' => TokenKind::Plus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'%' => TokenKind::Percent,

            _ => {
                // keep lexemes on char boundaries for multi-byte input
                let width = self.src[self.start..].chars().next().map_or(1, char::len_utf8);
                self.off = self.start + width;
                TokenKind::Error(LexErrorKind::UnexpectedChar)
            }
        };

        self.make(kind)
    }

    /// Tokenises the whole source, final `Eof` included.
    pub fn tokenize(self) -> Vec<Token<'src>> { self.collect() }

    /* ────────── Primitives internes ────────── */

    #[inline] fn is_eof(&self) -> bool { self.off >= self.bytes.len() }
    #[inline] fn peek(&self) -> Option<u8> { self.bytes.get(self.off).copied() }
    #[inline] fn peek2(&self) -> Option<u8> { self.bytes.get(self.off + 1).copied() }
    #[inline] fn bump(&mut self) -> Option<u8> { let b = self.peek(); if b.is_some() { self.off += 1; } b }
    #[inline] fn eat(&mut self, b: u8) -> bool { if self.peek() == Some(b) { self.off += 1; true } else { false } }

    fn consume_while(&mut self, mut p: impl FnMut(u8) -> bool) {
        while let Some(b) = self.peek() {
            if p(b) { self.off += 1; } else { break; }
        }
    }

    fn skip_ws_and_comments(&mut self) {
        while let Some(b) = self.peek() {
            match b {
                b' ' | b'\r' | b'\t' => self.off += 1,
                b'\n' => {
                    self.line += 1;
                    self.off += 1;
                }
                b'#' => self.consume_while(|b| b != b'\n'),
                _ => break,
            }
        }
    }

    fn lex_number(&mut self) -> TokenKind {
        self.consume_while(|b| b.is_ascii_digit());
        // `1.` leaves the dot for a separate `Dot` token
        if self.peek() == Some(b'.') && self.peek2().is_some_and(|d| d.is_ascii_digit()) {
            self.off += 1;
            self.consume_while(|b| b.is_ascii_digit());
        }
        TokenKind::Number
    }

    fn lex_string(&mut self, delimiter: u8) -> TokenKind {
        while let Some(b) = self.peek() {
            if b == delimiter {
                break;
            }
            if b == b'\n' {
                self.line += 1;
            }
            self.off += 1;
        }
        if self.is_eof() {
            return TokenKind::Error(LexErrorKind::UnterminatedString);
        }
        self.off += 1;
        TokenKind::String
    }

    fn make(&self, kind: TokenKind) -> Token<'src> {
        let tok = Token {
            kind,
            lexeme: &self.src[self.start..self.off],
            span: Span::at(self.start, self.off - self.start),
            line: self.line,
        };
        #[cfg(feature = "trace")]
        log::trace!("token {:?} {:?} (line {})", tok.kind, tok.lexeme, tok.line);
        tok
    }
}

/// Yields every token up to and including the first `Eof`.
impl<'src> Iterator for Lexer<'src> {
    type Item = Token<'src>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let tok = self.next_token();
        self.finished = tok.is_eof();
        Some(tok)
    }
}

/* ─────────────────────────── Helpers ─────────────────────────── */

#[inline]
const fn is_ident_start(b: u8) -> bool { b == b'_' || b.is_ascii_alphabetic() }

#[inline]
const fn is_ident_continue(b: u8) -> bool { b == b'_' || b.is_ascii_alphanumeric() }

/// Classifies an identifier-shaped lexeme.
///
/// Each arm walks the leading bytes that tell keywords apart, then [`rest_is`] demands the
/// remaining bytes match exactly, so keyword prefixes and extensions stay identifiers.
fn identifier_kind(lexeme: &[u8]) -> TokenKind {
    use Keyword as K;
    use PrimType as P;
    use TokenKind::{Kw, Type};

    match lexeme {
        [b'_'] => TokenKind::Underscore,
        [b'a', rest @ ..] => rest_is(rest, b"nd", TokenKind::And),
        [b'b', b'l', rest @ ..] => rest_is(rest, b"ock", Kw(K::Block)),
        [b'b', b'o', rest @ ..] => rest_is(rest, b"ol", Type(P::Bool)),
        [b'c', b'a', rest @ ..] => rest_is(rest, b"tch", Kw(K::Catch)),
        [b'c', b'h', rest @ ..] => rest_is(rest, b"ar", Type(P::Char)),
        [b'c', b'o', rest @ ..] => rest_is(rest, b"ns", Kw(K::Cons)),
        [b'e', b'l', b'i', rest @ ..] => rest_is(rest, b"f", Kw(K::Elif)),
        [b'e', b'l', b's', rest @ ..] => rest_is(rest, b"e", Kw(K::Else)),
        [b'e', b'n', rest @ ..] => rest_is(rest, b"um", Kw(K::Enum)),
        [b'e', b'r', rest @ ..] => rest_is(rest, b"ror", Kw(K::Error)),
        [b'e', b'x', b'c', rest @ ..] => rest_is(rest, b"lude", Kw(K::Exclude)),
        [b'e', b'x', b't', rest @ ..] => rest_is(rest, b"ends", Kw(K::Extends)),
        [b'f', b'a', rest @ ..] => rest_is(rest, b"lse", TokenKind::Boolean),
        [b'f', b'n', rest @ ..] => rest_is(rest, b"", Kw(K::Fn)),
        [b'f', b'o', rest @ ..] => rest_is(rest, b"r", Kw(K::For)),
        [b'f', b'r', rest @ ..] => rest_is(rest, b"ee", Type(P::Free)),
        [b'g', rest @ ..] => rest_is(rest, b"eneric", Kw(K::Generic)),
        [b'i', b'f', rest @ ..] => rest_is(rest, b"", Kw(K::If)),
        [b'i', b'n', rest @ ..] => rest_is(rest, b"clude", Kw(K::Include)),
        [b'm', rest @ ..] => rest_is(rest, b"atch", Kw(K::Match)),
        [b'n', b'a', rest @ ..] => rest_is(rest, b"mespace", Kw(K::Namespace)),
        [b'n', b'i', rest @ ..] => rest_is(rest, b"l", Kw(K::Nil)),
        [b'o', rest @ ..] => rest_is(rest, b"r", TokenKind::Or),
        [b'p', b'r', b'i', rest @ ..] => rest_is(rest, b"vate", Kw(K::Private)),
        [b'p', b'r', b'o', rest @ ..] => rest_is(rest, b"tected", Kw(K::Protected)),
        [b'p', b'u', rest @ ..] => rest_is(rest, b"blic", Kw(K::Public)),
        [b'r', b'e', b'a', rest @ ..] => rest_is(rest, b"l", Type(P::Real)),
        [b'r', b'e', b't', rest @ ..] => rest_is(rest, b"urn", Kw(K::Return)),
        [b's', b't', rest @ ..] => rest_is(rest, b"ruct", Kw(K::Struct)),
        [b's', b'u', rest @ ..] => rest_is(rest, b"per", Kw(K::Super)),
        [b't', b'h', rest @ ..] => rest_is(rest, b"is", Kw(K::This)),
        [b't', b'r', b'u', rest @ ..] => rest_is(rest, b"e", TokenKind::Boolean),
        [b't', b'r', b'y', rest @ ..] => rest_is(rest, b"", Kw(K::Try)),
        [b'v', rest @ ..] => rest_is(rest, b"oid", Type(P::Void)),
        [b'w', rest @ ..] => rest_is(rest, b"hile", Kw(K::While)),
        _ => TokenKind::Identifier,
    }
}

#[inline]
fn rest_is(rest: &[u8], expected: &[u8], kind: TokenKind) -> TokenKind {
    if rest == expected { kind } else { TokenKind::Identifier }
}

/* ─────────────────────────── Tests ─────────────────────────── */
