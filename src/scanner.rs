//! Module `scanner` implements a one‑pass, streaming lexer for ShravScript.
//!
//! It transforms source text (`&str`) into a sequence of `Token<'a>`s, skipping
//! whitespace and `#` comments, and emitting exactly one `EOF` token at the
//! end. Designed as a `FusedIterator`, it can be chained safely with other
//! iterator adapters; `collect::<Result<Vec<_>>>()` stops at the first error.
//!
//! # Token Recognition (`scan_token`)
//!
//! - Delimiters: `(`, `)`, `{`, `}`, `[`, `]`, `,`, `;`.
//! - Operators, **longest match first**: `**`, `==`, `!=`, `<=`, `>=`, `..`,
//!   `=>` are never split into two one‑character tokens.
//! - String literals: `"…"` or `'…'` with `\n`, `\t` and escaped‑quote
//!   escapes; unknown escapes pass through with their backslash.
//! - Numeric literals: integer, or floating when a `.` followed by a digit is
//!   present (so `0..3` is `0` `..` `3`).
//! - Identifiers/keywords: alphanumeric/_ sequences, resolved via a
//!   perfect‑hash `KEYWORDS` map.
//! - Errors: any unexpected character yields `ShravError::lex(line, column, …)`.
//!
//! # Example
//!
//! ```rust
//! use shrav::scanner::Scanner;
//!
//! let mut scanner = Scanner::new("print(123) # example");
//! for result in &mut scanner {
//!     match result {
//!         Ok(token) => println!("{}", token),
//!         Err(err) => eprintln!("Lex error: {}", err),
//!     }
//! }
//! ```

use crate::error::{Result, ShravError};
use crate::token::{Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile‑time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"      => TokenType::AND,
    b"as"       => TokenType::AS,
    b"break"    => TokenType::BREAK,
    b"case"     => TokenType::CASE,
    b"catch"    => TokenType::CATCH,
    b"class"    => TokenType::CLASS,
    b"continue" => TokenType::CONTINUE,
    b"default"  => TokenType::DEFAULT,
    b"elif"     => TokenType::ELIF,
    b"else"     => TokenType::ELSE,
    b"false"    => TokenType::FALSE,
    b"fn"       => TokenType::FN,
    b"for"      => TokenType::FOR,
    b"if"       => TokenType::IF,
    b"import"   => TokenType::IMPORT,
    b"in"       => TokenType::IN,
    b"let"      => TokenType::LET,
    b"not"      => TokenType::NOT,
    b"null"     => TokenType::NULL,
    b"or"       => TokenType::OR,
    b"print"    => TokenType::PRINT,
    b"return"   => TokenType::RETURN,
    b"switch"   => TokenType::SWITCH,
    b"this"     => TokenType::THIS,
    b"true"     => TokenType::TRUE,
    b"try"      => TokenType::TRY,
    b"while"    => TokenType::WHILE,
    b"with"     => TokenType::WITH,
};

/// Convenience wrapper: scan the whole source, stopping at the first error.
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>> {
    Scanner::new(source).collect()
}

/// A single pass **scanner / lexer** that converts source text into a
/// sequence of [`Token`]s.  The lifetime `'a` ties every emitted token’s
/// `lexeme` slice back to the original source buffer.
pub struct Scanner<'a> {
    source: &'a str,            // entire compilation unit
    src: &'a [u8],              // byte view of `source`
    start: usize,               // index of the *first* byte of the current lexeme
    curr: usize,                // index *one past* the last byte examined
    line: usize,                // 1‑based line counter (\n increments)
    line_start: usize,          // byte index where the current line begins
    start_line: usize,          // line of the current lexeme's first byte
    start_column: usize,        // column of the current lexeme's first byte
    pending: Option<TokenType>, // recognised token kind waiting to be emitted
}

impl<'a> Scanner<'a> {
    /// Create a new lexer over `source`.
    #[inline]
    pub fn new(source: &'a str) -> Self {
        info!("Scanner created over {} bytes", source.len());

        Self {
            source,
            src: source.as_bytes(),
            start: 0,
            curr: 0,
            line: 1,
            line_start: 0,
            start_line: 1,
            start_column: 1,
            pending: None,
        }
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    #[inline(always)]
    const fn len(&self) -> usize {
        self.src.len()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.len()
    }

    /// Advance one byte and return it.  Callers guard with [`is_at_end`].
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.src[self.curr];
        self.curr += 1;
        b
    }

    /// Peek at the current byte without consuming it.  Returns `0` past EOF.
    #[inline(always)]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.src[self.curr]
        }
    }

    /// Peek one byte beyond [`peek`].  Safe at EOF.
    #[inline(always)]
    fn peek_next(&self) -> u8 {
        if self.curr + 1 >= self.len() {
            0
        } else {
            self.src[self.curr + 1]
        }
    }

    /// Conditionally consume a byte **iff** it matches `expected`.
    #[inline(always)]
    fn match_byte(&mut self, expected: u8) -> bool {
        if !self.is_at_end() && self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Record a newline whose `\n` byte sits at `self.curr - 1`.
    #[inline(always)]
    fn newline(&mut self) {
        self.line += 1;
        self.line_start = self.curr;
    }

    /// Pick the two‑character form when `second` follows, else the single one.
    #[inline(always)]
    fn either(&mut self, second: u8, double: TokenType, single: TokenType) -> TokenType {
        if self.match_byte(second) {
            double
        } else {
            single
        }
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scan a *single* token starting at `self.curr`.  If the lexeme produces an
    /// actual token the kind is stored in `self.pending`.  Whitespace and
    /// comments are skipped by returning `Ok(())` with `pending = None`.
    fn scan_token(&mut self) -> Result<()> {
        let b = self.advance();

        let tt = match b {
            // ── delimiters ───────────────────────────────────────────────
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b'[' => TokenType::LEFT_BRACKET,
            b']' => TokenType::RIGHT_BRACKET,
            b',' => TokenType::COMMA,
            b';' => TokenType::SEMICOLON,

            // ── operators (longest match first) ──────────────────────────
            b'+' => TokenType::PLUS,
            b'-' => TokenType::MINUS,
            b'/' => TokenType::SLASH,
            b'%' => TokenType::PERCENT,
            b':' => TokenType::COLON,
            b'*' => self.either(b'*', TokenType::STAR_STAR, TokenType::STAR),
            b'.' => self.either(b'.', TokenType::DOT_DOT, TokenType::DOT),
            b'!' => self.either(b'=', TokenType::BANG_EQUAL, TokenType::BANG),
            b'<' => self.either(b'=', TokenType::LESS_EQUAL, TokenType::LESS),
            b'>' => self.either(b'=', TokenType::GREATER_EQUAL, TokenType::GREATER),
            b'=' => {
                if self.match_byte(b'=') {
                    TokenType::EQUAL_EQUAL
                } else if self.match_byte(b'>') {
                    TokenType::ARROW
                } else {
                    TokenType::EQUAL
                }
            }

            // ── whitespace / newline ─────────────────────────────────────
            b' ' | b'\r' | b'\t' => return Ok(()),

            b'\n' => {
                self.newline();
                return Ok(());
            }

            // ── comments (# … until newline) ─────────────────────────────
            b'#' => {
                if let Some(pos) = memchr(b'\n', &self.src[self.curr..]) {
                    self.curr += pos;
                } else {
                    self.curr = self.len();
                }

                return Ok(());
            }

            // ── string literal " … " or ' … ' ────────────────────────────
            b'"' | b'\'' => return self.parse_string(b),

            // ── number literal (digit‑leading) ───────────────────────────
            b'0'..=b'9' => return self.parse_number(),

            // ── identifiers / keywords (alpha or underscore‑leading) ─────
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                self.parse_identifier();
                return Ok(());
            }

            // ── unexpected character ─────────────────────────────────────
            _ => {
                // `start` always sits on a char boundary; skip the whole char
                let ch: char = self.source[self.start..]
                    .chars()
                    .next()
                    .unwrap_or(char::REPLACEMENT_CHARACTER);
                self.curr = self.start + ch.len_utf8();

                return Err(ShravError::lex(
                    self.start_line,
                    self.start_column,
                    format!("Unrecognized character '{}'", ch),
                ));
            }
        };

        self.pending = Some(tt);

        Ok(())
    }

    /// Parse a quoted string literal opened by `quote`.
    ///
    /// * `self.start` still points to the opening quote.
    /// * When we return, `self.curr` points **past** the closing quote.
    fn parse_string(&mut self, quote: u8) -> Result<()> {
        let mut value: Vec<u8> = Vec::new();

        while !self.is_at_end() && self.peek() != quote {
            let b = self.advance();

            match b {
                b'\\' if !self.is_at_end() => {
                    let escaped = self.advance();

                    match escaped {
                        b'n' => value.push(b'\n'),
                        b't' => value.push(b'\t'),
                        q if q == quote => value.push(quote),
                        other => {
                            if other == b'\n' {
                                self.newline();
                            }

                            value.push(b'\\');
                            value.push(other);
                        }
                    }
                }

                b'\n' => {
                    self.newline();
                    value.push(b);
                }

                _ => value.push(b),
            }
        }

        if self.is_at_end() {
            return Err(ShravError::lex(
                self.start_line,
                self.start_column,
                "Unterminated string",
            ));
        }

        self.advance(); // consume closing quote

        self.pending = Some(TokenType::STRING(String::from_utf8(value)?));

        Ok(())
    }

    /// Parse a numeric literal (`123`, `3.14`).  At most one decimal point.
    fn parse_number(&mut self) -> Result<()> {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        let mut is_float = false;

        // Optional fractional part; `1..2` is a range, not `1.` `.2`.
        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            is_float = true;
            self.advance(); // consume "."

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text: &str = &self.source[self.start..self.curr];

        let tt = if is_float {
            // digits '.' digits always parses
            TokenType::FLOAT(text.parse::<f64>().unwrap_or(0.0))
        } else {
            match text.parse::<i64>() {
                Ok(n) => TokenType::INTEGER(n),
                Err(_) => {
                    return Err(ShravError::lex(
                        self.start_line,
                        self.start_column,
                        format!("Integer literal '{}' is too large", text),
                    ));
                }
            }
        };

        self.pending = Some(tt);

        Ok(())
    }

    /// Parse an identifier and decide if it is a **keyword** or a generic
    /// `IDENTIFIER` token.
    fn parse_identifier(&mut self) {
        while {
            let c: u8 = self.peek();
            c.is_ascii_alphanumeric() || c == b'_'
        } {
            self.advance();
        }

        let slice: &[u8] = &self.src[self.start..self.curr];

        let tt: TokenType = KEYWORDS
            .get(slice)
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER);

        self.pending = Some(tt);
    }
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        // Loop until we either emit a token, hit EOF, or see an error.
        while self.curr <= self.len() {
            // 1. EOF guard – emit exactly one EOF then terminate.
            if self.curr == self.len() {
                let column = self.curr - self.line_start + 1;
                self.curr += 1; // ensure fused semantics
                return Some(Ok(Token::new(TokenType::EOF, "", self.line, column)));
            }

            // 2. Reset per‑token state.
            self.start = self.curr;
            self.start_line = self.line;
            self.start_column = self.curr - self.line_start + 1;
            self.pending = None;

            // 3. Attempt to scan a token.
            if let Err(e) = self.scan_token() {
                return Some(Err(e));
            }

            // 4. If a real token was recognised, build and return it.
            if let Some(tt) = self.pending.take() {
                let lexeme: &'a str = &self.source[self.start..self.curr];
                debug!(
                    "Scanned token ({:?}) at {}:{}",
                    tt, self.start_line, self.start_column
                );

                return Some(Ok(Token::new(
                    tt,
                    lexeme,
                    self.start_line,
                    self.start_column,
                )));
            }
            // Otherwise it was whitespace / comment → continue loop.
        }

        None // already yielded EOF
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
