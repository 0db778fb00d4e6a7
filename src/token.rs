use log::debug;
use serde::Serialize;
use std::fmt;
use std::mem;

/// The different kinds of tokens recognized by the ShravScript scanner.
///
/// Variants without data represent operators, delimiters or keywords.
/// `STRING(String)`, `INTEGER(i64)` and `FLOAT(f64)` carry their literal values.
/// `IDENTIFIER` is used for user‑defined names.
/// `EOF` marks the end of input.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Serialize)]
pub enum TokenType {
    // ── delimiters ──────────────────────────────────────────────────────
    /// '('
    LEFT_PAREN,

    /// ')'
    RIGHT_PAREN,

    /// '{'
    LEFT_BRACE,

    /// '}'
    RIGHT_BRACE,

    /// '['
    LEFT_BRACKET,

    /// ']'
    RIGHT_BRACKET,

    /// ','
    COMMA,

    /// ';'
    SEMICOLON,

    // ── operators ───────────────────────────────────────────────────────
    /// '.'
    DOT,

    /// '..'
    DOT_DOT,

    /// ':'
    COLON,

    /// '-'
    MINUS,

    /// '+'
    PLUS,

    /// '/'
    SLASH,

    /// '%'
    PERCENT,

    /// '*'
    STAR,

    /// '**'
    STAR_STAR,

    /// '!'
    BANG,

    /// '!='
    BANG_EQUAL,

    /// '='
    EQUAL,

    /// '=='
    EQUAL_EQUAL,

    /// '=>'
    ARROW,

    /// '>'
    GREATER,

    /// '>='
    GREATER_EQUAL,

    /// '<'
    LESS,

    /// '<='
    LESS_EQUAL,

    // ── literals ────────────────────────────────────────────────────────
    /// A user‑defined identifier
    IDENTIFIER,

    /// A string literal (contents without quotes, escapes processed)
    STRING(String),

    /// A numeric literal without a decimal point
    #[serde(rename = "INTEGER")]
    INTEGER(i64),

    /// A numeric literal with a decimal point
    #[serde(rename = "FLOAT")]
    FLOAT(f64),

    // ── keywords ────────────────────────────────────────────────────────
    AND,
    AS,
    BREAK,
    CASE,
    CATCH,
    CLASS,
    CONTINUE,
    DEFAULT,
    ELIF,
    ELSE,
    FALSE,
    FN,
    FOR,
    IF,
    IMPORT,
    IN,
    LET,
    NOT,
    NULL,
    OR,
    PRINT,
    RETURN,
    SWITCH,
    THIS,
    TRUE,
    TRY,
    WHILE,
    WITH,

    /// End‑of‑input marker
    EOF,
}

/// The coarse token categories of the language: every [`TokenType`] belongs
/// to exactly one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    Number,
    String,
    Identifier,
    Keyword,
    Operator,
    Delimiter,
    Eof,
}

impl PartialEq for TokenType {
    /// Two TokenTypes are equal if they share the same variant
    /// (ignoring any inner data). Uses `mem::discriminant` to compare.
    fn eq(&self, other: &Self) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }
}

impl TokenType {
    /// Category of this token type.
    pub fn kind(&self) -> TokenKind {
        use TokenType::*;

        match self {
            LEFT_PAREN | RIGHT_PAREN | LEFT_BRACE | RIGHT_BRACE | LEFT_BRACKET
            | RIGHT_BRACKET | COMMA | SEMICOLON => TokenKind::Delimiter,

            DOT | DOT_DOT | COLON | MINUS | PLUS | SLASH | PERCENT | STAR | STAR_STAR | BANG
            | BANG_EQUAL | EQUAL | EQUAL_EQUAL | ARROW | GREATER | GREATER_EQUAL | LESS
            | LESS_EQUAL => TokenKind::Operator,

            IDENTIFIER => TokenKind::Identifier,
            STRING(_) => TokenKind::String,
            INTEGER(_) | FLOAT(_) => TokenKind::Number,
            EOF => TokenKind::Eof,

            AND | AS | BREAK | CASE | CATCH | CLASS | CONTINUE | DEFAULT | ELIF | ELSE | FALSE
            | FN | FOR | IF | IMPORT | IN | LET | NOT | NULL | OR | PRINT | RETURN | SWITCH
            | THIS | TRUE | TRY | WHILE | WITH => TokenKind::Keyword,
        }
    }

    /// Upper‑case variant name without payload, used by `tokenize` output.
    pub fn name(&self) -> &'static str {
        use TokenType::*;

        match self {
            LEFT_PAREN => "LEFT_PAREN",
            RIGHT_PAREN => "RIGHT_PAREN",
            LEFT_BRACE => "LEFT_BRACE",
            RIGHT_BRACE => "RIGHT_BRACE",
            LEFT_BRACKET => "LEFT_BRACKET",
            RIGHT_BRACKET => "RIGHT_BRACKET",
            COMMA => "COMMA",
            SEMICOLON => "SEMICOLON",
            DOT => "DOT",
            DOT_DOT => "DOT_DOT",
            COLON => "COLON",
            MINUS => "MINUS",
            PLUS => "PLUS",
            SLASH => "SLASH",
            PERCENT => "PERCENT",
            STAR => "STAR",
            STAR_STAR => "STAR_STAR",
            BANG => "BANG",
            BANG_EQUAL => "BANG_EQUAL",
            EQUAL => "EQUAL",
            EQUAL_EQUAL => "EQUAL_EQUAL",
            ARROW => "ARROW",
            GREATER => "GREATER",
            GREATER_EQUAL => "GREATER_EQUAL",
            LESS => "LESS",
            LESS_EQUAL => "LESS_EQUAL",
            IDENTIFIER => "IDENTIFIER",
            STRING(_) => "STRING",
            INTEGER(_) => "INTEGER",
            FLOAT(_) => "FLOAT",
            AND => "AND",
            AS => "AS",
            BREAK => "BREAK",
            CASE => "CASE",
            CATCH => "CATCH",
            CLASS => "CLASS",
            CONTINUE => "CONTINUE",
            DEFAULT => "DEFAULT",
            ELIF => "ELIF",
            ELSE => "ELSE",
            FALSE => "FALSE",
            FN => "FN",
            FOR => "FOR",
            IF => "IF",
            IMPORT => "IMPORT",
            IN => "IN",
            LET => "LET",
            NOT => "NOT",
            NULL => "NULL",
            OR => "OR",
            PRINT => "PRINT",
            RETURN => "RETURN",
            SWITCH => "SWITCH",
            THIS => "THIS",
            TRUE => "TRUE",
            TRY => "TRY",
            WHILE => "WHILE",
            WITH => "WITH",
            EOF => "EOF",
        }
    }
}

/// A scanned token: its type, the original lexeme, and the 1‑based line and
/// column of its first character.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Token<'a> {
    /// The category of this token.
    pub token_type: TokenType,

    /// The exact substring from the source that produced this token.
    pub lexeme: &'a str,

    /// 1‑based line number in the source.
    pub line: usize,

    /// 1‑based column number in the source.
    pub column: usize,
}

impl<'a> Token<'a> {
    pub fn new(token_type: TokenType, lexeme: &'a str, line: usize, column: usize) -> Self {
        debug!(
            "Creating new token: type={:?}, lexeme={}, line={}, column={}",
            token_type, lexeme, line, column
        );

        Self {
            token_type,
            lexeme,
            line,
            column,
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.token_type.kind()
    }

    /// Text used when a token is quoted in a diagnostic.
    pub fn text(&self) -> &str {
        if matches!(self.token_type, TokenType::EOF) {
            "end of input"
        } else {
            self.lexeme
        }
    }
}

impl<'a> fmt::Display for Token<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 3 → "3", 3.0 → "3.0", "abc" → abc, everything else → null
        let literal: String = match &self.token_type {
            TokenType::STRING(s) => s.clone(),
            TokenType::INTEGER(n) => itoa::Buffer::new().format(*n).to_owned(),
            TokenType::FLOAT(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    format!("{:.1}", n)
                } else {
                    n.to_string()
                }
            }
            _ => "null".to_owned(),
        };

        write!(
            f,
            "{} {} {} {}:{}",
            self.token_type.name(),
            self.lexeme,
            literal,
            self.line,
            self.column
        )
    }
}
