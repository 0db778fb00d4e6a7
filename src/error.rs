//! Centralised error hierarchy for the **ShravScript interpreter**.
//!
//! Every stage (scanner, parser, evaluator, module loading) converts its
//! failure modes into one of the variants defined here, so the whole crate
//! shares one `Result<T>` alias and the binary can wrap it in `anyhow`.
//!
//! Compile-time variants (`Lex`, `Parse`) abort the current compilation unit.
//! Every other variant is a *runtime* error: it unwinds to the nearest
//! `try/catch`, where its display text becomes the caught message.
//!
//! The module **does not** print diagnostics itself.

use std::io;
use thiserror::Error;

use log::info;

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ShravError {
    /// Lexical (scanner) error: unrecognised character or unterminated string.
    #[error("LexError: {message} at line {line}, column {column}")]
    Lex {
        /// Human‑readable description, including the offending character.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,

        /// 1‑based column where the error occurred.
        column: usize,
    },

    /// Grammar violation reported by the parser.
    #[error("ParseError: {message} at line {line}, column {column} (got '{found}')")]
    Parse {
        /// The construct the parser expected.
        message: String,

        /// Text of the offending token.
        found: String,

        line: usize,
        column: usize,
    },

    /// Read of, or assignment to, a name bound nowhere on the scope chain.
    #[error("NameError: {0}")]
    Name(String),

    /// Invalid operand types or an invalid indexing target.
    #[error("TypeError: {0}")]
    Type(String),

    /// Missing property, method or module export.
    #[error("AttributeError: {0}")]
    Attribute(String),

    /// Calling something that is not callable (including modules).
    #[error("CallError: {0}")]
    Call(String),

    /// Native module unavailable or user module source not found.
    #[error("ModuleError: {0}")]
    Module(String),

    /// Index out of range or missing dictionary key.
    #[error("IndexError: {0}")]
    Index(String),

    /// Division or remainder by zero.
    #[error("ZeroDivisionError: {0}")]
    ZeroDivision(String),

    /// A result too large to build, such as an oversized repetition.
    #[error("OverflowError: {0}")]
    Overflow(String),

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// UTF‑8 decoding failure when ingesting external text.
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl ShravError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, column: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating Lex error: line={}, column={}, msg={}",
            line, column, message
        );

        ShravError::Lex {
            message,
            line,
            column,
        }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>, F: Into<String>>(
        line: usize,
        column: usize,
        found: F,
        msg: S,
    ) -> Self {
        let message: String = msg.into();
        let found: String = found.into();

        info!(
            "Creating Parse error: line={}, column={}, found={}, msg={}",
            line, column, found, message
        );

        ShravError::Parse {
            message,
            found,
            line,
            column,
        }
    }

    /// `NameError` for an unresolved variable.
    pub fn undefined(name: &str, line: usize) -> Self {
        ShravError::Name(format!("Undefined variable '{}' [line {}]", name, line))
    }

    /// Helper constructor for evaluator `TypeError`s.
    pub fn type_error<S: Into<String>>(line: usize, msg: S) -> Self {
        ShravError::Type(format!("{} [line {}]", msg.into(), line))
    }

    /// Lexer and parser failures abort a compilation unit; everything else is
    /// a runtime failure that `try/catch` can observe.
    pub fn is_compile_error(&self) -> bool {
        matches!(self, ShravError::Lex { .. } | ShravError::Parse { .. })
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, ShravError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_kind_and_location() {
        let err = ShravError::lex(3, 7, "Unrecognized character '$'");
        assert_eq!(
            err.to_string(),
            "LexError: Unrecognized character '$' at line 3, column 7"
        );

        let err = ShravError::parse(1, 9, "}", "Expected expression");
        assert_eq!(
            err.to_string(),
            "ParseError: Expected expression at line 1, column 9 (got '}')"
        );
        assert!(err.is_compile_error());
    }

    #[test]
    fn runtime_errors_are_not_compile_errors() {
        let err = ShravError::undefined("x", 2);
        assert_eq!(err.to_string(), "NameError: Undefined variable 'x' [line 2]");
        assert!(!err.is_compile_error());
    }
}
