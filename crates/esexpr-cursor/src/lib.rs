//! esexpr Cursor
//!
//! The scanning layer underneath the expression parser. A [`Cursor`] owns a
//! borrowed source buffer and a byte offset into it, and offers the handful of
//! primitives the parser is built from: non-consuming lookahead, conditional
//! consumption of literals or anchored regular expressions, whitespace
//! skipping, and positioned errors.
//!
//! # Example
//!
//! ```
//! use esexpr_cursor::Cursor;
//!
//! let mut cursor = Cursor::new("foo.bar");
//! assert_eq!(cursor.eat_identifier(), Some("foo"));
//! assert!(cursor.matches('.'));
//! assert_eq!(cursor.position(), 3);
//! ```

pub mod cursor;
pub mod pattern;

pub use cursor::{is_identifier_part, is_identifier_start, Cursor};
pub use pattern::Pattern;

/// Fatal parse error with the offset at which it was detected.
///
/// `line` and `column` are 1-based and derived from `offset`; `column` counts
/// characters, not bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Syntax error at line {line}, column {column}: {message}")]
pub struct SyntaxError {
    pub message: String,
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl SyntaxError {
    /// Build an error at `offset` into `source`.
    pub fn at(source: &str, offset: usize, message: impl Into<String>) -> Self {
        let (line, column) = cursor::location(source, offset);
        Self {
            message: message.into(),
            offset,
            line,
            column,
        }
    }
}
