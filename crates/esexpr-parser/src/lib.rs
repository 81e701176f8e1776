//! esexpr Parser
//!
//! Parses JavaScript expressions into ESTree-shaped [`Expression`] trees:
//! literals, identifiers, member and call chains with optional chaining,
//! arrays, `new`, update, unary, binary, logical and conditional expressions,
//! and comma sequences.
//!
//! # Example
//!
//! ```
//! use esexpr_parser::ast::ExprKind;
//!
//! let expr = esexpr_parser::parse("a?.b.c").unwrap();
//! assert!(matches!(expr.kind, ExprKind::Chain { .. }));
//! assert_eq!((expr.span.start, expr.span.end), (0, 6));
//! ```

pub mod ast;
pub mod expr_parser;
pub mod precedence;

pub use ast::{ExprKind, Expression, LiteralValue, Span};
pub use esexpr_cursor::SyntaxError;
pub use expr_parser::ExprParser;

/// Default for [`ParseOptions::max_depth`].
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Caller-supplied limits for a single parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Reject sources longer than this many bytes before scanning.
    pub max_source_len: Option<usize>,
    /// Maximum number of nested productions (groups, arrays, operands,
    /// operators) open at once. Deeper input fails with
    /// "expression nested too deeply".
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_source_len: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ParseOptions {
    pub fn with_max_source_len(mut self, max: usize) -> Self {
        self.max_source_len = Some(max);
        self
    }

    pub fn with_max_depth(mut self, max: usize) -> Self {
        self.max_depth = max;
        self
    }
}

/// Parse a complete expression (a top-level comma sequence).
pub fn parse(source: &str) -> Result<Expression, SyntaxError> {
    ExprParser::parse(source)
}

/// Parse with explicit [`ParseOptions`].
pub fn parse_with(source: &str, options: &ParseOptions) -> Result<Expression, SyntaxError> {
    ExprParser::parse_with(source, options)
}
