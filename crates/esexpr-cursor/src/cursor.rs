use unicode_xid::UnicodeXID;

use crate::pattern::Pattern;
use crate::SyntaxError;

/// Read position over an immutable source buffer.
///
/// All offsets are byte offsets into `source`. The cursor only ever advances
/// across whole characters, so `position()` is always a char boundary.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Create a cursor at the start of `source`.
    pub fn new(source: &'a str) -> Self {
        Self { source, pos: 0 }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    /// The unread part of the source.
    pub fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    pub fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Non-consuming lookahead.
    pub fn matches<P: Pattern>(&self, pattern: P) -> bool {
        pattern.match_len(self.rest()).is_some()
    }

    /// Consume `pattern` if it matches at the current position.
    pub fn eat<P: Pattern>(&mut self, pattern: P) -> Option<&'a str> {
        let len = pattern.match_len(self.rest())?;
        let start = self.pos;
        self.pos += len;
        Some(&self.source[start..self.pos])
    }

    /// Consume `pattern` or fail with "expected {label}".
    pub fn expect<P: Pattern>(&mut self, pattern: P, label: &str) -> Result<&'a str, SyntaxError> {
        match self.eat(pattern) {
            Some(text) => Ok(text),
            None => Err(self.fail(format!("expected {label}"))),
        }
    }

    /// Consume the longest run of characters satisfying `pred`.
    pub fn eat_while(&mut self, pred: impl Fn(char) -> bool) -> Option<&'a str> {
        let start = self.pos;
        let len = self
            .rest()
            .char_indices()
            .find(|&(_, c)| !pred(c))
            .map_or(self.rest().len(), |(i, _)| i);
        self.pos += len;
        (len > 0).then(|| &self.source[start..self.pos])
    }

    /// Skip whitespace. Line terminators are only skipped when
    /// `include_newlines` is set.
    pub fn skip_whitespace(&mut self, include_newlines: bool) {
        self.eat_while(|c| c.is_whitespace() && (include_newlines || !is_line_terminator(c)));
    }

    /// Consume an identifier name (keywords included).
    pub fn eat_identifier(&mut self) -> Option<&'a str> {
        let word = self.peek_word()?;
        self.pos += word.len();
        Some(word)
    }

    /// The identifier name at the current position, without consuming it.
    pub fn peek_word(&self) -> Option<&'a str> {
        let rest = self.rest();
        let mut chars = rest.char_indices();
        match chars.next() {
            Some((_, c)) if is_identifier_start(c) => {}
            _ => return None,
        }
        let len = chars
            .find(|&(_, c)| !is_identifier_part(c))
            .map_or(rest.len(), |(i, _)| i);
        Some(&rest[..len])
    }

    /// Build a fatal error positioned at the cursor.
    pub fn fail(&self, message: impl Into<String>) -> SyntaxError {
        self.error_at(self.pos, message)
    }

    /// Build a fatal error positioned at `offset`.
    pub fn error_at(&self, offset: usize, message: impl Into<String>) -> SyntaxError {
        SyntaxError::at(self.source, offset, message)
    }

    /// 1-based line and column of `offset`.
    pub fn location(&self, offset: usize) -> (usize, usize) {
        location(self.source, offset)
    }
}

pub(crate) fn location(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = source.get(..offset).unwrap_or(source);
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}

fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

pub fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '$' || c == '_' || (!c.is_ascii() && c.is_xid_start())
}

pub fn is_identifier_part(c: char) -> bool {
    is_identifier_start(c)
        || c.is_ascii_digit()
        || (!c.is_ascii() && c.is_xid_continue())
        || c == '\u{200c}'
        || c == '\u{200d}'
}
