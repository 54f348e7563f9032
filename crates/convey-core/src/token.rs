//! Token metadata for the deferred buffer.
//!
//! A token is a tagged run of text inside one buffer snapshot. Ranges index
//! into the snapshot's backing string; they are contiguous and non-overlapping
//! in emission order. A dedicated sentinel token represents a single pending
//! "erase the last flushed line" instruction and owns no text.

use std::ops::Range;

use crate::content::{ContentType, LinkTag};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Text,
    CarriageReturn,
}

/// A tagged run of text inside the deferred buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    content_type: ContentType,
    range: Range<usize>,
    link: Option<LinkTag>,
    kind: TokenKind,
}

impl Token {
    pub(crate) fn text(content_type: ContentType, range: Range<usize>, link: Option<LinkTag>) -> Self {
        Self {
            content_type,
            range,
            link,
            kind: TokenKind::Text,
        }
    }

    /// The sentinel marking a pending erase-last-line instruction.
    ///
    /// May only appear as the first token of a drained batch.
    pub(crate) fn carriage_return() -> Self {
        Self {
            content_type: ContentType::System,
            range: 0..0,
            link: None,
            kind: TokenKind::CarriageReturn,
        }
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn link(&self) -> Option<LinkTag> {
        self.link
    }

    /// Byte range over the drained batch's backing text.
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn is_carriage_return(&self) -> bool {
        self.kind == TokenKind::CarriageReturn
    }

    /// Whether a newly printed fragment may extend this token in place.
    pub(crate) fn accepts(&self, content_type: ContentType, link: Option<LinkTag>) -> bool {
        self.kind == TokenKind::Text && self.content_type == content_type && self.link == link
    }

    pub(crate) fn extend_to(&mut self, end: usize) {
        debug_assert!(end >= self.range.end);
        self.range.end = end;
    }

    pub(crate) fn shift_left(&mut self, by: usize) {
        self.range.start -= by;
        self.range.end -= by;
    }

    pub(crate) fn truncate_to(&mut self, end: usize) {
        debug_assert!(end >= self.range.start);
        self.range.end = end;
    }
}

/// A drained buffer snapshot: the ordered token list plus the backing text.
///
/// Only the first token may be the carriage-return sentinel. An empty batch
/// short-circuits the flush pipeline entirely.
#[derive(Debug, Default)]
pub struct DrainedBatch {
    pub tokens: Vec<Token>,
    pub text: String,
}

impl DrainedBatch {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The text slice backing one token (empty for the CR sentinel).
    pub fn token_text(&self, token: &Token) -> &str {
        &self.text[token.range()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cr_sentinel_has_no_text() {
        let cr = Token::carriage_return();
        assert!(cr.is_carriage_return());
        assert!(cr.is_empty());
        assert!(!cr.accepts(ContentType::System, None));
    }

    #[test]
    fn accepts_requires_exact_match() {
        let tok = Token::text(ContentType::Normal, 0..3, Some(LinkTag(1)));
        assert!(tok.accepts(ContentType::Normal, Some(LinkTag(1))));
        assert!(!tok.accepts(ContentType::Normal, None));
        assert!(!tok.accepts(ContentType::Error, Some(LinkTag(1))));
    }
}
