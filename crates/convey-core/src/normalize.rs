//! Control-character normalization over a drained batch.
//!
//! Terminal-like sources embed backspaces that must delete the character
//! before them. Deletions are only applied to the line currently being built:
//! a backspace that lands at the start of an output line never bleeds across
//! the newline. Backspaces that can't be resolved inside the batch are carried
//! token-by-token towards the batch start; whatever survives at the front is
//! reported to the caller as the number of already-flushed document characters
//! to delete before inserting.
//!
//! This is a pure algorithm; the sink applies the result to the document.

use crate::content::{ContentType, LinkTag};
use crate::token::{DrainedBatch, Token};

const BACKSPACE: char = '\u{8}';

/// A token after backspace resolution, owning its final text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefinedToken {
    pub text: String,
    pub content_type: ContentType,
    pub link: Option<LinkTag>,
}

/// The result of normalizing one drained batch.
#[derive(Debug, Default)]
pub struct RefinedBatch {
    /// Chronologically ordered tokens with backspaces resolved.
    pub tokens: Vec<RefinedToken>,
    /// Characters of already-flushed document text to delete before
    /// inserting (the sink clamps this to the document's last line).
    pub backspace_prefix_len: usize,
    /// The batch began with the CR sentinel: the document's last line must
    /// be deleted before anything else happens.
    pub starts_with_cr: bool,
}

impl RefinedBatch {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.backspace_prefix_len == 0 && !self.starts_with_cr
    }

    /// The concatenated text to insert at the document's end.
    pub fn raw_text(&self) -> String {
        let total = self.tokens.iter().map(|t| t.text.len()).sum();
        let mut out = String::with_capacity(total);
        for token in &self.tokens {
            out.push_str(&token.text);
        }
        out
    }
}

/// Resolves the CR sentinel and embedded backspaces in a drained batch.
pub fn normalize(batch: &DrainedBatch) -> RefinedBatch {
    if batch.is_empty() {
        return RefinedBatch::default();
    }
    let starts_with_cr = batch.tokens[0].is_carriage_return();
    let start = usize::from(starts_with_cr);
    let (tokens, backspace_prefix_len) = evaluate_backspaces(&batch.tokens[start..], batch);
    RefinedBatch {
        tokens,
        backspace_prefix_len,
        starts_with_cr,
    }
}

/// Right-to-left backspace evaluation with a carry between tokens.
///
/// For each token, newest first: append the carried-over backspaces to the
/// end of its text, collapse same-line backspaces, then strip the literal
/// backspace prefix that remains as the carry for the token before it.
/// The carry surviving past the oldest token is returned to the caller.
fn evaluate_backspaces(tokens: &[Token], batch: &DrainedBatch) -> (Vec<RefinedToken>, usize) {
    let mut refined = Vec::with_capacity(tokens.len());
    let mut carry = 0usize;
    for token in tokens.iter().rev() {
        let mut text = String::with_capacity(token.len() + carry);
        text.push_str(batch.token_text(token));
        for _ in 0..carry {
            text.push(BACKSPACE);
        }
        let collapsed = collapse_same_line_backspaces(&text);
        let prefix = collapsed.chars().take_while(|c| *c == BACKSPACE).count();
        carry = prefix;
        // BACKSPACE is a single byte, so the prefix length is a byte offset.
        let rest = &collapsed[prefix..];
        if !rest.is_empty() {
            refined.push(RefinedToken {
                text: rest.to_string(),
                content_type: token.content_type(),
                link: token.link(),
            });
        }
    }
    refined.reverse();
    (refined, carry)
}

/// Collapses backspaces that have a same-line character to delete.
///
/// A backspace that is the first character of its output line (start of
/// text, right after `\n`, or stacked on another retained backspace) is kept
/// as a literal marker; every other backspace deletes itself and the
/// character before it.
fn collapse_same_line_backspaces(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == BACKSPACE {
            match out.chars().next_back() {
                None | Some('\n') | Some(BACKSPACE) => out.push(c),
                Some(_) => {
                    out.pop();
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::TokenBuffer;

    fn batch_of(parts: &[(&str, ContentType)]) -> DrainedBatch {
        let buffer = TokenBuffer::new(None, true);
        for (text, ct) in parts {
            buffer.print(text, *ct, None);
        }
        buffer.drain()
    }

    #[test]
    fn backspace_deletes_previous_char() {
        let batch = batch_of(&[("abc\u{8}def", ContentType::Normal)]);
        let refined = normalize(&batch);
        assert_eq!(refined.raw_text(), "abdef");
        assert_eq!(refined.backspace_prefix_len, 0);
    }

    #[test]
    fn backspace_does_not_cross_newline() {
        let batch = batch_of(&[("ab\n\u{8}cd", ContentType::Normal)]);
        let refined = normalize(&batch);
        // First-in-line backspace stays literal mid-text.
        assert_eq!(refined.raw_text(), "ab\n\u{8}cd");
    }

    #[test]
    fn leading_backspaces_surface_as_prefix() {
        let batch = batch_of(&[("\u{8}\u{8}xy", ContentType::Normal)]);
        let refined = normalize(&batch);
        assert_eq!(refined.raw_text(), "xy");
        assert_eq!(refined.backspace_prefix_len, 2);
    }

    #[test]
    fn carry_resolves_against_previous_token() {
        let batch = batch_of(&[("ab", ContentType::Normal), ("\u{8}\u{8}cd", ContentType::Error)]);
        let refined = normalize(&batch);
        assert_eq!(refined.raw_text(), "cd");
        assert_eq!(refined.backspace_prefix_len, 0);
        assert_eq!(refined.tokens.len(), 1);
        assert_eq!(refined.tokens[0].content_type, ContentType::Error);
    }

    #[test]
    fn carry_partially_consumed() {
        let batch = batch_of(&[("a", ContentType::Normal), ("\u{8}\u{8}z", ContentType::Error)]);
        let refined = normalize(&batch);
        // One backspace ate "a"; the other survives to the document.
        assert_eq!(refined.raw_text(), "z");
        assert_eq!(refined.backspace_prefix_len, 1);
    }

    #[test]
    fn carry_stops_at_line_boundary_in_previous_token() {
        let batch = batch_of(&[("x\n", ContentType::Normal), ("\u{8}y", ContentType::Error)]);
        let refined = normalize(&batch);
        // The carried backspace lands right after the newline and stays put.
        assert_eq!(refined.raw_text(), "x\n\u{8}y");
        assert_eq!(refined.backspace_prefix_len, 0);
    }

    #[test]
    fn emptied_token_is_dropped() {
        let batch = batch_of(&[("ab", ContentType::Normal), ("\u{8}\u{8}", ContentType::Error)]);
        let refined = normalize(&batch);
        assert!(refined.tokens.is_empty());
        assert_eq!(refined.backspace_prefix_len, 0);
    }

    #[test]
    fn cr_sentinel_is_consumed() {
        let buffer = TokenBuffer::new(None, true);
        buffer.print("\rreplacement", ContentType::Normal, None);
        let refined = normalize(&buffer.drain());
        assert!(refined.starts_with_cr);
        assert_eq!(refined.raw_text(), "replacement");
    }

    #[test]
    fn empty_batch_normalizes_empty() {
        let refined = normalize(&DrainedBatch::default());
        assert!(refined.is_empty());
    }

    #[test]
    fn token_order_is_chronological() {
        let batch = batch_of(&[("one", ContentType::Normal), ("two", ContentType::Error)]);
        let refined = normalize(&batch);
        assert_eq!(refined.tokens[0].text, "one");
        assert_eq!(refined.tokens[1].text, "two");
    }

    #[test]
    fn multibyte_neighbors_survive_collapse() {
        let batch = batch_of(&[("héé\u{8}o", ContentType::Normal)]);
        let refined = normalize(&batch);
        assert_eq!(refined.raw_text(), "héo");
    }
}
