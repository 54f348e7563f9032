//! The consumer-owned text document.
//!
//! All mutation happens on the single consumer task; producers never see this
//! type. The document keeps its own highlighter ranges and performs its own
//! cyclic trimming, because the flush pipeline has to reason about the
//! boundary between already-flushed and deferred text for backspace and CR
//! correctness.

use crate::content::{ContentType, LinkTag};

/// A highlighter range over the document, tagged with its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlighterRange {
    pub start: usize,
    pub end: usize,
    pub content_type: ContentType,
    pub link: Option<LinkTag>,
}

/// Read-only copy of the document state, handed out through `snapshot()`.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    pub text: String,
    pub highlighters: Vec<HighlighterRange>,
    pub stuck_to_end: bool,
}

/// Line-aware append-mostly text store with highlighter bookkeeping.
#[derive(Debug)]
pub struct ConsoleDocument {
    text: String,
    highlighters: Vec<HighlighterRange>,
    cyclic_capacity: Option<usize>,
    /// Caret/viewport tracks the last line; new output keeps scrolling.
    stuck_to_end: bool,
}

impl ConsoleDocument {
    pub fn new(cyclic_capacity: Option<usize>) -> Self {
        Self {
            text: String::new(),
            highlighters: Vec::new(),
            cyclic_capacity,
            stuck_to_end: true,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn highlighters(&self) -> &[HighlighterRange] {
        &self.highlighters
    }

    /// Zero-based line count; an empty document has no lines and a trailing
    /// newline opens a new (empty) last line.
    pub fn line_count(&self) -> usize {
        if self.text.is_empty() {
            0
        } else {
            self.text.matches('\n').count() + 1
        }
    }

    /// Line index containing `offset`.
    pub fn line_at(&self, offset: usize) -> usize {
        let clamped = offset.min(self.text.len());
        self.text[..clamped].matches('\n').count()
    }

    /// Start offset of the line currently being built.
    pub fn last_line_start(&self) -> usize {
        self.text.rfind('\n').map_or(0, |i| i + 1)
    }

    /// Deletes the last full line, newline included.
    ///
    /// "Full" means the last line that actually carries text: a trailing
    /// newline does not shield the line before it. This is the CR sentinel's
    /// erase operation.
    pub fn delete_last_full_line(&mut self) {
        if self.text.is_empty() {
            return;
        }
        let search_end = if self.text.ends_with('\n') {
            self.text.len() - 1
        } else {
            self.text.len()
        };
        let start = self.text[..search_end].rfind('\n').map_or(0, |i| i + 1);
        self.delete_suffix_from(start);
    }

    /// Deletes up to `count` trailing characters, never crossing into prior
    /// lines and never past the document start.
    ///
    /// `count` is a character count (the backspace carry), so the cut point
    /// is found by walking characters back from the end, not by byte math.
    pub fn delete_trailing(&mut self, count: usize) {
        if count == 0 || self.text.is_empty() {
            return;
        }
        let floor = self.last_line_start();
        let start = self.text[floor..]
            .char_indices()
            .rev()
            .take(count)
            .last()
            .map_or(self.text.len(), |(i, _)| floor + i);
        self.delete_suffix_from(start);
    }

    fn delete_suffix_from(&mut self, start: usize) {
        if start >= self.text.len() {
            return;
        }
        self.text.truncate(start);
        self.highlighters.retain_mut(|h| {
            h.end = h.end.min(start);
            h.start < h.end
        });
    }

    /// Appends text at the end, returning the inserted range.
    pub fn insert_at_end(&mut self, text: &str) -> (usize, usize) {
        let start = self.text.len();
        self.text.push_str(text);
        (start, self.text.len())
    }

    pub fn add_highlighter(&mut self, range: HighlighterRange) {
        if range.start < range.end {
            self.highlighters.push(range);
        }
    }

    /// Drops whole lines from the front until the document fits its
    /// capacity, returning the number of bytes removed. Highlighter ranges
    /// are shifted; emptied ones are removed.
    pub fn trim_to_capacity(&mut self) -> usize {
        let Some(cap) = self.cyclic_capacity else {
            return 0;
        };
        if self.text.len() <= cap {
            return 0;
        }
        let min_cut = self.text.len() - cap;
        let cut = match self
            .text
            .char_indices()
            .find_map(|(i, c)| (c == '\n' && i + 1 >= min_cut).then_some(i + 1))
        {
            Some(cut) => cut,
            None => {
                // One huge line; cut inside it at a char boundary.
                let mut cut = min_cut;
                while !self.text.is_char_boundary(cut) {
                    cut += 1;
                }
                cut
            }
        };
        self.text.drain(..cut);
        self.highlighters.retain_mut(|h| {
            h.start = h.start.saturating_sub(cut);
            h.end = h.end.saturating_sub(cut);
            h.start < h.end
        });
        cut
    }

    /// Wipes text and highlighters; the stuck-to-end state survives a clear.
    pub fn clear(&mut self) {
        self.text.clear();
        self.highlighters.clear();
    }

    pub fn is_stuck_to_end(&self) -> bool {
        self.stuck_to_end
    }

    pub fn scroll_to_end(&mut self) {
        self.stuck_to_end = true;
    }

    /// The user scrolled away; stop tracking the last line until an explicit
    /// scroll-to-end request.
    pub fn cancel_stick_to_end(&mut self) {
        self.stuck_to_end = false;
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            text: self.text.clone(),
            highlighters: self.highlighters.clone(),
            stuck_to_end: self.stuck_to_end,
        }
    }
}
