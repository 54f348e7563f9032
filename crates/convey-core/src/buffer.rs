//! The deferred token buffer.
//!
//! Everything handed to `print` lands here and stays here until the consumer
//! drains it. The buffer is the only structure producers ever touch: a short
//! critical section around append-plus-evict, guarded by one mutex. The
//! consumer takes the same lock only to drain or clear, then releases it
//! before any document work.
//!
//! The buffer is cyclic: once the configured character capacity is exceeded,
//! the oldest whole tokens are dropped. Eviction never splits a token's text;
//! the single exception is an individual fragment larger than the entire
//! capacity, which is trimmed to its trailing `capacity` characters at append
//! time.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::content::{ContentType, LinkTag};
use crate::token::{DrainedBatch, Token};

#[derive(Debug, Default)]
struct Inner {
    text: String,
    tokens: VecDeque<Token>,
    /// A `\r` erased into already-flushed territory; the next drain must
    /// start with the CR sentinel so the sink deletes the document's last line.
    pending_cr: bool,
}

/// Thread-safe cyclic accumulator of tagged text runs.
#[derive(Debug)]
pub struct TokenBuffer {
    inner: Mutex<Inner>,
    capacity: Option<usize>,
    emulate_carriage_return: bool,
    disposed: AtomicBool,
}

impl TokenBuffer {
    /// Creates a buffer with a fixed capacity (`None` = unbounded).
    ///
    /// Capacity and CR emulation are decided once here and never re-read.
    pub fn new(capacity: Option<usize>, emulate_carriage_return: bool) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity,
            emulate_carriage_return,
            disposed: AtomicBool::new(false),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Appends text under the lock. No-op once the console is disposed.
    pub fn print(&self, text: &str, content_type: ContentType, link: Option<LinkTag>) {
        if self.disposed.load(Ordering::Acquire) || text.is_empty() {
            return;
        }
        let mut inner = self.lock();
        if self.emulate_carriage_return {
            self.print_emulated(&mut inner, text, content_type, link);
        } else {
            let converted = convert_crlf(text);
            self.append(&mut inner, &converted, content_type, link);
        }
    }

    /// Splits around lone `\r` markers: each one erases the line currently
    /// being built, falling back to the CR sentinel when the erase reaches
    /// into content that was already flushed to the document.
    fn print_emulated(
        &self,
        inner: &mut Inner,
        text: &str,
        content_type: ContentType,
        link: Option<LinkTag>,
    ) {
        let converted = convert_crlf(text);
        let mut rest = converted.as_str();
        loop {
            match rest.find('\r') {
                None => {
                    self.append(inner, rest, content_type, link);
                    return;
                }
                Some(pos) => {
                    self.append(inner, &rest[..pos], content_type, link);
                    erase_current_line(inner);
                    rest = &rest[pos + 1..];
                }
            }
        }
    }

    fn append(&self, inner: &mut Inner, text: &str, content_type: ContentType, link: Option<LinkTag>) {
        if text.is_empty() {
            return;
        }
        // A fragment bigger than the whole buffer keeps only its tail.
        let mut fragment = text;
        if let Some(cap) = self.capacity
            && fragment.len() > cap
        {
            let mut cut = fragment.len() - cap;
            while !fragment.is_char_boundary(cut) {
                cut += 1;
            }
            tracing::trace!(dropped = cut, "fragment exceeds cyclic capacity, trimming head");
            fragment = &fragment[cut..];
        }

        let start = inner.text.len();
        inner.text.push_str(fragment);
        let end = inner.text.len();

        // Append-time coalescing fast path: extend the trailing token when
        // content type and link tag match exactly.
        match inner.tokens.back_mut() {
            Some(last) if last.accepts(content_type, link) && last.range().end == start => {
                last.extend_to(end);
            }
            _ => inner.tokens.push_back(Token::text(content_type, start..end, link)),
        }

        if let Some(cap) = self.capacity {
            evict_to_capacity(inner, cap);
        }
    }

    /// Currently buffered character count, without draining.
    pub fn len(&self) -> usize {
        self.lock().text.len()
    }

    pub fn is_empty(&self) -> bool {
        let inner = self.lock();
        inner.text.is_empty() && !inner.pending_cr
    }

    /// Atomically removes and returns the full ordered batch.
    ///
    /// The CR sentinel, when pending, is the first (and only sentinel) token.
    /// An empty batch must short-circuit the flush pipeline.
    pub fn drain(&self) -> DrainedBatch {
        let mut inner = self.lock();
        if inner.text.is_empty() && !inner.pending_cr {
            return DrainedBatch::default();
        }
        let mut tokens = Vec::with_capacity(inner.tokens.len() + 1);
        if inner.pending_cr {
            tokens.push(Token::carriage_return());
        }
        tokens.extend(inner.tokens.drain(..));
        let text = std::mem::take(&mut inner.text);
        inner.pending_cr = false;
        DrainedBatch { tokens, text }
    }

    /// Discards buffered content without producing output.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.text.clear();
        inner.tokens.clear();
        inner.pending_cr = false;
    }

    /// Terminal: clears the buffer and turns every later `print` into a no-op.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
        self.clear();
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned buffer lock means a panic mid-append; the data is still
        // structurally sound (String/VecDeque writes are not interleaved).
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Deletes the buffered portion of the line currently being built.
///
/// When the line extends past the buffer's start (it was partially flushed
/// already), the erase is recorded as the pending CR sentinel instead of
/// guessing at document content.
fn erase_current_line(inner: &mut Inner) {
    match inner.text.rfind('\n') {
        Some(nl) => {
            let keep = nl + 1;
            truncate_buffer(inner, keep);
        }
        None => {
            truncate_buffer(inner, 0);
            inner.pending_cr = true;
        }
    }
}

fn truncate_buffer(inner: &mut Inner, keep: usize) {
    if inner.text.len() <= keep {
        return;
    }
    inner.text.truncate(keep);
    while let Some(last) = inner.tokens.back_mut() {
        if last.range().start >= keep {
            inner.tokens.pop_back();
        } else {
            if last.range().end > keep {
                last.truncate_to(keep);
            }
            break;
        }
    }
}

/// Drops oldest whole tokens until the buffered text fits the capacity.
fn evict_to_capacity(inner: &mut Inner, capacity: usize) {
    if inner.text.len() <= capacity {
        return;
    }
    let mut drop_bytes = 0;
    while inner.text.len() - drop_bytes > capacity {
        let Some(front) = inner.tokens.front() else {
            break;
        };
        drop_bytes = front.range().end;
        inner.tokens.pop_front();
    }
    if drop_bytes > 0 {
        tracing::trace!(evicted = drop_bytes, "cyclic buffer evicted oldest tokens");
        inner.text.drain(..drop_bytes);
        for token in &mut inner.tokens {
            token.shift_left(drop_bytes);
        }
    }
}

/// `\r\n` becomes `\n` in both CR modes; only the lone `\r` treatment differs.
fn convert_crlf(text: &str) -> String {
    if text.contains("\r\n") {
        text.replace("\r\n", "\n")
    } else {
        text.to_string()
    }
}
