//! The output source seam.
//!
//! A source is anything that produces console output concurrently: a child
//! process, a test fixture, a network stream. The console only needs an event
//! stream to forward into `print` and, optionally, an input channel for the
//! user-input round-trip.

use tokio::sync::mpsc;

/// Which stream of the source a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceChannel {
    Stdout,
    Stderr,
}

/// One event emitted by an attached source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    /// A chunk of already-decoded text.
    Output { channel: SourceChannel, text: String },
    /// The source finished; no more output follows.
    Terminated { status: Option<i32> },
}

/// A live producer of console output.
///
/// Implementations hand their event stream over exactly once; a second
/// `events()` call returns `None`. Sources without an input channel (pure
/// output) return `None` from `input()`.
pub trait OutputSource: Send + Sync {
    /// Takes the event stream. `None` if it was already taken.
    fn events(&self) -> Option<mpsc::UnboundedReceiver<SourceEvent>>;

    /// Channel into the source's input (stdin or equivalent), if any.
    fn input(&self) -> Option<mpsc::UnboundedSender<String>>;

    /// Line terminator the source expects on its input.
    fn line_terminator(&self) -> &str {
        "\n"
    }
}
