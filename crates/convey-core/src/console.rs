//! The console facade.
//!
//! `ConsoleView` is the public entry point: producers call `print` from any
//! task, a single worker task owns the document and applies flushes, and the
//! two meet only at the token buffer's mutex and the request queue. The
//! worker is spawned at construction, so a `ConsoleView` must be created
//! inside a tokio runtime.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::buffer::TokenBuffer;
use crate::config::ConsoleConfig;
use crate::content::{ContentType, LinkTag};
use crate::document::{ConsoleDocument, DocumentSnapshot};
use crate::error::{AttachError, SendInputError};
use crate::normalize::normalize;
use crate::scheduler::{FlushScheduler, Request};
use crate::sink::{ConsoleListener, DocumentSink, FoldingModel, Highlighter};
use crate::source::{OutputSource, SourceChannel, SourceEvent};
use crate::state::ConsoleState;

/// A deferred-output console: cyclic token buffer in front, debounced flush
/// pipeline behind, one consumer task owning the document.
#[derive(Clone)]
pub struct ConsoleView {
    shared: Arc<Shared>,
}

struct Shared {
    buffer: TokenBuffer,
    scheduler: FlushScheduler,
    state: Mutex<ConsoleState>,
    paused: AtomicBool,
    flush_delay: Duration,
}

impl ConsoleView {
    pub fn new(config: &ConsoleConfig) -> Self {
        let capacity = config.cycle_buffer_capacity();
        let cancel = CancellationToken::new();
        let (scheduler, rx) = FlushScheduler::new(cancel.clone());
        let shared = Arc::new(Shared {
            buffer: TokenBuffer::new(capacity, config.emulate_carriage_return),
            scheduler,
            state: Mutex::new(ConsoleState::Detached),
            paused: AtomicBool::new(false),
            flush_delay: config.flush_delay(),
        });
        tokio::spawn(run_worker(
            Arc::clone(&shared),
            rx,
            cancel,
            DocumentSink::new(ConsoleDocument::new(capacity)),
        ));
        Self { shared }
    }

    /// Buffers text and schedules a flush. Never blocks on document work.
    pub fn print(&self, text: &str, content_type: ContentType) {
        self.shared.print(text, content_type, None);
    }

    /// `print` with a hyperlink tag; the tag survives coalescing as its own
    /// highlighter run.
    pub fn print_linked(&self, text: &str, content_type: ContentType, link: LinkTag) {
        self.shared.print(text, content_type, Some(link));
    }

    /// Discards deferred output and wipes the document.
    ///
    /// The buffer is emptied immediately on the caller's task; the document
    /// wipe is queued behind whatever the worker is already doing.
    pub fn clear(&self) {
        self.shared.buffer.clear();
        self.shared.scheduler.request_clear();
    }

    /// Flushes everything deferred and sticks the viewport to the last line.
    pub fn request_scroll_to_end(&self) {
        self.shared.scheduler.request_scroll_to_end();
    }

    /// The user scrolled away; new output stops moving the viewport until
    /// the next explicit scroll-to-end.
    pub fn cancel_stick_to_end(&self) {
        self.shared.scheduler.send(Request::CancelStickToEnd);
    }

    /// While paused, flush requests still queue but apply nothing; output
    /// keeps accumulating (and cycling) in the buffer. Un-pausing flushes.
    pub fn set_output_paused(&self, paused: bool) {
        self.shared.paused.store(paused, Ordering::Release);
        if !paused {
            self.shared.scheduler.request_flush_now();
        }
    }

    pub fn is_output_paused(&self) -> bool {
        self.shared.paused.load(Ordering::Acquire)
    }

    /// Whether any printed text is still waiting in the deferred buffer.
    pub fn has_deferred_output(&self) -> bool {
        !self.shared.buffer.is_empty()
    }

    /// Flushed plus deferred size, in characters.
    pub async fn content_size(&self) -> usize {
        let flushed = self.snapshot().await.map_or(0, |s| s.text.len());
        flushed + self.shared.buffer.len()
    }

    /// Forces a flush and waits for it to land.
    ///
    /// The queue is ordered, so the snapshot reply doubles as the barrier.
    pub async fn flush(&self) -> Option<DocumentSnapshot> {
        self.shared.scheduler.request_flush_now();
        self.snapshot().await
    }

    /// Read-only copy of the document as the worker currently sees it.
    /// `None` once the console is disposed.
    pub async fn snapshot(&self) -> Option<DocumentSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.shared.scheduler.send(Request::Snapshot(tx));
        rx.await.ok()
    }

    /// Attaches a source and starts forwarding its output into `print`.
    /// Stdout maps to `Normal`, stderr to `Error`.
    pub fn attach(&self, source: Arc<dyn OutputSource>) -> Result<(), AttachError> {
        if self.shared.buffer.is_disposed() {
            return Err(AttachError::Disposed);
        }
        let mut state = self.shared.lock_state();
        if state.is_attached() {
            return Err(AttachError::AlreadyAttached);
        }
        let Some(events) = source.events() else {
            return Err(AttachError::SourceExhausted);
        };
        let running = Arc::new(AtomicBool::new(true));
        let forwarder = CancellationToken::new();
        let terminated = CancellationToken::new();
        tokio::spawn(forward_events(
            Arc::clone(&self.shared),
            events,
            Arc::clone(&running),
            forwarder.clone(),
            terminated.clone(),
        ));
        *state = ConsoleState::Attached {
            source,
            running,
            forwarder,
            terminated,
        };
        Ok(())
    }

    /// Waits until the attached source is gone: it terminated, its stream
    /// closed, or the console was detached or disposed. Returns immediately
    /// while detached.
    pub async fn wait_terminated(&self) {
        let token = self.shared.lock_state().terminated();
        if let Some(token) = token {
            token.cancelled().await;
        }
    }

    /// Stops forwarding and drops the source. Already-buffered output still
    /// flushes normally.
    pub fn detach(&self) {
        self.shared.lock_state().detach();
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock_state().is_running()
    }

    /// Delivers text to the attached source's input, translating the line
    /// terminator to whatever the source expects.
    pub fn send_input(&self, text: &str) -> Result<(), SendInputError> {
        let state = self.shared.lock_state();
        let Some(source) = state.source() else {
            return Err(SendInputError::NotRunning);
        };
        if !state.is_running() {
            return Err(SendInputError::NotRunning);
        }
        let Some(input) = source.input() else {
            return Err(SendInputError::NoInputChannel);
        };
        let terminator = source.line_terminator();
        let payload = if terminator == "\n" {
            text.to_string()
        } else {
            text.replace('\n', terminator)
        };
        input.send(payload).map_err(|_| SendInputError::Closed)
    }

    pub fn add_listener(&self, listener: Arc<dyn ConsoleListener>) {
        self.shared.scheduler.send(Request::AddListener(listener));
    }

    pub fn set_highlighter(&self, highlighter: Box<dyn Highlighter>) {
        self.shared.scheduler.send(Request::SetHighlighter(highlighter));
    }

    pub fn set_folding_model(&self, folding: Box<dyn FoldingModel>) {
        self.shared.scheduler.send(Request::SetFoldingModel(folding));
    }

    /// Tears the console down: buffer, worker, timers, forwarding. Idempotent;
    /// every later operation is a no-op.
    pub fn dispose(&self) {
        self.shared.buffer.dispose();
        self.shared.scheduler.dispose();
        self.shared.lock_state().detach();
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.buffer.is_disposed()
    }
}

impl Shared {
    /// The producer half of `print`: buffer append plus flush admission.
    fn print(&self, text: &str, content_type: ContentType, link: Option<LinkTag>) {
        if self.buffer.is_disposed() || text.is_empty() {
            return;
        }
        self.buffer.print(text, content_type, link);
        if content_type.is_user_input() {
            // Echoed input must appear before the response it provokes.
            self.scheduler.request_flush_now();
        } else if self
            .buffer
            .capacity()
            .is_some_and(|cap| self.buffer.len() >= cap)
        {
            self.scheduler.request_flush(Duration::ZERO);
        } else {
            self.scheduler.request_flush(self.flush_delay);
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ConsoleState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// The consumer task. Owns the sink; processes requests strictly in order.
async fn run_worker(
    shared: Arc<Shared>,
    mut rx: mpsc::UnboundedReceiver<Request>,
    cancel: CancellationToken,
    mut sink: DocumentSink,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            request = rx.recv() => {
                let Some(request) = request else { break };
                handle_request(&shared, &mut sink, request);
            }
        }
    }
    tracing::debug!("console worker stopped");
}

fn handle_request(shared: &Shared, sink: &mut DocumentSink, request: Request) {
    match request {
        Request::Flush => flush_deferred(shared, sink),
        Request::Clear => sink.clear(),
        Request::ScrollToEnd => {
            flush_deferred(shared, sink);
            sink.document_mut().scroll_to_end();
        }
        Request::CancelStickToEnd => sink.document_mut().cancel_stick_to_end(),
        Request::Snapshot(reply) => {
            let _ = reply.send(sink.document().snapshot());
        }
        Request::AddListener(listener) => sink.add_listener(listener),
        Request::SetHighlighter(highlighter) => sink.set_highlighter(highlighter),
        Request::SetFoldingModel(folding) => sink.set_folding_model(folding),
    }
}

fn flush_deferred(shared: &Shared, sink: &mut DocumentSink) {
    if shared.paused.load(Ordering::Acquire) {
        return;
    }
    let batch = shared.buffer.drain();
    if batch.is_empty() {
        return;
    }
    sink.apply(normalize(&batch));
}

/// Forwarding task for an attached source. Terminated sources flip the
/// running flag and force a final flush so trailing output appears promptly.
async fn forward_events(
    shared: Arc<Shared>,
    mut events: mpsc::UnboundedReceiver<SourceEvent>,
    running: Arc<AtomicBool>,
    cancel: CancellationToken,
    terminated: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            event = events.recv() => {
                match event {
                    Some(SourceEvent::Output { channel, text }) => {
                        let content_type = match channel {
                            SourceChannel::Stdout => ContentType::Normal,
                            SourceChannel::Stderr => ContentType::Error,
                        };
                        shared.print(&text, content_type, None);
                    }
                    Some(SourceEvent::Terminated { status }) => {
                        tracing::debug!(?status, "attached source terminated");
                        running.store(false, Ordering::Release);
                        shared.scheduler.request_flush_now();
                        terminated.cancel();
                        break;
                    }
                    None => {
                        running.store(false, Ordering::Release);
                        terminated.cancel();
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn console() -> ConsoleView {
        ConsoleView::new(&ConsoleConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn print_is_deferred_until_the_delay_elapses() {
        let console = console();
        console.print("hello", ContentType::Normal);
        assert!(console.has_deferred_output());
        tokio::time::sleep(Duration::from_millis(250)).await;
        let snapshot = console.snapshot().await.unwrap();
        assert_eq!(snapshot.text, "hello");
        assert!(!console.has_deferred_output());
    }

    #[tokio::test(start_paused = true)]
    async fn user_input_flushes_without_waiting() {
        let console = console();
        let snapshot = {
            console.print("> ls", ContentType::UserInput);
            // No sleep: the one-shot flush is already queued ahead of us.
            console.snapshot().await.unwrap()
        };
        assert_eq!(snapshot.text, "> ls");
    }

    #[tokio::test(start_paused = true)]
    async fn paused_console_defers_indefinitely() {
        let console = console();
        console.set_output_paused(true);
        console.print("held", ContentType::Normal);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(console.has_deferred_output());
        assert_eq!(console.snapshot().await.unwrap().text, "");

        console.set_output_paused(false);
        let snapshot = console.snapshot().await.unwrap();
        assert_eq!(snapshot.text, "held");
    }

    #[tokio::test(start_paused = true)]
    async fn clear_discards_deferred_and_flushed() {
        let console = console();
        console.print("old\n", ContentType::Normal);
        console.flush().await;
        console.print("pending", ContentType::Normal);
        console.clear();
        let snapshot = console.snapshot().await.unwrap();
        assert_eq!(snapshot.text, "");
        assert!(!console.has_deferred_output());
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_makes_everything_a_noop() {
        let console = console();
        console.dispose();
        console.print("lost", ContentType::Normal);
        assert!(!console.has_deferred_output());
        assert!(console.snapshot().await.is_none());
        assert!(matches!(
            console.send_input("x"),
            Err(SendInputError::NotRunning)
        ));
        console.dispose();
    }

    #[tokio::test(start_paused = true)]
    async fn content_size_counts_both_halves() {
        let console = console();
        console.print("abc", ContentType::Normal);
        console.flush().await;
        console.set_output_paused(true);
        console.print("de", ContentType::Normal);
        assert_eq!(console.content_size().await, 5);
    }
}
