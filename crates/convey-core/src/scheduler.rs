//! Flush scheduling: one ordered queue, per-class admission.
//!
//! All consumer work travels through a single mpsc channel into the one
//! worker task, so flush, clear, scroll and snapshot requests execute in the
//! order they were admitted and never concurrently with each other.
//!
//! Admission differs per class. The debounced flush holds a compare-and-set
//! "requested" flag: while a flush is pending, further requests are merged
//! into it. One-shot requests (clear, scroll-to-end, echoed-input flushes)
//! are always enqueued. Disposal cancels everything outstanding.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::document::DocumentSnapshot;
use crate::sink::{ConsoleListener, FoldingModel, Highlighter};

/// Work items delivered to the consumer task.
pub(crate) enum Request {
    /// Drain the buffer and apply the batch to the document.
    Flush,
    /// Wipe the document (the deferred buffer was already cleared).
    Clear,
    /// Flush, then stick the viewport to the last line.
    ScrollToEnd,
    /// The user scrolled away; stop tracking the end.
    CancelStickToEnd,
    /// Reply with a copy of the current document state.
    Snapshot(oneshot::Sender<DocumentSnapshot>),
    AddListener(Arc<dyn ConsoleListener>),
    SetHighlighter(Box<dyn Highlighter>),
    SetFoldingModel(Box<dyn FoldingModel>),
}

pub(crate) struct FlushScheduler {
    tx: mpsc::UnboundedSender<Request>,
    /// A debounced flush was admitted but hasn't reached the queue yet.
    flush_requested: Arc<AtomicBool>,
    /// Cancels the pending debounce timer, if any.
    pending_timer: Mutex<Option<CancellationToken>>,
    /// Console-level disposal; fells the worker and every timer.
    cancel: CancellationToken,
}

impl FlushScheduler {
    pub(crate) fn new(cancel: CancellationToken) -> (Self, mpsc::UnboundedReceiver<Request>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                flush_requested: Arc::new(AtomicBool::new(false)),
                pending_timer: Mutex::new(None),
                cancel,
            },
            rx,
        )
    }

    /// Admits a debounced flush. Deduplicated: while one is pending, further
    /// requests merge into it. A zero delay skips the timer but still goes
    /// through the dedup flag.
    pub(crate) fn request_flush(&self, delay: Duration) {
        if self.is_disposed() {
            return;
        }
        if self
            .flush_requested
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        if delay.is_zero() {
            self.flush_requested.store(false, Ordering::Release);
            let _ = self.tx.send(Request::Flush);
            return;
        }
        let timer = self.cancel.child_token();
        *self.lock_timer() = Some(timer.clone());
        let tx = self.tx.clone();
        let requested = Arc::clone(&self.flush_requested);
        tokio::spawn(async move {
            tokio::select! {
                () = timer.cancelled() => {
                    // Preempted by clear or disposal; the flag was reset there.
                }
                () = tokio::time::sleep(delay) => {
                    requested.store(false, Ordering::Release);
                    let _ = tx.send(Request::Flush);
                }
            }
        });
    }

    /// One-shot flush (echoed user input, un-pausing): never deduplicated.
    pub(crate) fn request_flush_now(&self) {
        if !self.is_disposed() {
            let _ = self.tx.send(Request::Flush);
        }
    }

    /// Cancels pending debounced flushes and enqueues a clear. One-shots
    /// already queued ahead of the clear are left alone.
    pub(crate) fn request_clear(&self) {
        if self.is_disposed() {
            return;
        }
        self.cancel_pending_flush();
        let _ = self.tx.send(Request::Clear);
    }

    pub(crate) fn request_scroll_to_end(&self) {
        if !self.is_disposed() {
            let _ = self.tx.send(Request::ScrollToEnd);
        }
    }

    pub(crate) fn send(&self, request: Request) {
        if !self.is_disposed() {
            let _ = self.tx.send(request);
        }
    }

    /// Drops the pending debounce timer and resets the admission flag.
    pub(crate) fn cancel_pending_flush(&self) {
        if let Some(timer) = self.lock_timer().take() {
            timer.cancel();
        }
        self.flush_requested.store(false, Ordering::Release);
    }

    /// Terminal: all outstanding and future requests become no-ops.
    pub(crate) fn dispose(&self) {
        self.cancel_pending_flush();
        self.cancel.cancel();
    }

    fn is_disposed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn lock_timer(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.pending_timer
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> (FlushScheduler, mpsc::UnboundedReceiver<Request>) {
        FlushScheduler::new(CancellationToken::new())
    }

    #[tokio::test(start_paused = true)]
    async fn debounced_requests_collapse_to_one() {
        let (scheduler, mut rx) = scheduler();
        for _ in 0..5 {
            scheduler.request_flush(Duration::from_millis(200));
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(matches!(rx.try_recv(), Ok(Request::Flush)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn flag_resets_after_delivery() {
        let (scheduler, mut rx) = scheduler();
        scheduler.request_flush(Duration::from_millis(200));
        tokio::time::sleep(Duration::from_millis(250)).await;
        scheduler.request_flush(Duration::from_millis(200));
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(matches!(rx.try_recv(), Ok(Request::Flush)));
        assert!(matches!(rx.try_recv(), Ok(Request::Flush)));
    }

    #[tokio::test(start_paused = true)]
    async fn one_shots_are_never_deduplicated() {
        let (scheduler, mut rx) = scheduler();
        scheduler.request_flush_now();
        scheduler.request_flush_now();
        assert!(matches!(rx.try_recv(), Ok(Request::Flush)));
        assert!(matches!(rx.try_recv(), Ok(Request::Flush)));
    }

    #[tokio::test(start_paused = true)]
    async fn clear_cancels_pending_debounced_flush() {
        let (scheduler, mut rx) = scheduler();
        scheduler.request_flush(Duration::from_millis(200));
        scheduler.request_clear();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(matches!(rx.try_recv(), Ok(Request::Clear)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_delay_still_deduplicates_at_admission() {
        let (scheduler, mut rx) = scheduler();
        scheduler.request_flush(Duration::ZERO);
        scheduler.request_flush(Duration::ZERO);
        // Each zero-delay admission delivers immediately, so both go through;
        // dedup only merges while one is actually pending.
        assert!(matches!(rx.try_recv(), Ok(Request::Flush)));
        assert!(matches!(rx.try_recv(), Ok(Request::Flush)));
    }

    #[tokio::test(start_paused = true)]
    async fn disposed_scheduler_drops_everything() {
        let (scheduler, mut rx) = scheduler();
        scheduler.request_flush(Duration::from_millis(200));
        scheduler.dispose();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(rx.try_recv().is_err());
        scheduler.request_flush_now();
        assert!(rx.try_recv().is_err());
    }
}
