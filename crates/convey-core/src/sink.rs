//! Applying refined batches to the document.
//!
//! The sink runs exclusively on the consumer task. It owns the document, the
//! registered listeners, and the external highlighting/folding collaborators.
//! Text insertion always happens before any fallible collaborator call, so a
//! collaborator failure can never roll back document content.

use std::collections::HashSet;
use std::sync::Arc;

use crate::coalesce::coalesce;
use crate::content::{ContentType, LinkTag};
use crate::document::{ConsoleDocument, HighlighterRange};
use crate::error::CollaboratorError;
use crate::normalize::RefinedBatch;

/// External hyperlink/syntax subsystem, invoked once per coalesced run.
pub trait Highlighter: Send {
    fn apply(
        &mut self,
        start: usize,
        end: usize,
        content_type: ContentType,
        link: Option<LinkTag>,
    ) -> Result<(), CollaboratorError>;
}

/// External folding policy, invoked over the freshly inserted line range.
pub trait FoldingModel: Send {
    fn update_foldings(&mut self, start_line: usize, end_line: usize)
    -> Result<(), CollaboratorError>;
}

/// Observer of console content changes, notified once per flush.
pub trait ConsoleListener: Send + Sync {
    fn content_added(&self, content_types: &HashSet<ContentType>);
    fn text_added(&self, text: &str, content_type: ContentType);
}

/// Owns the document and fans out flush results.
pub struct DocumentSink {
    document: ConsoleDocument,
    highlighter: Option<Box<dyn Highlighter>>,
    folding: Option<Box<dyn FoldingModel>>,
    listeners: Vec<Arc<dyn ConsoleListener>>,
}

impl DocumentSink {
    pub fn new(document: ConsoleDocument) -> Self {
        Self {
            document,
            highlighter: None,
            folding: None,
            listeners: Vec::new(),
        }
    }

    pub fn document(&self) -> &ConsoleDocument {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut ConsoleDocument {
        &mut self.document
    }

    pub fn set_highlighter(&mut self, highlighter: Box<dyn Highlighter>) {
        self.highlighter = Some(highlighter);
    }

    pub fn set_folding_model(&mut self, folding: Box<dyn FoldingModel>) {
        self.folding = Some(folding);
    }

    pub fn add_listener(&mut self, listener: Arc<dyn ConsoleListener>) {
        self.listeners.push(listener);
    }

    /// Applies one refined batch: CR erase, bounded backspace erase, insert,
    /// highlighter runs, collaborator callbacks, listener fan-out, scroll.
    pub fn apply(&mut self, refined: RefinedBatch) {
        if refined.is_empty() {
            return;
        }
        // Captured before mutation; cancellation only lasts one update.
        let stuck = self.document.is_stuck_to_end();

        if refined.starts_with_cr {
            self.document.delete_last_full_line();
        }
        if refined.backspace_prefix_len > 0 {
            self.document.delete_trailing(refined.backspace_prefix_len);
        }

        let runs = coalesce(refined.tokens);
        let added: String = runs
            .iter()
            .flat_map(|run| run.parts.iter())
            .map(|part| part.text.as_str())
            .collect();
        let (insert_start, _) = self.document.insert_at_end(&added);

        let mut offset = insert_start;
        for run in &runs {
            let range = HighlighterRange {
                start: offset,
                end: offset + run.len(),
                content_type: run.content_type,
                link: run.link,
            };
            offset = range.end;
            self.document.add_highlighter(range.clone());
            if let Some(highlighter) = self.highlighter.as_mut()
                && let Err(error) =
                    highlighter.apply(range.start, range.end, range.content_type, range.link)
            {
                tracing::warn!(%error, "highlighter failed; flush continues");
            }
        }

        let cut = self.document.trim_to_capacity();
        if let Some(folding) = self.folding.as_mut() {
            let start_line = self.document.line_at(insert_start.saturating_sub(cut));
            let end_line = self.document.line_count().saturating_sub(1);
            if let Err(error) = folding.update_foldings(start_line, end_line) {
                tracing::warn!(%error, "folding update failed; flush continues");
            }
        }

        let content_types: HashSet<ContentType> =
            runs.iter().map(|run| run.content_type).collect();
        if !content_types.is_empty() {
            for listener in &self.listeners {
                notify_isolated(|| listener.content_added(&content_types));
            }
        }
        for listener in &self.listeners {
            notify_isolated(|| {
                for run in &runs {
                    for part in &run.parts {
                        listener.text_added(&part.text, part.content_type);
                    }
                }
            });
        }

        if stuck {
            self.document.scroll_to_end();
        }
    }

    /// The console-level clear: document text, highlighters and foldings go.
    pub fn clear(&mut self) {
        self.document.clear();
        if let Some(folding) = self.folding.as_mut()
            && let Err(error) = folding.update_foldings(0, 0)
        {
            tracing::warn!(%error, "folding reset failed on clear");
        }
    }
}

/// Invokes one listener, containing any panic it raises.
///
/// A listener failing must not starve the other listeners, the stick-to-end
/// scroll, or the consumer task itself.
fn notify_isolated<F: FnOnce()>(notify: F) {
    if std::panic::catch_unwind(std::panic::AssertUnwindSafe(notify)).is_err() {
        tracing::warn!("console listener panicked; flush continues");
    }
}
