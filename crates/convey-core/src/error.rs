//! Error types for the console pipeline.
//!
//! All failures here are recoverable by design: a disposed console turns
//! operations into no-ops, and input delivery reports why it couldn't happen
//! instead of aborting anything.

use std::fmt;

/// Why `send_input` could not deliver text to the attached source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendInputError {
    /// No source is attached, or the attached source already finished.
    NotRunning,
    /// The source is output-only (no stdin or equivalent).
    NoInputChannel,
    /// The source's input channel closed underneath us.
    Closed,
}

impl fmt::Display for SendInputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendInputError::NotRunning => write!(f, "console is not attached to a running source"),
            SendInputError::NoInputChannel => write!(f, "attached source has no input channel"),
            SendInputError::Closed => write!(f, "input channel closed"),
        }
    }
}

impl std::error::Error for SendInputError {}

/// Why a source could not be attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachError {
    /// `attach` is only legal from the detached state.
    AlreadyAttached,
    /// The source's event stream was already taken by someone else.
    SourceExhausted,
    /// The console was disposed.
    Disposed,
}

impl fmt::Display for AttachError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachError::AlreadyAttached => write!(f, "console is already attached to a source"),
            AttachError::SourceExhausted => write!(f, "source event stream was already taken"),
            AttachError::Disposed => write!(f, "console has been disposed"),
        }
    }
}

impl std::error::Error for AttachError {}

/// Error reported by a highlighting or folding collaborator.
///
/// A collaborator failing never rolls back the text insertion; the flush
/// completes without that collaborator's side effect.
#[derive(Debug)]
pub struct CollaboratorError {
    message: String,
}

impl CollaboratorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CollaboratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CollaboratorError {}
