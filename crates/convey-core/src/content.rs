//! Content classification for printed text.
//!
//! Every fragment handed to the console carries a [`ContentType`] tag and an
//! optional [`LinkTag`]. The built-in kinds form a closed enum; externally
//! registered kinds use the opaque `Custom` tag. The core never interprets
//! these beyond equality: they drive coalescing boundaries, highlighter runs,
//! and listener notification.

use std::fmt;

/// Tag describing what kind of output a text fragment is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// Regular process output (stdout).
    Normal,
    /// Error output (stderr).
    Error,
    /// Messages produced by the console itself.
    System,
    /// Input typed by the user, echoed back into the console.
    UserInput,
    /// Externally registered content kind, opaque to the core.
    Custom(u16),
}

impl ContentType {
    /// Whether this fragment is echoed user input.
    ///
    /// User input bypasses the debounce delay so the echo appears immediately.
    pub fn is_user_input(self) -> bool {
        matches!(self, ContentType::UserInput)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentType::Normal => write!(f, "normal"),
            ContentType::Error => write!(f, "error"),
            ContentType::System => write!(f, "system"),
            ContentType::UserInput => write!(f, "user_input"),
            ContentType::Custom(id) => write!(f, "custom({id})"),
        }
    }
}

/// Opaque handle minted by the external hyperlink subsystem.
///
/// The core only compares tags for equality: two adjacent tokens coalesce
/// only when both content type and link tag match exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkTag(pub u64);
