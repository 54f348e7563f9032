//! Deferred console output pipeline (buffer, normalize, flush, document).

pub mod buffer;
pub mod coalesce;
pub mod config;
pub mod console;
pub mod content;
pub mod document;
pub mod error;
pub mod normalize;
pub mod process;
mod scheduler;
pub mod sink;
pub mod source;
mod state;
pub mod token;

pub use config::ConsoleConfig;
pub use console::ConsoleView;
pub use content::{ContentType, LinkTag};
pub use document::DocumentSnapshot;
pub use error::{AttachError, CollaboratorError, SendInputError};
pub use process::ProcessSource;
pub use sink::{ConsoleListener, FoldingModel, Highlighter};
pub use source::{OutputSource, SourceChannel, SourceEvent};
