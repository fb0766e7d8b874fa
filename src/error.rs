//! Error types
//!
//! Every error here is recoverable: the operation that produced it left the
//! buffer untouched.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewerError {
    #[error("Line reference could not be resolved: {0}")]
    UnresolvedLine(String),

    #[error("Invalid position {line}:{ch}")]
    InvalidPosition { line: usize, ch: usize },

    #[error("Invalid line range {start}..={end}")]
    InvalidRange { start: usize, end: usize },

    #[error("No emulator attached")]
    NoEmulator,

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ViewerError>;
