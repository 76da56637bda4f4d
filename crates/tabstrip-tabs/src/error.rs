//! Tab error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TabError {
    #[error("Tab not found: {0}")]
    NotFound(i32),

    #[error("Invalid load state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Tab {0} has been destroyed")]
    Destroyed(i32),

    #[error("Session history index out of range: {index} (len {len})")]
    HistoryIndex { index: usize, len: usize },
}
