//! Core error type.
//!
//! Sub-crates define their own error enums and wrap `CoreError` as one
//! variant where a core lookup can fail.

use thiserror::Error;

/// Errors raised by `tn-core` parsing helpers.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown road class {0:?}")]
    UnknownRoadClass(String),

    #[error("invalid id {0:?}")]
    InvalidId(String),
}

/// Shorthand result type for `tn-core`.
pub type CoreResult<T> = Result<T, CoreError>;
