//! Crate-level error type.

use dynakit_model::EngineError;

use crate::expression::ExpressionError;
use crate::stream::StreamError;

/// Any failure surfaced by this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Building an expression failed before anything was sent.
    #[error(transparent)]
    Expression(#[from] ExpressionError),
    /// The engine rejected or failed a request.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// A stream processing run failed.
    #[error(transparent)]
    Stream(#[from] StreamError),
}

impl Error {
    /// Whether the same call may succeed if retried later.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Engine(e) | Self::Stream(StreamError::Engine(e)) => e.is_retryable(),
            Self::Expression(_) | Self::Stream(_) => false,
        }
    }
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, Error>;
