//! Per-request error taxonomy.
//!
//! Configuration faults (frozen-route mutation, error handlers below 400,
//! malformed assertion patterns) are programming errors and panic at
//! registration or boot time. Everything that can go wrong while serving a
//! single request flows through [`HandleError`] instead, up to the single
//! recovery boundary in [`App::handle`](crate::App::handle), which maps it
//! to the 500 handler.

use crate::injector::InjectError;
use std::error::Error;
use thiserror::Error;

/// Boxed error type used at the transport and body boundaries.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Any failure raised while dispatching one request.
#[derive(Error, Debug)]
pub enum HandleError {
    /// A handler, converter or error-handler parameter could not be resolved.
    #[error(transparent)]
    Inject(#[from] InjectError),

    /// The request body was requested a second time.
    #[error("request body has already been consumed")]
    BodyConsumed,

    /// The request body could not be read from the transport.
    #[error("failed to read request body: {0}")]
    Body(#[source] BoxError),

    /// The request body could not be decoded into the requested type.
    #[error("failed to decode request body: {0}")]
    Decode(#[source] BoxError),

    /// Failure raised by application code.
    #[error("{0}")]
    Other(#[source] BoxError),
}

impl HandleError {
    /// Wraps an arbitrary application error.
    pub fn other(error: impl Into<BoxError>) -> Self {
        HandleError::Other(error.into())
    }

    pub(crate) fn body(error: impl Into<BoxError>) -> Self {
        HandleError::Body(error.into())
    }

    pub(crate) fn decode(error: impl Into<BoxError>) -> Self {
        HandleError::Decode(error.into())
    }
}

impl From<serde_json::Error> for HandleError {
    fn from(error: serde_json::Error) -> Self {
        HandleError::decode(error)
    }
}
