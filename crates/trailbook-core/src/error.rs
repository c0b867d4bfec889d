//! Error types for graph access.

use thiserror::Error;

/// Errors raised by graph lookups and mutations.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The referenced entry does not exist (or was already removed).
    #[error("no such reference: {path}")]
    ReferenceNotFound { path: String },

    /// A moment or session id could not be resolved.
    #[error("no such location: {location}")]
    LocationNotFound { location: String },
}
