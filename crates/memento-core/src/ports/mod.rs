//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the repository services expect from
//! infrastructure. They contain no implementation details and use only
//! domain types.
//!
//! # Design Rules
//!
//! - No `sqlx` types in any signature
//! - Stores are query/commit shaped; business rules live in services
//! - Backend errors travel as `anyhow::Error` and are never rewritten

pub mod localizer;
pub mod model_store;

use strum_macros::Display;
use thiserror::Error;

pub use localizer::{Localizer, NoopLocalizer, format_template};
pub use model_store::{BoundQuery, ModelStore};

/// Classification of a failed operation, mirrored on HTTP status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    InternalServerError,
}

impl ErrorKind {
    /// The HTTP status code for this kind.
    pub const fn status_code(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::InternalServerError => 500,
        }
    }
}

/// Errors returned by repository operations.
///
/// Storage failures are kept as the backend's `anyhow::Error`, so callers
/// can still downcast to the concrete error (e.g. `sqlx::Error`).
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The requested model does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The validation hook rejected the input.
    #[error("Invalid: {}", .0.join("; "))]
    Invalid(Vec<String>),

    /// Storage backend error, propagated unmodified.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl RepositoryError {
    /// Validation failure with a single message.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(vec![message.into()])
    }

    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Invalid(_) => ErrorKind::BadRequest,
            Self::Storage(_) => ErrorKind::InternalServerError,
        }
    }

    pub const fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Human-readable messages carried by the error.
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::NotFound(message) => vec![message.clone()],
            Self::Invalid(messages) => messages.clone(),
            Self::Storage(err) => vec![err.to_string()],
        }
    }
}
