//! Response envelope for outer surfaces (HTTP handlers, IPC commands).

use serde::{Deserialize, Serialize};

use crate::ports::RepositoryError;

/// Uniform result wrapper: either `data` or a status code with messages.
///
/// ```rust
/// use memento_core::{MementoResponse, RepositoryError};
///
/// let ok = MementoResponse::ok(3);
/// assert!(ok.success);
/// assert_eq!(ok.status_code, 200);
///
/// let err = MementoResponse::<i32>::from_error(&RepositoryError::NotFound("gone".into()));
/// assert_eq!(err.status_code, 404);
/// assert_eq!(err.errors, ["gone"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MementoResponse<T> {
    pub success: bool,
    pub status_code: u16,
    pub message: Option<String>,
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl<T> MementoResponse<T> {
    /// Successful response carrying `data`.
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            status_code: 200,
            message: None,
            data: Some(data),
            errors: Vec::new(),
        }
    }

    /// Successful response with a message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Failed response built from a repository error.
    pub fn from_error(error: &RepositoryError) -> Self {
        Self {
            success: false,
            status_code: error.status_code(),
            message: Some(error.kind().to_string()),
            data: None,
            errors: error.messages(),
        }
    }

    /// Response from an operation result.
    pub fn from_result(result: Result<T, RepositoryError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => Self::from_error(&err),
        }
    }
}
