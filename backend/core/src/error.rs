use serde_json::{json, Value};
use thiserror::Error;

use crate::response::FunctionResponse;

/// Top-level error type for fnrelay functions.
///
/// Every variant maps to one HTTP status and one JSON error body, so handlers
/// can bubble failures up with `?` and convert once at the edge.
#[derive(Debug, Error)]
pub enum FunctionError {
    /// Malformed or incomplete input from the caller.
    #[error("{0}")]
    ClientInput(String),

    /// The token delegate rejected the caller. Carries the delegate's body.
    #[error("User is not valid or authentication failed")]
    Unauthorized { auth_response: Value },

    /// The token delegate could not be reached or answered garbage.
    #[error("Invalid response from auth server: {0}")]
    DelegateCommunication(String),

    /// A content store upload failed. `stored_ids` lists what was stored
    /// before the failure.
    #[error("Storage upload failed for '{filename}': {message}")]
    Storage {
        filename: String,
        message: String,
        stored_ids: Vec<String>,
    },

    #[error("Method Not Allowed")]
    MethodNotAllowed,

    /// An upstream service other than storage or the delegate failed.
    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl FunctionError {
    pub fn client(message: impl Into<String>) -> Self {
        Self::ClientInput(message.into())
    }

    pub fn status(&self) -> u16 {
        match self {
            Self::ClientInput(_) => 400,
            Self::Unauthorized { .. } => 401,
            Self::MethodNotAllowed => 405,
            Self::Storage { .. } | Self::Upstream(_) => 502,
            Self::DelegateCommunication(_) | Self::Internal(_) => 500,
        }
    }

    pub fn body(&self) -> Value {
        match self {
            Self::Unauthorized { auth_response } => json!({
                "error": self.to_string(),
                "auth_response": auth_response,
            }),
            Self::Storage { stored_ids, .. } => json!({
                "error": self.to_string(),
                "file_ids": stored_ids,
            }),
            other => json!({ "error": other.to_string() }),
        }
    }

    pub fn into_response(self) -> FunctionResponse {
        if self.status() >= 500 {
            tracing::error!(error = %self, status = self.status(), "Function failed");
        } else {
            tracing::warn!(error = %self, status = self.status(), "Request rejected");
        }
        FunctionResponse::json(self.status(), self.body())
    }
}

impl From<FunctionError> for FunctionResponse {
    fn from(error: FunctionError) -> Self {
        error.into_response()
    }
}
