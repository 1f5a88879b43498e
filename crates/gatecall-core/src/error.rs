use anyhow::Error as AnyError;
use thiserror::Error;

/// Error produced while serving one invocation.
///
/// Every variant is recovered at the [`crate::app::App`] boundary and turned
/// into an `{"error": "<message>"}` response body; nothing here reaches the
/// runtime as a transport failure.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("{message}")]
    Decode { message: String },
    #[error("{message}")]
    Handler { message: String },
    #[error("failed to serialise response payload: {source}")]
    Serialise { source: serde_json::Error },
    #[error("internal error: {source}")]
    Internal {
        #[from]
        source: AnyError,
    },
}

impl GateError {
    pub fn decode(message: impl Into<String>) -> Self {
        GateError::Decode {
            message: message.into(),
        }
    }

    pub fn handler(message: impl Into<String>) -> Self {
        GateError::Handler {
            message: message.into(),
        }
    }

    pub(crate) fn serialise(source: serde_json::Error) -> Self {
        GateError::Serialise { source }
    }

    /// The message embedded in the error response body.
    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn source_error(&self) -> Option<&AnyError> {
        match self {
            GateError::Internal { source } => Some(source),
            _ => None,
        }
    }
}
