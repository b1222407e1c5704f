use thiserror::Error;

/// Application-wide error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or out-of-range input. The message is shown to the client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The identifier does not resolve to a stored poll.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Raw failure reported by the document store.
    #[error("Database error: {0}")]
    Database(String),

    /// A store failure with a client-facing message attached.
    ///
    /// Only `message` leaves the process; `detail` is logged.
    #[error("{message}: {detail}")]
    Internal { message: String, detail: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Attach the generic message a client sees when the store fails.
    ///
    /// Validation and not-found errors keep their own message.
    pub fn with_public_message(self, message: &str) -> Self {
        match self {
            AppError::Database(detail) => AppError::Internal {
                message: message.to_string(),
                detail,
            },
            other => other,
        }
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}
