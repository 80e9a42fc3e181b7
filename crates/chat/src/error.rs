use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Channel(#[from] streambot_channels::Error),

    #[error(transparent)]
    Provider(#[from] streambot_providers::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// A card callback was refused by the callback chain.
    #[error("card callback rejected: {reason}")]
    CallbackRejected { reason: String },

    /// The AI task ended abnormally.
    #[error("AI task failed: {source}")]
    Join {
        #[from]
        source: tokio::task::JoinError,
    },

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl std::fmt::Display) -> Self {
        Self::Message {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn rejected(reason: impl std::fmt::Display) -> Self {
        Self::CallbackRejected {
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
