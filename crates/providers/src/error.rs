use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider stream error: {message}")]
    Stream { message: String },

    #[error("no default AI provider configured")]
    NoDefaultProvider,

    #[error("unknown AI provider: {id}")]
    UnknownProvider { id: String },
}

impl Error {
    #[must_use]
    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
