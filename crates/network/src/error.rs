use thiserror::Error;

pub type Result<T> = std::result::Result<T, NetError>;

#[derive(Error, Debug)]
pub enum NetError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Decode error: {0}")]
    Decode(String),
}

impl NetError {
    /// Worth retrying on the next scheduled attempt: connection failures,
    /// timeouts and 5xx replies. Client errors and bad payloads are not.
    pub fn is_transient(&self) -> bool {
        match self {
            NetError::Connection(_) | NetError::Http(_) => true,
            NetError::Api { status, .. } => *status >= 500,
            NetError::Config(_) | NetError::Decode(_) => false,
        }
    }

    pub(crate) fn from_reqwest(context: &str, e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            NetError::Connection(format!("{}: {}", context, e))
        } else if e.is_decode() {
            NetError::Decode(format!("{}: {}", context, e))
        } else {
            NetError::Http(format!("{}: {}", context, e))
        }
    }
}
