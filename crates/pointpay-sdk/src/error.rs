use thiserror::Error;

use crate::registry::SessionId;
use crate::token::TokenStatus;

pub type Result<T> = std::result::Result<T, SdkError>;

#[derive(Error, Debug)]
pub enum SdkError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Token request failed; no session was created.
    #[error("Token issuance failed: {0}")]
    Issuance(String),

    /// A single status check failed. Logged by the poller, never surfaced
    /// from a running session.
    #[error("Status check failed: {0}")]
    TransientPoll(String),

    #[error("Network error: {0}")]
    Network(#[from] pointpay_net::NetError),

    #[error("Invalid token transition: {from:?} -> {to:?}")]
    InvalidTransition { from: TokenStatus, to: TokenStatus },

    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),
}
