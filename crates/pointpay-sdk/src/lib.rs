//! QR payment confirmation for the campus points wallet.
//!
//! The payer asks the backend for a single-use payment token, shows it as a
//! QR code and waits until a merchant consumes it, the token expires or the
//! payer gives up. [`SessionController::start`] runs that wait: a one-second
//! countdown and a status poller driven by one state machine, so exactly one
//! terminal [`Outcome`] is ever reported.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pointpay_net::Config;
//! use pointpay_sdk::{HttpBackend, SessionConfig, SessionController};
//!
//! #[tokio::main]
//! async fn main() -> pointpay_sdk::Result<()> {
//!     let backend = HttpBackend::new(Config::default().with_bearer_token("jwt"))?;
//!     let controller = SessionController::new(Arc::new(backend), SessionConfig::default());
//!
//!     let mut session = controller.start(500, "Campus Store").await?;
//!     println!("show QR for token {}", session.token_id());
//!     println!("outcome: {}", session.wait().await);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod controller;
pub mod countdown;
pub mod error;
pub mod machine;
pub mod poller;
pub mod registry;
pub mod session;
pub mod token;

pub use backend::{BackendRef, HttpBackend, PaymentBackend};
pub use config::SessionConfig;
pub use controller::{SessionController, SessionHandle};
pub use error::{Result, SdkError};
pub use machine::Outcome;
pub use registry::{SessionId, SessionRegistry};
pub use session::{Session, SessionNotice, SessionSummary};
pub use token::{PaymentToken, PaymentType, PurchaseRequest, StatusResponse, TokenStatus};
