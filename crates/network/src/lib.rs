//! Typed JSON client for the campus points wallet API.
//!
//! ```rust,no_run
//! use pointpay_net::{ApiClient, Config};
//!
//! #[tokio::main]
//! async fn main() -> pointpay_net::Result<()> {
//!     let config = Config::default()
//!         .with_base_url("http://localhost:8080/api")
//!         .with_bearer_token("jwt");
//!     let client = ApiClient::new(config)?;
//!
//!     let status: serde_json::Value = client.get_data("/mahasiswa/payment/token/abc/status").await?;
//!     println!("{}", status);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod http_client;

pub use config::{Config, DEFAULT_API_BASE_URL};
pub use error::{NetError, Result};
pub use http_client::{ApiClient, ApiResponse};

pub fn api_client(base_url: &str) -> Result<ApiClient> {
    ApiClient::new(Config::default().with_base_url(base_url))
}
