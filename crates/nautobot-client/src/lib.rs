//! # nautobot-client
//!
//! HTTP transport for `nautobot-reconcile`, speaking the Nautobot REST API.
//!
//! ```ignore
//! use nautobot_client::{ClientConfig, NautobotClient};
//!
//! let config = ClientConfig::new("https://nautobot.example.com", token)
//!     .with_validate_certs(false);
//! let client = NautobotClient::new(&config)?;
//! let outcome = Reconciler::new(&client, &spec).reconcile(&desired).await?;
//! ```

mod client;
mod config;
mod error;

pub use client::NautobotClient;
pub use config::{ClientConfig, DEFAULT_PAGE_SIZE, DEFAULT_TIMEOUT};
pub use error::ClientError;
