//! HTTP client for the Partner Sell product management API
//!
//! This crate provides a resilient client for the partner-facing product,
//! catalog, and registration endpoints. Updates are sent as JSON Merge Patch
//! documents built with `partnersell-patch`.
//!
//! # Features
//!
//! - **Layered configuration**: defaults, a TOML file, then environment variables
//! - **Merge patch updates**: only the fields you set are sent; null clears
//! - **Retry with exponential backoff**: for idempotent methods only
//! - **Circuit breaker**: Prevent cascading failures during outages
//! - **Rate limiting**: Avoid hitting API throttling limits
//! - **Request correlation**: Track requests with unique IDs for debugging
//!
//! # Example
//!
//! ```rust,no_run
//! use partnersell_client::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = PartnerSellClient::new()?;
//!
//!     // Rename the company and drop its provider access group;
//!     // every other field is left untouched.
//!     let patch = RegistrationPatch::new()
//!         .with_name("Acme")
//!         .clear_provider_access_group();
//!     let updated = client.registrations().update("r-1", &patch).await?;
//!     println!("{} now has contact {}", updated.name, updated.contact.email);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod middleware;

pub use client::PartnerSellClient;
pub use config::{ClientConfig, Environment};
pub use error::{ApiError, ApiResult};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::client::PartnerSellClient;
    pub use crate::config::{ClientConfig, Environment};
    pub use crate::endpoints::{
        CreateRegistrationRequest, PrimaryContact, Registration, RegistrationPatch,
        RegistrationsApi,
    };
    pub use crate::error::{ApiError, ApiResult};
    pub use partnersell_patch::{Field, MergePatch};
}
