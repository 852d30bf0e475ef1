//! # tabload-link: ingestion client for the remote tabular store
//!
//! The only crate that talks HTTP. Implements the
//! [`tabload_core::IngestionApi`] contract against a PostgREST-style
//! REST surface:
//!
//! ```rust,no_run
//! use tabload_link::{RestClient, StoreAuth};
//!
//! let client = RestClient::builder()
//!     .base_url("https://store.example.com")
//!     .auth(StoreAuth::service_key("service-role-key"))
//!     .timeout(std::time::Duration::from_secs(30))
//!     .build()?;
//! # Ok::<(), tabload_core::ApiError>(())
//! ```

pub mod auth;
pub mod client;

pub use auth::StoreAuth;
pub use client::{RestClient, RestClientBuilder};
