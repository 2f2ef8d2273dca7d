//! ec2sim Query Endpoint
//!
//! This crate puts an [`ResourceStore`](ec2sim_core::ResourceStore) behind
//! the provider's query protocol, so an unmodified client library can be
//! pointed at a local URL. It includes:
//!
//! - [`QueryParams`]: raw form/query pairs and numbered-list regrouping
//! - [`Ec2Request`]: decoding and validation of every supported action
//! - [`Dispatcher`]: runs a request against the store and records events,
//!   metrics and a journal entry
//! - [`xml`]: the response and error documents
//! - [`router`] / [`serve`]: the axum HTTP endpoint
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐  POST /   ┌──────────────┐  Ec2Request  ┌──────────────┐
//! │   client   │──────────▶│ axum router  │─────────────▶│  Dispatcher  │
//! └────────────┘           └──────────────┘              └──────┬───────┘
//!        ▲                                                      │
//!        │            XML document (200 / 400)                  ▼
//!        └─────────────────────────────────────────────  ResourceStore
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ec2sim_core::prelude::*;
//! use ec2sim_server::{Dispatcher, ServerConfig, serve};
//!
//! # async fn run() -> ec2sim_server::ServerResult<()> {
//! let store = ResourceStore::default_store().into_shared();
//! let dispatcher = Arc::new(Dispatcher::new(store, 1024));
//! let handle = serve(dispatcher, &ServerConfig::default()).await?;
//! println!("endpoint at {}", handle.url());
//! handle.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod params;
pub mod request;
pub mod response;
pub mod xml;

// Re-export main types
pub use config::ServerConfig;
pub use dispatcher::Dispatcher;
pub use error::{ServerError, ServerResult};
pub use http::{ServerHandle, router, serve, serve_listener};
pub use params::QueryParams;
pub use request::{Action, Ec2Request};
pub use response::{Ec2Response, Reply};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::ServerConfig;
    pub use crate::dispatcher::Dispatcher;
    pub use crate::error::{ServerError, ServerResult};
    pub use crate::http::{ServerHandle, router, serve};
    pub use crate::params::QueryParams;
    pub use crate::request::{Action, Ec2Request};
    pub use crate::response::{Ec2Response, Reply};
}
