//! Error types for the query endpoint.
//!
//! These cover transport failures only. Anything a client did wrong is an
//! [`Ec2Error`](ec2sim_core::Ec2Error) and travels back in the XML error
//! document instead.

use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors raised while running the endpoint.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// I/O error while serving.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A response body could not be encoded.
    #[error("XML encoding failed: {0}")]
    Xml(String),

    /// The serving task ended abnormally.
    #[error("Server task failed: {0}")]
    Task(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Internal endpoint failure");
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

/// Result type for endpoint operations.
pub type ServerResult<T> = std::result::Result<T, ServerError>;
