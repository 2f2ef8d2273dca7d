//! # ec2sim - A Fake EC2 Endpoint
//!
//! ec2sim is an in-memory stand-in for the EC2 query API. Tests point an
//! unmodified client at a local URL and get realistic security-group and
//! instance behaviour without touching a real account.
//!
//! ## Features
//!
//! - **Security groups**: create, delete, describe, authorize and revoke ingress
//! - **Instances**: run, terminate and describe, with reservations
//! - **Filters**: the provider's `Filter.N.Name` / `Filter.N.Value.M` language
//! - **Observability**: events, per-action metrics and a request journal
//!
//! ## Quick Start
//!
//! ```no_run
//! use ec2sim::prelude::*;
//!
//! # async fn run() -> Result<(), Ec2SimError> {
//! let runtime = Ec2Sim::builder()
//!     .with_store_config(StoreConfig::default().with_owner_id("123456789012"))
//!     .build()?;
//!
//! // In-process, no sockets involved
//! let reply = runtime.call(vec![
//!     ("Action", "CreateSecurityGroup"),
//!     ("GroupName", "web"),
//!     ("GroupDescription", "web tier"),
//! ]);
//! assert!(reply.is_success());
//!
//! // Or over HTTP
//! let server = runtime.start().await?;
//! println!("point your client at {}", server.url());
//! server.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                   Your test suite                       │
//! ├─────────────────────────────────────────────────────────┤
//! │                    ec2sim (facade)                      │
//! │                  ┌─────────────────┐                    │
//! │                  │  Ec2Sim Builder │                    │
//! │                  └────────┬────────┘                    │
//! │                           │                             │
//! │  ┌───────────────┬────────┴───────┬────────────────┐    │
//! │  │ ec2sim-server │ ec2sim-core    │ ec2sim-observe │    │
//! │  │ (HTTP, XML,   │ (store,        │ (events,       │    │
//! │  │  dispatch)    │  rules)        │  metrics)      │    │
//! │  └───────────────┴────────────────┴────────────────┘    │
//! ├─────────────────────────────────────────────────────────┤
//! │                     axum + tokio                        │
//! └─────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use ec2sim_core::{IntoShared, ResourceStore, SharedStore, StoreConfig};
use ec2sim_observe::{ActionJournal, EventSubscriber, MetricsCollector};
use ec2sim_server::{Dispatcher, QueryParams, Reply, ServerConfig, ServerHandle};
use tracing::info;

// Re-export from sub-crates
pub use ec2sim_core;
pub use ec2sim_filter;
pub use ec2sim_observe;
pub use ec2sim_server;

/// Main entry point for ec2sim.
pub struct Ec2Sim;

impl Ec2Sim {
    /// Create a new runtime builder.
    pub fn builder() -> Ec2SimBuilder {
        Ec2SimBuilder::new()
    }

    /// Create a runtime with the default configuration.
    pub fn with_defaults() -> Result<Ec2SimRuntime, Ec2SimError> {
        Ec2SimBuilder::new().build()
    }
}

/// Builder for configuring an ec2sim runtime.
pub struct Ec2SimBuilder {
    store_config: StoreConfig,
    server_config: ServerConfig,
    event_subscribers: Vec<Arc<dyn EventSubscriber>>,
}

impl Ec2SimBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            store_config: StoreConfig::default(),
            server_config: ServerConfig::default(),
            event_subscribers: Vec::new(),
        }
    }

    /// Replace the store configuration.
    pub fn with_store_config(mut self, config: StoreConfig) -> Self {
        self.store_config = config;
        self
    }

    /// Replace the endpoint configuration.
    pub fn with_server_config(mut self, config: ServerConfig) -> Self {
        self.server_config = config;
        self
    }

    /// Set the address [`Ec2SimRuntime::start`] binds.
    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.server_config.bind_address = addr;
        self
    }

    /// Set the account id that owns every resource.
    pub fn with_owner_id(mut self, owner_id: impl Into<String>) -> Self {
        self.store_config.owner_id = owner_id.into();
        self
    }

    /// Add an event subscriber.
    pub fn with_event_subscriber(mut self, subscriber: Arc<dyn EventSubscriber>) -> Self {
        self.event_subscribers.push(subscriber);
        self
    }

    /// Build the runtime.
    pub fn build(self) -> Result<Ec2SimRuntime, Ec2SimError> {
        let owner = &self.store_config.owner_id;
        if owner.is_empty() || !owner.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Ec2SimError::Config(format!(
                "owner id {:?} must be a non-empty string of digits",
                owner
            )));
        }

        let store = ResourceStore::new(self.store_config).into_shared();
        let dispatcher = Dispatcher::new(Arc::clone(&store), self.server_config.journal_capacity);
        for subscriber in self.event_subscribers {
            dispatcher.events().subscribe(subscriber);
        }

        Ok(Ec2SimRuntime {
            store,
            dispatcher: Arc::new(dispatcher),
            server_config: self.server_config,
        })
    }
}

impl Default for Ec2SimBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A configured ec2sim runtime.
///
/// The runtime owns one store. Calls made in-process and requests served
/// over HTTP by [`start`](Self::start) see the same state.
pub struct Ec2SimRuntime {
    store: SharedStore,
    dispatcher: Arc<Dispatcher>,
    server_config: ServerConfig,
}

impl Ec2SimRuntime {
    /// The resource store.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// The request dispatcher.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn journal(&self) -> &Arc<ActionJournal> {
        self.dispatcher.journal()
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        self.dispatcher.metrics()
    }

    pub fn server_config(&self) -> &ServerConfig {
        &self.server_config
    }

    /// Handle one request in-process, exactly as the HTTP endpoint would.
    pub fn call(&self, params: impl Into<QueryParams>) -> Reply {
        self.dispatcher.handle(params.into())
    }

    /// Forget every group, instance, journal entry and metric.
    pub fn reset(&self) {
        self.store.reset();
        self.dispatcher.journal().clear();
        self.dispatcher.metrics().reset();
        info!("Reset runtime");
    }

    /// Bind the HTTP endpoint and serve in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start(&self) -> Result<RunningServer, Ec2SimError> {
        let handle = ec2sim_server::serve(Arc::clone(&self.dispatcher), &self.server_config).await?;
        Ok(RunningServer { handle })
    }
}

impl std::fmt::Debug for Ec2SimRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ec2SimRuntime")
            .field("store", &self.store)
            .field("server_config", &self.server_config)
            .finish()
    }
}

/// An HTTP endpoint started by [`Ec2SimRuntime::start`].
///
/// Dropping it stops the endpoint.
#[derive(Debug)]
pub struct RunningServer {
    handle: ServerHandle,
}

impl RunningServer {
    /// Base URL to configure clients with.
    pub fn url(&self) -> String {
        self.handle.url()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.handle.local_addr()
    }

    /// Stop the endpoint and wait for in-flight requests.
    pub async fn shutdown(self) -> Result<(), Ec2SimError> {
        Ok(self.handle.shutdown().await?)
    }

    /// Run until the endpoint stops on its own.
    pub async fn wait(self) -> Result<(), Ec2SimError> {
        Ok(self.handle.wait().await?)
    }
}

/// Errors from the ec2sim runtime.
#[derive(Debug, thiserror::Error)]
pub enum Ec2SimError {
    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Endpoint error.
    #[error("Server error: {0}")]
    Server(#[from] ec2sim_server::ServerError),
}

/// Prelude module for convenient imports.
pub mod prelude {
    // Main types
    pub use crate::{Ec2Sim, Ec2SimBuilder, Ec2SimError, Ec2SimRuntime, RunningServer};

    // Core types
    pub use ec2sim_core::{
        Ec2Error, ErrorCode, GroupId, GroupRef, Instance, InstanceId, InstanceStateName,
        IpPermissionSpec, ResourceStore, RevokePolicy, RunInstancesParams, SecurityGroup,
        StoreConfig, UserGroupRef,
    };

    // Filter types
    pub use ec2sim_filter::{Filter, GroupFilter, InstanceFilter};

    // Endpoint types
    pub use ec2sim_server::{Action, Ec2Response, QueryParams, Reply, ServerConfig};

    // Observability types
    pub use ec2sim_observe::{
        ActionJournal, ActionRecord, CollectingSubscriber, Ec2Event, EventSubscriber,
        LoggingSubscriber, MetricsCollector, MetricsSnapshot,
    };

    // Common std types
    pub use std::sync::Arc;
}
