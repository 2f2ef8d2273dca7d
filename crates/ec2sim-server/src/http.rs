//! The HTTP endpoint.
//!
//! Clients `POST /` a form-encoded body or `GET /?Action=...`; both land in
//! the same handler. Requests are answered synchronously from the store, so
//! the handler never holds a lock across an await point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{RawQuery, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use bytes::Bytes;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use ec2sim_observe::RequestId;

use crate::config::ServerConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{ServerError, ServerResult};
use crate::params::QueryParams;
use crate::response::Reply;

const XML_CONTENT_TYPE: &str = "text/xml;charset=UTF-8";

/// Build the endpoint router.
pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/", get(handle_query).post(handle_query))
        .with_state(dispatcher)
}

async fn handle_query(
    State(dispatcher): State<Arc<Dispatcher>>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Response {
    match QueryParams::parse(query.as_deref(), &body) {
        Ok(params) => dispatcher.handle(params).into_response(),
        // The body could not even be decoded; there is no action to dispatch.
        Err(err) => Reply {
            request_id: RequestId::new(),
            action: String::new(),
            result: Err(err),
        }
        .into_response(),
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let status = if self.is_success() {
            StatusCode::OK
        } else {
            StatusCode::BAD_REQUEST
        };
        match self.to_xml() {
            Ok(body) => (status, [(header::CONTENT_TYPE, XML_CONTENT_TYPE)], body).into_response(),
            Err(err) => err.into_response(),
        }
    }
}

/// A running endpoint.
///
/// Dropping the handle stops the server as if [`shutdown`](Self::shutdown)
/// had been called, without waiting for it.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

impl ServerHandle {
    /// The bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Base URL clients should send requests to.
    pub fn url(&self) -> String {
        format!("http://{}/", self.local_addr)
    }

    /// Stop accepting requests and wait for in-flight ones to finish.
    pub async fn shutdown(self) -> ServerResult<()> {
        // The receiver is gone only if the server already stopped.
        let _ = self.shutdown.send(());
        Self::join(self.task).await
    }

    /// Wait for the server to stop on its own.
    pub async fn wait(self) -> ServerResult<()> {
        let Self { shutdown, task, .. } = self;
        let result = Self::join(task).await;
        drop(shutdown);
        result
    }

    async fn join(task: JoinHandle<std::io::Result<()>>) -> ServerResult<()> {
        task.await
            .map_err(|err| ServerError::Task(err.to_string()))?
            .map_err(ServerError::from)
    }
}

/// Bind `config.bind_address` and serve `dispatcher` in the background.
pub async fn serve(dispatcher: Arc<Dispatcher>, config: &ServerConfig) -> ServerResult<ServerHandle> {
    let addr = config.bind_address;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    serve_listener(dispatcher, listener)
}

/// Serve `dispatcher` on an already bound listener.
pub fn serve_listener(
    dispatcher: Arc<Dispatcher>,
    listener: TcpListener,
) -> ServerResult<ServerHandle> {
    let local_addr = listener.local_addr()?;
    let (shutdown, signal) = oneshot::channel::<()>();
    let app = router(dispatcher);

    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = signal.await;
                debug!("Shutdown signal received");
            })
            .await
    });
    info!(%local_addr, "Endpoint listening");

    Ok(ServerHandle {
        local_addr,
        shutdown,
        task,
    })
}
