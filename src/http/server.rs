//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router that feeds every request to the dispatch core
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener with graceful shutdown
//! - Hand WebSocket upgrades to the stream bridge

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ws::WebSocketUpgrade, ConnectInfo, FromRequestParts, State},
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use super::{request, response, websocket};
use crate::config::ServerConfig;
use crate::routing::{Connection, Router as DispatchRouter};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<DispatchRouter>,
    pub stream_buffer: usize,
}

/// HTTP server driving a dispatch router.
pub struct HttpServer {
    app: Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Create a new HTTP server serving `router` with the given configuration.
    pub fn new(config: ServerConfig, router: DispatchRouter) -> Self {
        let state = AppState {
            router: Arc::new(router),
            stream_buffer: config.listener.stream_buffer,
        };

        let app = Self::build_router(&config, state);
        Self { app, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(dispatch_handler))
            .route("/", any(dispatch_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered Axum router, for in-process use.
    pub fn app(&self) -> Router {
        self.app.clone()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run the server until `shutdown` fires, then drain in-flight connections.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.app.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Entry point for every request: classify, dispatch, finish.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request_id = request::request_id(request.headers()).to_string();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    tracing::debug!(
        request_id = %request_id,
        peer = ?peer,
        method = %request.method(),
        path = %request.uri().path(),
        "Dispatching request"
    );

    if request::is_stream_upgrade(request.headers()) {
        let (mut parts, _body) = request.into_parts();
        return match WebSocketUpgrade::from_request_parts(&mut parts, &state).await {
            Ok(upgrade) => {
                websocket::serve(
                    Arc::clone(&state.router),
                    parts.uri.path(),
                    state.stream_buffer,
                    upgrade,
                )
                .await
            }
            Err(rejection) => {
                tracing::debug!(request_id = %request_id, "Invalid WebSocket handshake");
                rejection.into_response()
            }
        };
    }

    let mut conn = Connection::http(request);
    let result = state.router.dispatch(&mut conn).await;
    response::finish(&mut conn, result)
}
