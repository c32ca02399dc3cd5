//! Switchyard server binary.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request        ┌──────────────────────────────────────────────────┐
//!     ──────────────────────┼─▶ http::server ──▶ routing::Router::dispatch     │
//!                           │        │                 │                       │
//!                           │        │ upgrade         ├─▶ HTTP route handler  │
//!                           │        ▼                 ├─▶ stream route handler│
//!                           │   http::websocket ◀──────┤    (StreamSession)    │
//!                           │                          └─▶ mount ──▶ sub-app   │
//!                           │                                 └─▶ Adapter      │
//!     Client Response       │                                  (blocking app)  │
//!     ◀─────────────────────┼── http::response (outcome → status)              │
//!                           │                                                  │
//!                           │   config · observability · lifecycle             │
//!                           └──────────────────────────────────────────────────┘
//! ```
//!
//! The binary serves a small demo application so the dispatch paths can be
//! exercised with curl and a WebSocket client.

use std::path::PathBuf;

use axum::body::{Body, Bytes};
use axum::http::{Request, Response};
use axum::response::IntoResponse;
use clap::Parser;
use tokio::net::TcpListener;

use switchyard::config::{self, ServerConfig};
use switchyard::lifecycle::{signals, Shutdown};
use switchyard::observability::{logging, metrics};
use switchyard::routing::BoxError;
use switchyard::{Flow, HandlerError, HandlerResult, HttpServer, Mountable, PathParams, Router};
use switchyard::StreamSession;

#[derive(Parser)]
#[command(name = "switchyard")]
#[command(about = "Async connection server with first-match routing", long_about = None)]
struct Cli {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => ServerConfig::default(),
    };

    if let Err(err) = logging::init(&config.observability) {
        eprintln!("logging already initialized: {err}");
    }

    tracing::info!("switchyard v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        stream_buffer = config.listener.stream_buffer,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let router = demo_router(&config)?;
    tracing::info!(routes = router.routes().len(), "Router built");

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(config, router);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn demo_router(config: &ServerConfig) -> Result<Router, switchyard::routing::PatternError> {
    let mut tacos = Router::with_config(config.routing.clone());
    tacos.route("/", list_tacos)?;
    tacos.route("/{pk:int}", show_taco)?;

    let mut router = Router::with_config(config.routing.clone());
    router.route("/", index)?;
    router.route("/greet/{name}", greet)?;
    router.route("/home", |_req, _params| async {
        Ok::<_, HandlerError>(Flow::redirect("/"))
    })?;
    router.stream_route("/echo", echo)?;
    router.include(&tacos, "/tacos")?;
    router.mount("/legacy", Mountable::blocking(legacy))?;
    Ok(router)
}

async fn index(_req: Request<Body>, _params: PathParams) -> HandlerResult<Response<Body>> {
    Ok("switchyard is running\n".into_response())
}

async fn greet(_req: Request<Body>, params: PathParams) -> HandlerResult<Response<Body>> {
    let name = params.get("name").unwrap_or("stranger");
    Ok(format!("Hello, {name}!\n").into_response())
}

async fn list_tacos(_req: Request<Body>, _params: PathParams) -> HandlerResult<Response<Body>> {
    Ok("al pastor, carnitas, barbacoa\n".into_response())
}

async fn show_taco(_req: Request<Body>, params: PathParams) -> HandlerResult<Response<Body>> {
    let pk: u64 = params
        .parse("pk")
        .ok_or_else(|| HandlerError::custom("taco id is not a number"))?;
    Ok(format!("taco #{pk}\n").into_response())
}

async fn echo(mut session: StreamSession, _params: PathParams) -> HandlerResult<()> {
    while let Some(value) = session.next_value().await {
        session.send(value?).await?;
    }
    Ok(())
}

fn legacy(request: Request<Bytes>) -> Result<Response<Bytes>, BoxError> {
    let body = format!(
        "legacy app saw {} {} ({} bytes)\n",
        request.method(),
        request.uri(),
        request.body().len()
    );
    Ok(Response::new(Bytes::from(body)))
}
