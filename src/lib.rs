//! Switchyard: routing and dispatch core for an async connection server.
//!
//! A [`Router`] holds an ordered list of routes (HTTP handlers, stream handlers and
//! mounted sub-applications) and dispatches a [`Connection`] descriptor to the first
//! one that matches. [`HttpServer`] puts a router behind axum, bridging WebSocket
//! upgrades into stream sessions.

pub mod adapter;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod stream;

pub use adapter::{AdaptationFailure, Adapter, BlockingApp};
pub use config::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{
    App, Connection, Dispatch, Flow, HandlerError, HandlerResult, Mountable, PathParams, Router,
};
pub use stream::{StreamConfig, StreamSession};
