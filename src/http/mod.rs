//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tower-http layers, request ID)
//!     → request.rs (classify: plain request or WebSocket upgrade)
//!     → plain:   Connection::http → Router::dispatch → response.rs (outcome → response)
//!     → upgrade: websocket.rs (frames ⇄ StreamTransport) → Router::dispatch
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
