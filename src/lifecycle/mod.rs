//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → every subscriber wakes → server stops accepting → in-flight
//!     connections finish → exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup in main: config, logging, metrics, router, listener
//! - Graceful shutdown via axum: stop accept, drain, close

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
