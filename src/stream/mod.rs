//! Bidirectional stream sessions.
//!
//! # Data Flow
//! ```text
//! WebSocket (axum)                 transport glue                 stream route
//!     ──── frames ────▶ StreamPeer ──mpsc──▶ StreamTransport ──▶ StreamSession ──▶ handler
//!     ◀─── frames ──── StreamPeer ◀──mpsc── StreamTransport ◀── StreamSession ◀── handler
//! ```
//!
//! # Design Decisions
//! - The core never touches sockets: a session only sees `Frame`s on two channels
//! - Closing before `Accept` means refusal; the glue answers the handshake with 403
//! - Payload coercion (text, bytes, json) is decided per route by `StreamConfig`

pub mod config;
pub mod session;
pub mod transport;

pub use config::{StreamConfig, ValueType};
pub use session::{StreamError, StreamSession, Value};
pub use transport::{Frame, StreamPeer, StreamTransport};

/// Close codes used by the router and sessions.
pub mod close_code {
    /// Normal closure.
    pub const NORMAL: u16 = 1000;
    /// Peer going away (page navigation, server shutdown).
    pub const GOING_AWAY: u16 = 1001;
    /// Transport vanished without a close frame.
    pub const ABNORMAL: u16 = 1006;
    /// Handler failed.
    pub const INTERNAL_ERROR: u16 = 1011;
    /// Policy refusal of an unrouted stream, mirroring HTTP 403.
    pub const FORBIDDEN: u16 = 403;
}
