//! Per-connection descriptor carried through dispatch.
//!
//! # Responsibilities
//! - Describe an inbound connection (kind, path) to the router
//! - Carry the HTTP request or stream transport to the matched handler
//! - Record dispatch results: path params, mount prefix, "response sent" flag
//!
//! # Design Decisions
//! - Created once by the transport glue, mutated only by the router during dispatch
//! - Typed `Extensions` serve as the free-form area for collaborators
//! - Each descriptor gets a process-unique `ConnectionId` for tracing

use std::sync::atomic::{AtomicU64, Ordering};

use axum::body::Body;
use axum::http::{Extensions, Request, Response};

use super::params::PathParams;
use super::path::decode_path;
use crate::stream::transport::{Frame, StreamTransport};

/// Relaxed ordering suffices, only uniqueness matters.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// What kind of traffic a connection carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    Http,
    Stream,
}

impl ConnectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionKind::Http => "http",
            ConnectionKind::Stream => "stream",
        }
    }
}

#[derive(Debug)]
enum Payload {
    Http {
        request: Option<Request<Body>>,
        response: Option<Response<Body>>,
    },
    Stream {
        transport: Option<StreamTransport>,
    },
}

/// The descriptor the router dispatches on.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    path: String,
    root_path: String,
    path_params: PathParams,
    response_sent: bool,
    extensions: Extensions,
    payload: Payload,
}

impl Connection {
    /// Describe an HTTP request. The path is the percent-decoded URI path.
    pub fn http(request: Request<Body>) -> Self {
        let path = decode_path(request.uri().path());
        Self::with_payload(
            path,
            Payload::Http {
                request: Some(request),
                response: None,
            },
        )
    }

    /// Describe a stream connection at the raw URI `path`, percent-decoded here.
    pub fn stream(path: &str, transport: StreamTransport) -> Self {
        Self::with_payload(
            decode_path(path),
            Payload::Stream {
                transport: Some(transport),
            },
        )
    }

    fn with_payload(path: String, payload: Payload) -> Self {
        Self {
            id: ConnectionId::new(),
            path,
            root_path: String::new(),
            path_params: PathParams::new(),
            response_sent: false,
            extensions: Extensions::new(),
            payload,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn kind(&self) -> ConnectionKind {
        match self.payload {
            Payload::Http { .. } => ConnectionKind::Http,
            Payload::Stream { .. } => ConnectionKind::Stream,
        }
    }

    /// Path relative to the current mount point. Always starts with `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Prefixes consumed by the mounts traversed so far.
    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Whether a leaf app already produced the response for this connection.
    pub fn response_sent(&self) -> bool {
        self.response_sent
    }

    pub fn mark_response_sent(&mut self) {
        self.response_sent = true;
    }

    /// Take the HTTP request out of the descriptor.
    pub fn take_request(&mut self) -> Option<Request<Body>> {
        match &mut self.payload {
            Payload::Http { request, .. } => request.take(),
            Payload::Stream { .. } => None,
        }
    }

    /// Store the response produced for an HTTP connection.
    ///
    /// Ignored for stream connections.
    pub fn set_response(&mut self, value: Response<Body>) {
        if let Payload::Http { response, .. } = &mut self.payload {
            *response = Some(value);
        }
    }

    pub fn take_response(&mut self) -> Option<Response<Body>> {
        match &mut self.payload {
            Payload::Http { response, .. } => response.take(),
            Payload::Stream { .. } => None,
        }
    }

    /// Take the stream transport out of the descriptor.
    pub fn take_transport(&mut self) -> Option<StreamTransport> {
        match &mut self.payload {
            Payload::Stream { transport } => transport.take(),
            Payload::Http { .. } => None,
        }
    }

    pub(crate) fn merge_params(&mut self, params: PathParams) {
        self.path_params.merge(params);
    }

    /// Enter a mount: `consumed` joins the root path, `sub_path` becomes the path.
    pub(crate) fn descend(&mut self, consumed: &str, sub_path: String) {
        self.root_path.push_str(consumed);
        self.path = sub_path;
    }

    /// Refuse a stream connection by closing it with `code` before it is accepted.
    pub(crate) async fn reject_stream(&mut self, code: u16) {
        if let Some(transport) = self.take_transport() {
            transport.send(Frame::Close(code)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
        assert!(id1.to_string().starts_with("conn-"));
    }

    #[test]
    fn http_descriptor_from_request() {
        let request = Request::builder()
            .uri("http://example.com/tacos/1?spicy=yes")
            .body(Body::empty())
            .unwrap();
        let mut conn = Connection::http(request);

        assert_eq!(conn.kind(), ConnectionKind::Http);
        assert_eq!(conn.path(), "/tacos/1");
        assert!(conn.take_transport().is_none());
        assert!(conn.take_request().is_some());
        assert!(conn.take_request().is_none());
    }

    #[test]
    fn http_descriptor_path_is_decoded() {
        let request = Request::builder()
            .uri("/caf%C3%A9/ada%20lovelace")
            .body(Body::empty())
            .unwrap();
        let conn = Connection::http(request);
        assert_eq!(conn.path(), "/café/ada lovelace");
    }

    #[tokio::test]
    async fn rejecting_stream_sends_close() {
        let (transport, mut peer) = StreamTransport::channel(1);
        let mut conn = Connection::stream("chat", transport);
        assert_eq!(conn.path(), "/chat");
        assert_eq!(conn.kind(), ConnectionKind::Stream);

        conn.reject_stream(403).await;
        assert_eq!(peer.recv().await, Some(Frame::Close(403)));
        assert_eq!(peer.recv().await, None);
    }

    #[test]
    fn descend_tracks_root_path() {
        let (transport, _peer) = StreamTransport::channel(1);
        let mut conn = Connection::stream("/api/v1/items", transport);
        conn.descend("/api", "/v1/items".to_string());
        conn.descend("/v1", "/items".to_string());
        assert_eq!(conn.root_path(), "/api/v1");
        assert_eq!(conn.path(), "/items");
    }
}
