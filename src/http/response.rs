//! Response finishing.
//!
//! # Responsibilities
//! - Turn a dispatch outcome into the HTTP response sent to the client
//! - Record the outcome in logs and metrics
//!
//! # Outcome Mapping
//! ```text
//! Handled        → response stored on the descriptor
//!                  (none stored: 200 empty, or 500 if a mounted leaf app claimed it)
//! Redirected(r)  → r
//! NotFound       → 404
//! Rejected       → 403
//! Err            → 500, error logged
//! ```

use axum::body::Body;
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;

use crate::observability::metrics;
use crate::routing::{Connection, ConnectionKind, Dispatch, HandlerError};

/// Count and log a finished dispatch.
pub fn record(conn: &Connection, result: &Result<Dispatch, HandlerError>) {
    let kind = conn.kind().as_str();
    match result {
        Ok(outcome) => metrics::record_dispatch(kind, outcome.label()),
        Err(err) => {
            tracing::error!(
                connection_id = %conn.id(),
                kind,
                path = %conn.path(),
                error = %err,
                "Handler failed"
            );
            metrics::record_dispatch(kind, "error");
            metrics::record_handler_error(kind);
        }
    }
}

/// Build the client response for an HTTP dispatch.
pub fn finish(conn: &mut Connection, result: Result<Dispatch, HandlerError>) -> Response<Body> {
    debug_assert_eq!(conn.kind(), ConnectionKind::Http);
    record(conn, &result);

    match result {
        Ok(Dispatch::Handled) => match conn.take_response() {
            Some(response) => response,
            None if conn.response_sent() => {
                tracing::error!(
                    connection_id = %conn.id(),
                    path = %conn.path(),
                    root_path = %conn.root_path(),
                    "Mounted app finished without producing a response"
                );
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
            None => StatusCode::OK.into_response(),
        },
        Ok(Dispatch::Redirected(response)) => response,
        Ok(Dispatch::NotFound) => (StatusCode::NOT_FOUND, "Not Found").into_response(),
        Ok(Dispatch::Rejected) => (StatusCode::FORBIDDEN, "Forbidden").into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response(),
    }
}
