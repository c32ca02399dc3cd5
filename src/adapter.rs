//! Adapter for mounting blocking (synchronous) applications.
//!
//! # Responsibilities
//! - Buffer the request body so a synchronous app can read it whole
//! - Rewrite the request URI to the mount-relative path
//! - Run the app on tokio's blocking pool, away from the dispatch workers
//! - Report app errors and panics as `AdaptationFailure`, never swallow them
//!
//! # Design Decisions
//! - Only HTTP traffic can be adapted; stream connections are refused with 403
//! - The body limit comes from `AdapterConfig`, set once at mount time

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::uri::PathAndQuery;
use axum::http::{Request, Response, Uri};
use thiserror::Error;

use crate::config::AdapterConfig;
use crate::routing::handler::{BoxError, HandlerError};
use crate::routing::path::encode_path;
use crate::routing::{Connection, ConnectionKind, Dispatch};
use crate::stream::close_code;

/// Failures while driving a blocking app.
#[derive(Debug, Error)]
pub enum AdaptationFailure {
    #[error("failed to buffer request body: {0}")]
    Body(#[source] axum::Error),

    #[error("blocking app panicked or was cancelled: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("blocking app failed: {0}")]
    App(BoxError),

    #[error("cannot rewrite request URI to `{path}`: {source}")]
    Uri {
        path: String,
        #[source]
        source: axum::http::Error,
    },
}

/// The mount prefix a blocking app is served under, inserted into request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPrefix(pub String);

/// A synchronous request/response application.
pub trait BlockingApp: Send + Sync + 'static {
    fn call(&self, request: Request<Bytes>) -> Result<Response<Bytes>, BoxError>;
}

impl<F> BlockingApp for F
where
    F: Fn(Request<Bytes>) -> Result<Response<Bytes>, BoxError> + Send + Sync + 'static,
{
    fn call(&self, request: Request<Bytes>) -> Result<Response<Bytes>, BoxError> {
        (self)(request)
    }
}

/// Drives a [`BlockingApp`] with the native asynchronous convention.
#[derive(Clone)]
pub struct Adapter {
    app: Arc<dyn BlockingApp>,
    config: AdapterConfig,
}

impl Adapter {
    pub fn new(app: Arc<dyn BlockingApp>, config: AdapterConfig) -> Self {
        Self { app, config }
    }

    /// Run the wrapped app for one connection.
    pub async fn call(&self, conn: &mut Connection) -> Result<Dispatch, HandlerError> {
        if conn.kind() == ConnectionKind::Stream {
            tracing::warn!(
                connection_id = %conn.id(),
                path = %conn.path(),
                "Blocking app cannot serve streams, rejecting"
            );
            conn.reject_stream(close_code::FORBIDDEN).await;
            return Ok(Dispatch::Rejected);
        }

        let request = conn.take_request().ok_or(HandlerError::RequestConsumed)?;
        let (mut parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, self.config.max_body_bytes)
            .await
            .map_err(AdaptationFailure::Body)?;

        let path = encode_path(conn.path());
        parts.uri = rewrite_uri(&parts.uri, &path).map_err(|source| {
            tracing::warn!(
                connection_id = %conn.id(),
                path = %path,
                error = %source,
                "Mount-relative URI rejected"
            );
            AdaptationFailure::Uri { path, source }
        })?;
        parts
            .extensions
            .insert(MountPrefix(conn.root_path().to_string()));

        let app = Arc::clone(&self.app);
        let request = Request::from_parts(parts, body);
        let response = tokio::task::spawn_blocking(move || app.call(request))
            .await
            .map_err(AdaptationFailure::from)?
            .map_err(AdaptationFailure::App)?;

        conn.set_response(response.map(Body::from));
        Ok(Dispatch::Handled)
    }
}

/// Replace the path of `uri` with the already-encoded `path`, keeping the query.
fn rewrite_uri(uri: &Uri, path: &str) -> Result<Uri, axum::http::Error> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query)?);
    Ok(Uri::from_parts(parts)?)
}
