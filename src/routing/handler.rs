//! Handler calling conventions.
//!
//! # Responsibilities
//! - Define the HTTP and stream handler signatures the router invokes
//! - Type-erase closures and async fns behind `Arc<dyn ...>`
//! - Define the error type every handler path propagates
//!
//! # Design Decisions
//! - Handlers receive owned values (request or session, plus params), so
//!   plain `async fn`s work without lifetime gymnastics
//! - Handler futures are `'static` and `Send`: dispatch runs on any worker

use std::future::Future;

use axum::body::Body;
use axum::http::Request;
use futures_util::future::BoxFuture;
use thiserror::Error;

use super::outcome::Flow;
use super::params::PathParams;
use crate::adapter::AdaptationFailure;
use crate::stream::{StreamError, StreamSession};

/// Boxed error accepted from user code.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors propagated out of handler invocation.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The request was already taken out of the descriptor.
    #[error("request already consumed")]
    RequestConsumed,

    /// The stream transport was already taken out of the descriptor.
    #[error("stream transport already consumed")]
    TransportConsumed,

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    Adapter(#[from] AdaptationFailure),

    #[error("handler failed: {0}")]
    Custom(BoxError),
}

impl HandlerError {
    /// Wrap an arbitrary error raised by handler code.
    pub fn custom(err: impl Into<BoxError>) -> Self {
        HandlerError::Custom(err.into())
    }
}

/// Result type returned by handlers.
pub type HandlerResult<T = Flow> = Result<T, HandlerError>;

/// A plain request/response handler.
pub trait HttpHandler: Send + Sync + 'static {
    fn call(&self, request: Request<Body>, params: PathParams) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut, R> HttpHandler for F
where
    F: Fn(Request<Body>, PathParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult<R>> + Send + 'static,
    R: Into<Flow> + Send + 'static,
{
    fn call(&self, request: Request<Body>, params: PathParams) -> BoxFuture<'static, HandlerResult> {
        let fut = (self)(request, params);
        Box::pin(async move { fut.await.map(Into::into) })
    }
}

/// A bidirectional stream handler.
pub trait StreamHandler: Send + Sync + 'static {
    fn call(&self, session: StreamSession, params: PathParams) -> BoxFuture<'static, HandlerResult<()>>;
}

impl<F, Fut> StreamHandler for F
where
    F: Fn(StreamSession, PathParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult<()>> + Send + 'static,
{
    fn call(&self, session: StreamSession, params: PathParams) -> BoxFuture<'static, HandlerResult<()>> {
        Box::pin((self)(session, params))
    }
}
