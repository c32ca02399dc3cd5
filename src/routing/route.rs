//! Route variants.
//!
//! # Responsibilities
//! - Bind a compiled pattern to a handler (HTTP or stream) or a sub-app (mount)
//! - Decide whether a descriptor matches, and what it extracts
//! - Invoke the bound handler with the right calling convention
//!
//! # Design Decisions
//! - Closed enum: router composition matches exhaustively, so a new variant
//!   cannot be forgotten by `include`
//! - Routes are cheap to clone (handlers live behind `Arc`)

use std::fmt;
use std::sync::Arc;

use super::connection::{Connection, ConnectionKind};
use super::handler::{HandlerError, HttpHandler, StreamHandler};
use super::mount::Mount;
use super::outcome::{Dispatch, Flow};
use super::params::PathParams;
use super::pattern::{Pattern, PatternError};
use crate::stream::{close_code, StreamConfig, StreamError, StreamSession};

/// What a matching route extracted from the descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteMatch {
    /// Placeholder values to merge into the descriptor.
    pub params: PathParams,
    /// For mounts: the consumed prefix and the rewritten sub-path.
    pub mount: Option<(String, String)>,
}

impl RouteMatch {
    fn params(params: PathParams) -> Self {
        Self { params, mount: None }
    }
}

/// A registered route.
#[derive(Debug, Clone)]
pub enum Route {
    Http(HttpRoute),
    Stream(StreamRoute),
    Mount(Mount),
}

impl Route {
    /// Check the descriptor against this route.
    pub fn matches(&self, conn: &Connection) -> Option<RouteMatch> {
        match self {
            Route::Http(route) => route.matches(conn).map(RouteMatch::params),
            Route::Stream(route) => route.matches(conn).map(RouteMatch::params),
            Route::Mount(mount) => mount.matches(conn.path()),
        }
    }

    /// Invoke the route on a descriptor it matched.
    pub async fn invoke(&self, conn: &mut Connection) -> Result<Dispatch, HandlerError> {
        match self {
            Route::Http(route) => route.invoke(conn).await,
            Route::Stream(route) => route.invoke(conn).await,
            Route::Mount(mount) => mount.invoke(conn).await,
        }
    }

    /// Copy of this route re-rooted under `prefix`.
    pub fn with_prefix(&self, prefix: &str) -> Result<Route, PatternError> {
        Ok(match self {
            Route::Http(route) => Route::Http(route.with_prefix(prefix)?),
            Route::Stream(route) => Route::Stream(route.with_prefix(prefix)?),
            Route::Mount(mount) => Route::Mount(mount.with_prefix(prefix)?),
        })
    }

    /// The pattern template, or the mount path for mounts.
    pub fn path(&self) -> &str {
        match self {
            Route::Http(route) => route.pattern.template(),
            Route::Stream(route) => route.pattern.template(),
            Route::Mount(mount) => mount.path(),
        }
    }
}

/// Plain request/response route.
#[derive(Clone)]
pub struct HttpRoute {
    pattern: Pattern,
    handler: Arc<dyn HttpHandler>,
}

impl HttpRoute {
    pub fn new(pattern: &str, handler: impl HttpHandler) -> Result<Self, PatternError> {
        Ok(Self {
            pattern: Pattern::compile(pattern)?,
            handler: Arc::new(handler),
        })
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    fn matches(&self, conn: &Connection) -> Option<PathParams> {
        if conn.kind() != ConnectionKind::Http {
            return None;
        }
        self.pattern.matches(conn.path())
    }

    async fn invoke(&self, conn: &mut Connection) -> Result<Dispatch, HandlerError> {
        let request = conn.take_request().ok_or(HandlerError::RequestConsumed)?;
        let params = conn.path_params().clone();

        match self.handler.call(request, params).await? {
            Flow::Respond(response) => {
                conn.set_response(response);
                Ok(Dispatch::Handled)
            }
            Flow::Redirect(response) => Ok(Dispatch::Redirected(response)),
        }
    }

    fn with_prefix(&self, prefix: &str) -> Result<Self, PatternError> {
        Ok(Self {
            pattern: self.pattern.with_prefix(prefix)?,
            handler: Arc::clone(&self.handler),
        })
    }
}

impl fmt::Debug for HttpRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRoute")
            .field("pattern", &self.pattern.template())
            .finish_non_exhaustive()
    }
}

/// Bidirectional stream route.
#[derive(Clone)]
pub struct StreamRoute {
    pattern: Pattern,
    handler: Arc<dyn StreamHandler>,
    config: StreamConfig,
}

impl StreamRoute {
    pub fn new(
        pattern: &str,
        config: StreamConfig,
        handler: impl StreamHandler,
    ) -> Result<Self, PatternError> {
        Ok(Self {
            pattern: Pattern::compile(pattern)?,
            handler: Arc::new(handler),
            config,
        })
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    fn matches(&self, conn: &Connection) -> Option<PathParams> {
        if conn.kind() != ConnectionKind::Stream {
            return None;
        }
        self.pattern.matches(conn.path())
    }

    async fn invoke(&self, conn: &mut Connection) -> Result<Dispatch, HandlerError> {
        let transport = conn.take_transport().ok_or(HandlerError::TransportConsumed)?;
        let mut session = StreamSession::new(transport, self.config.clone());
        let handle = session.handle();

        if self.config.auto_accept {
            session.accept().await?;
        }

        let result = self.handler.call(session, conn.path_params().clone()).await;
        match result {
            Ok(()) => {}
            Err(HandlerError::Stream(StreamError::Disconnected { code }))
                if self.config.catches(code) =>
            {
                tracing::debug!(code, path = %conn.path(), "Stream peer disconnected");
            }
            Err(err) => {
                handle.close_if_open(close_code::INTERNAL_ERROR).await;
                return Err(err);
            }
        }

        handle.close_if_open(close_code::NORMAL).await;
        Ok(Dispatch::Handled)
    }

    fn with_prefix(&self, prefix: &str) -> Result<Self, PatternError> {
        Ok(Self {
            pattern: self.pattern.with_prefix(prefix)?,
            handler: Arc::clone(&self.handler),
            config: self.config.clone(),
        })
    }
}

impl fmt::Debug for StreamRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamRoute")
            .field("pattern", &self.pattern.template())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
