//! Mounting sub-applications under a path prefix.
//!
//! # Responsibilities
//! - Match a prefix and rewrite the descriptor path for the sub-app
//! - Drive native apps directly and blocking apps through the adapter
//! - Flag descriptors answered by leaf apps as "response sent"
//!
//! # Matching
//! ```text
//! mount "/other"
//!     /other          → sub-path "/"
//!     /other/         → sub-path "/"
//!     /other/foo/bar  → sub-path "/foo/bar"
//!     /otherwise      → no match
//! ```
//!
//! # Design Decisions
//! - The calling convention is decided once, when the app is mounted
//! - Router-likeness is declared by the app, never inferred per request

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use super::connection::Connection;
use super::handler::HandlerError;
use super::outcome::Dispatch;
use super::pattern::{Pattern, PatternError};
use super::route::RouteMatch;
use super::router::Router;
use crate::adapter::{Adapter, BlockingApp};

/// An application driven with the native asynchronous convention.
pub trait App: Send + Sync + 'static {
    /// Handle a descriptor whose path was rewritten relative to the mount point.
    fn call<'a>(&'a self, conn: &'a mut Connection) -> BoxFuture<'a, Result<Dispatch, HandlerError>>;

    /// Router-like apps report their own outcome; leaf apps are assumed to
    /// have produced the response themselves.
    fn is_router_like(&self) -> bool {
        false
    }
}

/// An app handed to [`Router::mount`], tagged with its calling convention.
pub enum Mountable {
    Native(Arc<dyn App>),
    Blocking(Arc<dyn BlockingApp>),
}

impl Mountable {
    pub fn native(app: impl App) -> Self {
        Mountable::Native(Arc::new(app))
    }

    pub fn blocking(app: impl BlockingApp) -> Self {
        Mountable::Blocking(Arc::new(app))
    }
}

impl From<Router> for Mountable {
    fn from(router: Router) -> Self {
        Mountable::Native(Arc::new(router))
    }
}

/// A mounted app after the convention check.
#[derive(Clone)]
pub enum MountTarget {
    Native(Arc<dyn App>),
    Adapted(Adapter),
}

impl MountTarget {
    fn is_router_like(&self) -> bool {
        match self {
            MountTarget::Native(app) => app.is_router_like(),
            MountTarget::Adapted(_) => false,
        }
    }
}

/// A route delegating a whole path subtree to a sub-application.
#[derive(Clone)]
pub struct Mount {
    path: String,
    prefix: Option<Pattern>,
    target: MountTarget,
}

impl Mount {
    /// Create a mount at `path`, normalized to a leading `/` and no trailing `/`.
    ///
    /// Mounting at `/` delegates every path.
    pub fn new(path: &str, target: MountTarget) -> Result<Self, PatternError> {
        let path = normalize_mount_path(path);
        let prefix = if path.is_empty() {
            None
        } else {
            Some(Pattern::compile(&path)?)
        };
        Ok(Self { path, prefix, target })
    }

    /// Normalized mount path (empty for a root mount).
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn target(&self) -> &MountTarget {
        &self.target
    }

    /// Match `path` and compute the sub-path the app will see.
    pub fn matches(&self, path: &str) -> Option<RouteMatch> {
        let Some(prefix) = &self.prefix else {
            return Some(RouteMatch {
                params: Default::default(),
                mount: Some((String::new(), path.to_string())),
            });
        };

        let (params, rest) = prefix.match_prefix(path)?;
        let consumed = &path[..path.len() - rest.len()];
        let sub_path = if rest.is_empty() || rest == "/" {
            "/".to_string()
        } else {
            rest.to_string()
        };

        Some(RouteMatch {
            params,
            mount: Some((consumed.to_string(), sub_path)),
        })
    }

    /// Dispatch the rewritten descriptor to the mounted app.
    pub async fn invoke(&self, conn: &mut Connection) -> Result<Dispatch, HandlerError> {
        let outcome = match &self.target {
            MountTarget::Native(app) => app.call(conn).await,
            MountTarget::Adapted(adapter) => adapter.call(conn).await,
        };

        if self.target.is_router_like() {
            return outcome;
        }

        conn.mark_response_sent();
        match outcome? {
            Dispatch::NotFound => Ok(Dispatch::Handled),
            other => Ok(other),
        }
    }

    pub(crate) fn with_prefix(&self, prefix: &str) -> Result<Self, PatternError> {
        let path = Pattern::join(prefix, &self.path);
        Self::new(&path, self.target.clone())
    }
}

impl fmt::Debug for Mount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mount")
            .field("path", &self.path)
            .field("router_like", &self.target.is_router_like())
            .finish_non_exhaustive()
    }
}

fn normalize_mount_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() || trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
