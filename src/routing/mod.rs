//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Connection descriptor (kind, path)
//!     → router.rs (walk routes in registration order)
//!     → route.rs (HTTP / stream / mount match)
//!     → pattern.rs (segment matching, param extraction)
//!     → first match invoked:
//!         HTTP route   → handler(request, params)  → Handled | Redirected
//!         stream route → handler(session, params)  → Handled
//!         mount        → sub-app on rewritten path → sub-app's outcome
//!     → no match: NotFound (HTTP) | Rejected (stream)
//!
//! Registration (at startup):
//!     route / stream_route / mount / include
//!     → compile patterns (errors are fatal)
//!     → freeze: share as Arc<Router>
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in the hot path (segment matching only)
//! - Deterministic: same input always matches same route
//! - First match wins (registration order is priority)

pub mod connection;
pub mod handler;
pub mod mount;
pub mod outcome;
pub mod params;
pub(crate) mod path;
pub mod pattern;
pub mod route;
pub mod router;

pub use connection::{Connection, ConnectionId, ConnectionKind};
pub use handler::{BoxError, HandlerError, HandlerResult, HttpHandler, StreamHandler};
pub use mount::{App, Mount, MountTarget, Mountable};
pub use outcome::{Dispatch, Flow};
pub use params::PathParams;
pub use pattern::{Pattern, PatternError};
pub use route::{HttpRoute, Route, RouteMatch, StreamRoute};
pub use router::Router;
