//! Handler and dispatch results.
//!
//! Redirects are values, not errors: a handler returns `Flow::Redirect`, the
//! route turns it into `Dispatch::Redirected`, and the transport writes the
//! carried response in place of the in-flight one.

use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};
use axum::response::IntoResponse;

/// What an HTTP handler asks the router to do next.
#[derive(Debug)]
pub enum Flow {
    /// Normal completion with this response.
    Respond(Response<Body>),
    /// Abort normal processing and serve this pre-built response instead.
    Redirect(Response<Body>),
}

impl Flow {
    pub fn respond(response: impl IntoResponse) -> Self {
        Flow::Respond(response.into_response())
    }

    /// Temporary redirect (`302 Found`) to `location`.
    pub fn redirect(location: &str) -> Self {
        Flow::Redirect(redirect_response(StatusCode::FOUND, location))
    }

    /// Permanent redirect (`301 Moved Permanently`) to `location`.
    pub fn redirect_permanent(location: &str) -> Self {
        Flow::Redirect(redirect_response(StatusCode::MOVED_PERMANENTLY, location))
    }
}

impl From<()> for Flow {
    fn from(_: ()) -> Self {
        Flow::Respond(StatusCode::OK.into_response())
    }
}

impl From<Response<Body>> for Flow {
    fn from(response: Response<Body>) -> Self {
        Flow::Respond(response)
    }
}

impl From<StatusCode> for Flow {
    fn from(status: StatusCode) -> Self {
        Flow::Respond(status.into_response())
    }
}

fn redirect_response(status: StatusCode, location: &str) -> Response<Body> {
    match HeaderValue::from_str(location) {
        Ok(value) => (status, [(header::LOCATION, value)]).into_response(),
        Err(_) => {
            tracing::error!(location, "Redirect location is not a valid header value");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Result of dispatching a connection.
#[derive(Debug)]
pub enum Dispatch {
    /// A route produced the response or ran the stream session.
    Handled,
    /// No HTTP route matched; the transport must answer 404.
    NotFound,
    /// No stream route matched; the stream was closed with a policy code.
    Rejected,
    /// A handler redirected; the transport serves this response.
    Redirected(Response<Body>),
}

impl Dispatch {
    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Dispatch::Handled => "handled",
            Dispatch::NotFound => "not_found",
            Dispatch::Rejected => "rejected",
            Dispatch::Redirected(_) => "redirected",
        }
    }

    pub fn is_handled(&self) -> bool {
        matches!(self, Dispatch::Handled)
    }
}
