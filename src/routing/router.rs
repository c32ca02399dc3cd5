//! Route registration and dispatch.
//!
//! # Responsibilities
//! - Keep routes in registration order
//! - Dispatch a descriptor to the first matching route
//! - Compose routers (`include`) and mount sub-apps (`mount`)
//! - Turn "nothing matched" into `NotFound` (HTTP) or a policy close (stream)
//!
//! # Design Decisions
//! - Registration takes `&mut self`, dispatch takes `&self`: once the router is
//!   shared behind an `Arc`, registering during dispatch cannot compile
//! - First match wins; order is priority, there is no specificity ranking
//! - Configuration is passed in at construction, never read from globals

use std::future::Future;

use axum::body::Body;
use axum::http::Request;
use futures_util::future::BoxFuture;

use super::connection::{Connection, ConnectionKind};
use super::handler::{HandlerError, HandlerResult};
use super::mount::{App, Mount, MountTarget, Mountable};
use super::outcome::{Dispatch, Flow};
use super::params::PathParams;
use super::pattern::PatternError;
use super::route::{HttpRoute, Route, RouteMatch, StreamRoute};
use crate::adapter::Adapter;
use crate::config::RouterConfig;
use crate::stream::{close_code, StreamConfig, StreamSession};

/// Ordered, first-match-wins collection of routes.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
    config: RouterConfig,
}

impl Router {
    /// Create an empty router with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty router with explicit configuration.
    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            routes: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Registered routes in priority order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Append a route. It has the lowest priority so far.
    pub fn add_route(&mut self, route: Route) -> &Route {
        tracing::trace!(path = %route.path(), "Route registered");
        self.routes.push(route);
        &self.routes[self.routes.len() - 1]
    }

    /// Register an HTTP handler for `pattern`.
    pub fn route<F, Fut, R>(&mut self, pattern: &str, handler: F) -> Result<&Route, PatternError>
    where
        F: Fn(Request<Body>, PathParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<R>> + Send + 'static,
        R: Into<Flow> + Send + 'static,
    {
        let route = HttpRoute::new(pattern, handler)?;
        Ok(self.add_route(Route::Http(route)))
    }

    /// Register a stream handler for `pattern` with the router's default stream config.
    pub fn stream_route<F, Fut>(&mut self, pattern: &str, handler: F) -> Result<&Route, PatternError>
    where
        F: Fn(StreamSession, PathParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<()>> + Send + 'static,
    {
        let config = self.config.streams.clone();
        self.stream_route_with(pattern, config, handler)
    }

    /// Register a stream handler for `pattern` with an explicit stream config.
    pub fn stream_route_with<F, Fut>(
        &mut self,
        pattern: &str,
        config: StreamConfig,
        handler: F,
    ) -> Result<&Route, PatternError>
    where
        F: Fn(StreamSession, PathParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<()>> + Send + 'static,
    {
        let route = StreamRoute::new(pattern, config, handler)?;
        Ok(self.add_route(Route::Stream(route)))
    }

    /// Mount an app under `path`.
    ///
    /// Blocking apps are wrapped in an [`Adapter`] here, once.
    pub fn mount(&mut self, path: &str, app: impl Into<Mountable>) -> Result<&Route, PatternError> {
        let target = match app.into() {
            Mountable::Native(app) => MountTarget::Native(app),
            Mountable::Blocking(app) => {
                MountTarget::Adapted(Adapter::new(app, self.config.blocking.clone()))
            }
        };
        let mount = Mount::new(path, target)?;
        Ok(self.add_route(Route::Mount(mount)))
    }

    /// Copy every route of `other` into this router, re-rooted under `prefix`.
    pub fn include(&mut self, other: &Router, prefix: &str) -> Result<(), PatternError> {
        for route in &other.routes {
            let route = if prefix.is_empty() {
                route.clone()
            } else {
                route.with_prefix(prefix)?
            };
            self.add_route(route);
        }
        Ok(())
    }

    /// Dispatch a descriptor to the first matching route.
    pub async fn dispatch(&self, conn: &mut Connection) -> Result<Dispatch, HandlerError> {
        let Some((route, matched)) = self.find_route(conn) else {
            return Ok(self.no_match(conn).await);
        };

        tracing::debug!(
            connection_id = %conn.id(),
            path = %conn.path(),
            route = %route.path(),
            "Route matched"
        );

        let RouteMatch { params, mount } = matched;
        conn.merge_params(params);
        if let Some((consumed, sub_path)) = mount {
            conn.descend(&consumed, sub_path);
        }

        let outcome = route.invoke(conn).await?;
        if let Dispatch::Redirected(response) = &outcome {
            tracing::debug!(
                connection_id = %conn.id(),
                status = %response.status(),
                "Handler redirected"
            );
        }
        Ok(outcome)
    }

    fn find_route(&self, conn: &Connection) -> Option<(&Route, RouteMatch)> {
        self.routes
            .iter()
            .find_map(|route| route.matches(conn).map(|matched| (route, matched)))
    }

    async fn no_match(&self, conn: &mut Connection) -> Dispatch {
        match conn.kind() {
            ConnectionKind::Http => {
                tracing::debug!(connection_id = %conn.id(), path = %conn.path(), "No route matched");
                Dispatch::NotFound
            }
            ConnectionKind::Stream => {
                tracing::debug!(
                    connection_id = %conn.id(),
                    path = %conn.path(),
                    "No stream route matched, rejecting"
                );
                conn.reject_stream(close_code::FORBIDDEN).await;
                Dispatch::Rejected
            }
        }
    }
}

impl App for Router {
    fn call<'a>(&'a self, conn: &'a mut Connection) -> BoxFuture<'a, Result<Dispatch, HandlerError>> {
        Box::pin(self.dispatch(conn))
    }

    fn is_router_like(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::BlockingApp;
    use crate::routing::BoxError;
    use crate::stream::{Frame, StreamTransport};
    use axum::body::Bytes;
    use axum::http::{Response, StatusCode};
    use axum::response::IntoResponse;
    use std::future::{ready, Ready};
    use std::sync::Arc;

    fn reply(
        body: &'static str,
    ) -> impl Fn(Request<Body>, PathParams) -> Ready<HandlerResult<Response<Body>>> + Send + Sync + 'static
    {
        move |_req, _params| ready(Ok(body.into_response()))
    }

    fn http(path: &str) -> Connection {
        Connection::http(Request::builder().uri(path).body(Body::empty()).unwrap())
    }

    async fn body_text(conn: &mut Connection) -> String {
        let response = conn.take_response().expect("response stored on descriptor");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    struct Teapot;

    impl App for Teapot {
        fn call<'a>(
            &'a self,
            conn: &'a mut Connection,
        ) -> BoxFuture<'a, Result<Dispatch, HandlerError>> {
            Box::pin(async move {
                conn.set_response(StatusCode::IM_A_TEAPOT.into_response());
                Ok(Dispatch::NotFound)
            })
        }
    }

    fn legacy(request: Request<Bytes>) -> Result<Response<Bytes>, BoxError> {
        Ok(Response::new(Bytes::from(format!("legacy {}", request.uri().path()))))
    }

    #[tokio::test]
    async fn test_first_match_wins() {
        let mut router = Router::new();
        router.route("/items/{id}", reply("first")).unwrap();
        router.route("/items/special", reply("second")).unwrap();

        let mut conn = http("/items/special");
        let outcome = router.dispatch(&mut conn).await.unwrap();
        assert!(outcome.is_handled());
        assert_eq!(body_text(&mut conn).await, "first");
    }

    #[tokio::test]
    async fn test_unmatched_http_is_not_found() {
        let mut router = Router::new();
        router.route("/foo", reply("foo")).unwrap();

        for path in ["/", "/test", "/foo/"] {
            let mut conn = http(path);
            let outcome = router.dispatch(&mut conn).await.unwrap();
            assert!(matches!(outcome, Dispatch::NotFound), "path {path}");
            assert!(conn.take_response().is_none());
        }
    }

    #[tokio::test]
    async fn test_unmatched_stream_is_rejected() {
        let mut router = Router::new();
        router.route("/chat", reply("not a stream")).unwrap();

        let (transport, mut peer) = StreamTransport::channel(4);
        let mut conn = Connection::stream("/chat", transport);
        let outcome = router.dispatch(&mut conn).await.unwrap();

        assert!(matches!(outcome, Dispatch::Rejected));
        assert_eq!(peer.recv().await, Some(Frame::Close(403)));
    }

    #[tokio::test]
    async fn test_params_reach_handler() {
        let mut router = Router::new();
        router
            .route("/tacos/{pk:int}", |_req, params: PathParams| async move {
                let pk: u32 = params.parse("pk").unwrap_or_default();
                Ok::<_, HandlerError>(format!("taco {}", pk + 1).into_response())
            })
            .unwrap();

        let mut conn = http("/tacos/41");
        router.dispatch(&mut conn).await.unwrap();
        assert_eq!(conn.path_params().get("pk"), Some("41"));
        assert_eq!(body_text(&mut conn).await, "taco 42");
    }

    #[tokio::test]
    async fn test_include_with_prefix() {
        let mut tacos = Router::new();
        tacos.route("/", reply("all tacos")).unwrap();
        tacos.route("/{pk}", reply("one taco")).unwrap();

        let mut router = Router::new();
        router.include(&tacos, "/tacos").unwrap();

        let paths: Vec<&str> = router.routes().iter().map(Route::path).collect();
        assert_eq!(paths, vec!["/tacos", "/tacos/{pk}"]);

        let mut conn = http("/tacos");
        assert!(router.dispatch(&mut conn).await.unwrap().is_handled());
        assert_eq!(body_text(&mut conn).await, "all tacos");

        let mut conn = http("/tacos/1");
        assert!(router.dispatch(&mut conn).await.unwrap().is_handled());
        assert_eq!(body_text(&mut conn).await, "one taco");

        for path in ["/tacos/xyz/extra", "/", "/1"] {
            let mut conn = http(path);
            let outcome = router.dispatch(&mut conn).await.unwrap();
            assert!(matches!(outcome, Dispatch::NotFound), "path {path}");
        }
    }

    #[tokio::test]
    async fn test_include_without_prefix_keeps_patterns() {
        let mut other = Router::new();
        other.route("/a", reply("a")).unwrap();
        other.mount("/legacy", Mountable::blocking(legacy)).unwrap();

        let mut router = Router::new();
        router.route("/b", reply("b")).unwrap();
        router.include(&other, "").unwrap();

        let paths: Vec<&str> = router.routes().iter().map(Route::path).collect();
        assert_eq!(paths, vec!["/b", "/a", "/legacy"]);
    }

    #[tokio::test]
    async fn test_include_reprefixes_mounts() {
        let mut inner = Router::new();
        inner.route("/", reply("inner root")).unwrap();

        let mut other = Router::new();
        other.mount("/inner", inner).unwrap();

        let mut router = Router::new();
        router.include(&other, "/outer").unwrap();
        assert_eq!(router.routes()[0].path(), "/outer/inner");

        let mut conn = http("/outer/inner/");
        assert!(router.dispatch(&mut conn).await.unwrap().is_handled());
        assert_eq!(conn.root_path(), "/outer/inner");
        assert_eq!(body_text(&mut conn).await, "inner root");
    }

    #[tokio::test]
    async fn test_mount_router() {
        let mut tacos = Router::new();
        tacos.route("/", reply("tacos")).unwrap();
        tacos.route("/{pk}", reply("taco")).unwrap();

        let mut router = Router::new();
        router.mount("/tacos", tacos).unwrap();

        for (path, handled) in [
            ("/", false),
            ("/1", false),
            ("/tacos", true),
            ("/tacos/", true),
            ("/tacos/1", true),
            ("/tacos/1/2", false),
        ] {
            let mut conn = http(path);
            let outcome = router.dispatch(&mut conn).await.unwrap();
            assert_eq!(outcome.is_handled(), handled, "path {path}");
            assert!(!conn.response_sent(), "router mounts are not leaf apps");
        }
    }

    #[tokio::test]
    async fn test_templated_mount_shares_params() {
        let mut posts = Router::new();
        posts
            .route("/{post}", |_req, params: PathParams| async move {
                let body = format!(
                    "{}:{}",
                    params.get("user").unwrap_or("?"),
                    params.get("post").unwrap_or("?")
                );
                Ok::<_, HandlerError>(body.into_response())
            })
            .unwrap();

        let mut router = Router::new();
        router.mount("/users/{user}", posts).unwrap();

        let mut conn = http("/users/ada/7");
        assert!(router.dispatch(&mut conn).await.unwrap().is_handled());
        assert_eq!(body_text(&mut conn).await, "ada:7");
    }

    #[tokio::test]
    async fn test_leaf_app_is_flagged() {
        let mut router = Router::new();
        router.mount("/pot", Mountable::native(Teapot)).unwrap();

        let mut conn = http("/pot/anything");
        let outcome = router.dispatch(&mut conn).await.unwrap();

        assert!(outcome.is_handled());
        assert!(conn.response_sent());
        assert_eq!(conn.take_response().unwrap().status(), StatusCode::IM_A_TEAPOT);
    }

    #[tokio::test]
    async fn test_blocking_mount_through_adapter() {
        let mut router = Router::new();
        router.mount("/legacy", Mountable::blocking(legacy)).unwrap();

        let mut conn = http("/legacy/reports/2024");
        let outcome = router.dispatch(&mut conn).await.unwrap();

        assert!(outcome.is_handled());
        assert!(conn.response_sent());
        assert_eq!(body_text(&mut conn).await, "legacy /reports/2024");
    }

    #[tokio::test]
    async fn test_blocking_app_error_is_flagged_and_propagated() {
        struct Broken;
        impl BlockingApp for Broken {
            fn call(&self, _request: Request<Bytes>) -> Result<Response<Bytes>, BoxError> {
                Err("broken".into())
            }
        }

        let mut router = Router::new();
        router.mount("/broken", Mountable::blocking(Broken)).unwrap();

        let mut conn = http("/broken");
        let err = router.dispatch(&mut conn).await.unwrap_err();
        assert!(matches!(err, HandlerError::Adapter(_)));
        assert!(conn.response_sent());
    }

    #[tokio::test]
    async fn test_redirect_is_an_outcome() {
        let mut router = Router::new();
        router
            .route("/old", |_req, _params| async { Ok::<_, HandlerError>(Flow::redirect("/new")) })
            .unwrap();

        let mut conn = http("/old");
        match router.dispatch(&mut conn).await.unwrap() {
            Dispatch::Redirected(response) => {
                assert_eq!(response.status(), StatusCode::FOUND);
                assert_eq!(response.headers()["location"], "/new");
            }
            other => panic!("expected redirect, got {other:?}"),
        }
        assert!(conn.take_response().is_none());
    }

    #[tokio::test]
    async fn test_handler_error_propagates() {
        let mut router = Router::new();
        router
            .route("/fail", |_req, _params| async {
                Err::<(), _>(HandlerError::custom("nope"))
            })
            .unwrap();

        let mut conn = http("/fail");
        let err = router.dispatch(&mut conn).await.unwrap_err();
        assert!(matches!(err, HandlerError::Custom(_)));
    }

    #[tokio::test]
    async fn test_http_route_ignores_stream_descriptor() {
        let mut router = Router::new();
        router.route("/ws", reply("http")).unwrap();
        router
            .stream_route("/ws", |_session, _params| async { Ok::<_, HandlerError>(()) })
            .unwrap();

        let (transport, mut peer) = StreamTransport::channel(4);
        let mut conn = Connection::stream("/ws", transport);
        assert!(router.dispatch(&mut conn).await.unwrap().is_handled());
        assert_eq!(peer.recv().await, Some(Frame::Accept));
        assert_eq!(peer.recv().await, Some(Frame::Close(1000)));
    }

    #[tokio::test]
    async fn test_stream_route_echo() {
        let mut router = Router::new();
        router
            .stream_route("/echo/{room}", |mut session: StreamSession, params: PathParams| async move {
                let room = params.get("room").unwrap_or_default().to_string();
                session.send(format!("joined {room}")).await?;
                while let Some(value) = session.next_value().await {
                    session.send(value?).await?;
                }
                Ok::<_, HandlerError>(())
            })
            .unwrap();
        let router = Arc::new(router);

        let (transport, mut peer) = StreamTransport::channel(8);
        let mut conn = Connection::stream("/echo/lobby", transport);
        let dispatcher = Arc::clone(&router);
        let task = tokio::spawn(async move { dispatcher.dispatch(&mut conn).await });

        assert_eq!(peer.recv().await, Some(Frame::Accept));
        assert_eq!(peer.recv().await, Some(Frame::Text("joined lobby".into())));

        assert!(peer.send(Frame::Text("hi".into())).await);
        assert_eq!(peer.recv().await, Some(Frame::Text("hi".into())));

        assert!(peer.send(Frame::Close(1000)).await);
        let outcome = task.await.unwrap().unwrap();
        assert!(outcome.is_handled());
        assert_eq!(peer.recv().await, None);
    }

    #[tokio::test]
    async fn test_stream_handler_error_closes_with_internal_error() {
        let mut router = Router::new();
        router
            .stream_route("/boom", |_session, _params| async {
                Err::<(), _>(HandlerError::custom("boom"))
            })
            .unwrap();

        let (transport, mut peer) = StreamTransport::channel(4);
        let mut conn = Connection::stream("/boom", transport);
        assert!(router.dispatch(&mut conn).await.is_err());
        assert_eq!(peer.recv().await, Some(Frame::Accept));
        assert_eq!(peer.recv().await, Some(Frame::Close(1011)));
    }

    #[tokio::test]
    async fn test_stream_without_auto_accept_is_refused_on_return() {
        let mut router = Router::new();
        let config = StreamConfig::default().with_auto_accept(false);
        router
            .stream_route_with("/quiet", config, |_session, _params| async {
                Ok::<_, HandlerError>(())
            })
            .unwrap();

        let (transport, mut peer) = StreamTransport::channel(4);
        let mut conn = Connection::stream("/quiet", transport);
        assert!(router.dispatch(&mut conn).await.unwrap().is_handled());
        assert_eq!(peer.recv().await, Some(Frame::Close(1000)));
    }

    #[test]
    fn test_malformed_pattern_fails_registration() {
        let mut router = Router::new();
        let err = router.route("/{broken", reply("x")).unwrap_err();
        assert!(matches!(err, PatternError::Unbalanced { .. }));
        assert!(router.routes().is_empty());
    }
}
