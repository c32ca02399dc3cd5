//! End-to-end tests over real sockets: HTTP via reqwest, streams via tokio-tungstenite.

use axum::body::{Body, Bytes};
use axum::http::{Request, Response, StatusCode};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use switchyard::routing::BoxError;
use switchyard::{Flow, HandlerError, HandlerResult, Mountable, PathParams, Router, StreamSession};
use tokio_tungstenite::{connect_async, tungstenite};

mod common;

async fn greet(_req: Request<Body>, params: PathParams) -> HandlerResult<Response<Body>> {
    let name = params.get("name").unwrap_or("stranger");
    Ok(format!("Hello, {name}!").into_response())
}

async fn echo(mut session: StreamSession, _params: PathParams) -> HandlerResult<()> {
    while let Some(value) = session.next_value().await {
        session.send(value?).await?;
    }
    Ok(())
}

fn legacy(request: Request<Bytes>) -> Result<Response<Bytes>, BoxError> {
    Ok(Response::new(Bytes::from(format!("legacy {}", request.uri()))))
}

fn app() -> Router {
    let mut router = Router::new();
    router.route("/greet/{name}", greet).unwrap();
    router
        .route("/old", |_req, _params| async {
            Ok::<_, HandlerError>(Flow::redirect("/greet/redirected"))
        })
        .unwrap();
    router
        .route("/fail", |_req, _params| async {
            Err::<(), _>(HandlerError::custom("deliberate"))
        })
        .unwrap();
    router.stream_route("/echo", echo).unwrap();
    router.mount("/legacy", Mountable::blocking(legacy)).unwrap();
    router
}

#[tokio::test]
async fn http_routes_over_the_wire() {
    let server = common::start_server(app()).await;
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    let res = client.get(server.url("/greet/ada")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.text().await.unwrap(), "Hello, ada!");

    let res = client.get(server.url("/missing")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client.get(server.url("/greet/ada/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client.get(server.url("/old")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers()["location"], "/greet/redirected");

    let res = client.get(server.url("/fail")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn blocking_mount_over_the_wire() {
    let server = common::start_server(app()).await;

    let body = reqwest::get(server.url("/legacy/report?year=2024"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "legacy /report?year=2024");
}

#[tokio::test]
async fn websocket_echo() {
    let server = common::start_server(app()).await;

    let (mut ws, response) = connect_async(server.ws_url("/echo")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SWITCHING_PROTOCOLS);

    ws.send(tungstenite::Message::text("ping")).await.unwrap();
    let reply = ws.next().await.unwrap().unwrap();
    assert_eq!(reply.to_text().unwrap(), "ping");

    ws.close(None).await.unwrap();
}

#[tokio::test]
async fn unrouted_websocket_is_refused_with_403() {
    let server = common::start_server(app()).await;

    match connect_async(server.ws_url("/greet/ada")).await {
        Err(tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), StatusCode::FORBIDDEN);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("handshake should have been refused"),
    }
}

#[tokio::test]
async fn websocket_to_blocking_mount_is_refused() {
    let server = common::start_server(app()).await;
    let result = connect_async(server.ws_url("/legacy/socket")).await;
    assert!(matches!(result, Err(tungstenite::Error::Http(ref r)) if r.status() == 403));
}
