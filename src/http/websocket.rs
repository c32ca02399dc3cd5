//! WebSocket bridge between axum and stream sessions.
//!
//! # Responsibilities
//! - Dispatch an upgrade request as a stream connection
//! - Answer the handshake from the session's first frame (accept or refuse)
//! - Pump frames both ways until either side closes
//!
//! # Data Flow
//! ```text
//! Client ←── WebSocket frames ──→ pump ←── Frame (mpsc) ──→ StreamSession ──→ handler
//! ```
//!
//! # Design Decisions
//! - Dispatch runs in its own task; the handshake waits only for the first frame
//! - `Close` before `Accept` becomes an HTTP 403, never a 101
//! - Ping/pong handled transparently by axum
//! - A close frame without a status is reported to the session as 1000

use std::sync::Arc;

use axum::body::Body;
use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::response;
use crate::routing::{Connection, Router};
use crate::stream::{close_code, Frame, StreamTransport};

/// Dispatch a WebSocket upgrade at `path` and answer the handshake.
pub async fn serve(
    router: Arc<Router>,
    path: &str,
    buffer: usize,
    upgrade: WebSocketUpgrade,
) -> Response<Body> {
    let (transport, peer) = StreamTransport::channel(buffer);
    let mut conn = Connection::stream(path, transport);
    let connection_id = conn.id();

    tracing::debug!(connection_id = %connection_id, path = %path, "Stream connection opened");

    tokio::spawn(async move {
        let result = router.dispatch(&mut conn).await;
        response::record(&conn, &result);
    });

    let (to_session, mut from_session) = peer.into_parts();
    match from_session.recv().await {
        Some(Frame::Accept) => upgrade
            .on_upgrade(move |socket| pump(socket, to_session, from_session))
            .into_response(),
        Some(Frame::Close(code)) => {
            tracing::debug!(connection_id = %connection_id, code, "Stream refused before accept");
            (StatusCode::FORBIDDEN, "Forbidden").into_response()
        }
        Some(frame) => {
            tracing::error!(
                connection_id = %connection_id,
                frame = ?frame,
                "Stream sent data before accepting"
            );
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        None => {
            tracing::error!(connection_id = %connection_id, "Stream dispatch ended without a frame");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn pump(
    socket: WebSocket,
    to_session: mpsc::Sender<Frame>,
    mut from_session: mpsc::Receiver<Frame>,
) {
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            outgoing = from_session.recv() => match outgoing {
                Some(Frame::Accept) => {}
                Some(Frame::Close(code)) => {
                    let _ = sink.send(close_message(code)).await;
                    break;
                }
                Some(frame) => {
                    let Some(message) = to_message(frame) else { continue };
                    if sink.send(message).await.is_err() {
                        let _ = to_session.send(Frame::Close(close_code::ABNORMAL)).await;
                        break;
                    }
                }
                None => {
                    let _ = sink.send(close_message(close_code::NORMAL)).await;
                    break;
                }
            },
            incoming = stream.next() => match incoming {
                Some(Ok(message)) => {
                    let Some(frame) = from_message(message) else { continue };
                    if to_session.send(frame).await.is_err() {
                        break;
                    }
                }
                Some(Err(err)) => {
                    tracing::debug!(error = %err, "WebSocket read failed");
                    let _ = to_session.send(Frame::Close(close_code::ABNORMAL)).await;
                    break;
                }
                None => {
                    let _ = to_session.send(Frame::Close(close_code::ABNORMAL)).await;
                    break;
                }
            },
        }
    }
}

fn close_message(code: u16) -> Message {
    Message::Close(Some(CloseFrame {
        code,
        reason: Utf8Bytes::from_static(""),
    }))
}

fn to_message(frame: Frame) -> Option<Message> {
    match frame {
        Frame::Text(text) => Some(Message::Text(text.into())),
        Frame::Binary(bytes) => Some(Message::Binary(bytes)),
        Frame::Close(code) => Some(close_message(code)),
        Frame::Accept => None,
    }
}

fn from_message(message: Message) -> Option<Frame> {
    match message {
        Message::Text(text) => Some(Frame::Text(text.as_str().to_owned())),
        Message::Binary(bytes) => Some(Frame::Binary(bytes)),
        Message::Close(frame) => Some(Frame::Close(
            frame.map_or(close_code::NORMAL, |frame| frame.code),
        )),
        Message::Ping(_) | Message::Pong(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;

    #[test]
    fn test_close_without_status_is_normal() {
        assert_eq!(from_message(Message::Close(None)), Some(Frame::Close(1000)));
        assert_eq!(
            from_message(close_message(4001)),
            Some(Frame::Close(4001))
        );
    }

    #[test]
    fn test_payload_frames_round_trip_into_messages() {
        assert_eq!(
            from_message(Message::Text("hi".into())),
            Some(Frame::Text("hi".to_string()))
        );
        assert_eq!(
            from_message(Message::Binary(Bytes::from_static(b"\x01"))),
            Some(Frame::Binary(Bytes::from_static(b"\x01")))
        );
        assert_eq!(from_message(Message::Ping(Bytes::new())), None);
        assert!(to_message(Frame::Accept).is_none());
    }
}
