//! Stream session handed to stream route handlers.
//!
//! # Responsibilities
//! - Accept and close the stream (the router never does it for the handler)
//! - Coerce payloads according to the route's `StreamConfig`
//! - Surface peer closes as `StreamError::Disconnected`

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use axum::body::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;

use super::close_code;
use super::config::{StreamConfig, ValueType};
use super::transport::{Frame, StreamTransport};

const CONNECTING: u8 = 0;
const OPEN: u8 = 1;
const CLOSED: u8 = 2;

/// Errors raised by session operations.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The peer closed the stream.
    #[error("peer disconnected with close code {code}")]
    Disconnected { code: u16 },

    #[error("stream has not been accepted")]
    NotAccepted,

    #[error("stream is already closed")]
    Closed,

    #[error("cannot send a {value} value as {expected}")]
    Coercion { value: &'static str, expected: ValueType },

    #[error("received payload is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// A payload after coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Bytes(Bytes),
    Json(serde_json::Value),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Json(_) => "json",
        }
    }

    /// Borrow the text payload, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Json(json) => Some(json),
            _ => None,
        }
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<Bytes> for Value {
    fn from(bytes: Bytes) -> Self {
        Value::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Bytes(Bytes::from(bytes))
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::Json(json)
    }
}

/// A stream connection scoped to one handler invocation.
#[derive(Debug)]
pub struct StreamSession {
    incoming: mpsc::Receiver<Frame>,
    outgoing: mpsc::Sender<Frame>,
    config: StreamConfig,
    state: Arc<AtomicU8>,
}

impl StreamSession {
    /// Wrap a transport with the given configuration.
    pub fn new(transport: StreamTransport, config: StreamConfig) -> Self {
        Self {
            incoming: transport.incoming,
            outgoing: transport.outgoing,
            config,
            state: Arc::new(AtomicU8::new(CONNECTING)),
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn is_accepted(&self) -> bool {
        self.state.load(Ordering::Acquire) != CONNECTING
    }

    pub fn is_closed(&self) -> bool {
        self.state.load(Ordering::Acquire) == CLOSED
    }

    /// Accept the stream. Accepting twice is a no-op.
    pub async fn accept(&mut self) -> Result<(), StreamError> {
        match self.state.load(Ordering::Acquire) {
            CONNECTING => {
                self.emit(Frame::Accept).await?;
                self.state.store(OPEN, Ordering::Release);
                Ok(())
            }
            OPEN => Ok(()),
            _ => Err(StreamError::Closed),
        }
    }

    /// Receive the next payload, coerced to the configured receive type.
    pub async fn receive(&mut self) -> Result<Value, StreamError> {
        self.ensure_open()?;
        loop {
            let frame = match self.incoming.recv().await {
                Some(frame) => frame,
                None => Frame::Close(close_code::ABNORMAL),
            };

            return match frame {
                Frame::Text(text) => coerce_text(text, self.config.receive_type()),
                Frame::Binary(bytes) => coerce_bytes(bytes, self.config.receive_type()),
                Frame::Close(code) => {
                    self.state.store(CLOSED, Ordering::Release);
                    Err(StreamError::Disconnected { code })
                }
                Frame::Accept => continue,
            };
        }
    }

    /// Receive payloads until the peer closes with a caught close code.
    ///
    /// Returns `None` on a clean disconnect; an uncaught close code is
    /// returned as `Some(Err(..))`.
    pub async fn next_value(&mut self) -> Option<Result<Value, StreamError>> {
        match self.receive().await {
            Err(StreamError::Disconnected { code }) if self.config.catches(code) => None,
            other => Some(other),
        }
    }

    /// Send a payload, coerced to the configured send type.
    pub async fn send(&mut self, value: impl Into<Value>) -> Result<(), StreamError> {
        self.ensure_open()?;
        let frame = coerce_outgoing(value.into(), self.config.send_type())?;
        self.emit(frame).await
    }

    /// Close the stream with `code`. Closing twice is a no-op.
    pub async fn close(&mut self, code: u16) -> Result<(), StreamError> {
        if self.state.swap(CLOSED, Ordering::AcqRel) == CLOSED {
            return Ok(());
        }
        self.emit(Frame::Close(code)).await
    }

    /// A handle the route keeps to close the session after the handler returns.
    pub(crate) fn handle(&self) -> SessionHandle {
        SessionHandle {
            outgoing: self.outgoing.clone(),
            state: Arc::clone(&self.state),
        }
    }

    fn ensure_open(&self) -> Result<(), StreamError> {
        match self.state.load(Ordering::Acquire) {
            OPEN => Ok(()),
            CONNECTING => Err(StreamError::NotAccepted),
            _ => Err(StreamError::Closed),
        }
    }

    async fn emit(&self, frame: Frame) -> Result<(), StreamError> {
        self.outgoing.send(frame).await.map_err(|_| {
            self.state.store(CLOSED, Ordering::Release);
            StreamError::Disconnected {
                code: close_code::ABNORMAL,
            }
        })
    }
}

/// Route-side view of a session that outlives the handler's ownership.
#[derive(Debug)]
pub(crate) struct SessionHandle {
    outgoing: mpsc::Sender<Frame>,
    state: Arc<AtomicU8>,
}

impl SessionHandle {
    /// Close with `code` unless the session already closed.
    pub(crate) async fn close_if_open(&self, code: u16) {
        if self.state.swap(CLOSED, Ordering::AcqRel) == CLOSED {
            return;
        }
        if self.outgoing.send(Frame::Close(code)).await.is_err() {
            tracing::trace!(code, "Stream peer gone before close");
        }
    }
}

fn coerce_text(text: String, target: ValueType) -> Result<Value, StreamError> {
    match target {
        ValueType::Text => Ok(Value::Text(text)),
        ValueType::Bytes => Ok(Value::Bytes(Bytes::from(text.into_bytes()))),
        ValueType::Json => Ok(Value::Json(serde_json::from_str(&text)?)),
    }
}

fn coerce_bytes(bytes: Bytes, target: ValueType) -> Result<Value, StreamError> {
    match target {
        ValueType::Text => Ok(Value::Text(String::from_utf8(bytes.to_vec())?)),
        ValueType::Bytes => Ok(Value::Bytes(bytes)),
        ValueType::Json => Ok(Value::Json(serde_json::from_slice(&bytes)?)),
    }
}

fn coerce_outgoing(value: Value, target: ValueType) -> Result<Frame, StreamError> {
    let mismatch = |value: &Value| StreamError::Coercion {
        value: value.kind(),
        expected: target,
    };

    match (target, value) {
        (ValueType::Text, Value::Text(text)) => Ok(Frame::Text(text)),
        (ValueType::Text, Value::Json(json)) => Ok(Frame::Text(json.to_string())),
        (ValueType::Text, Value::Bytes(bytes)) => {
            Ok(Frame::Text(String::from_utf8(bytes.to_vec())?))
        }
        (ValueType::Bytes, Value::Bytes(bytes)) => Ok(Frame::Binary(bytes)),
        (ValueType::Bytes, Value::Text(text)) => Ok(Frame::Binary(Bytes::from(text.into_bytes()))),
        (ValueType::Json, Value::Json(json)) => Ok(Frame::Text(serde_json::to_string(&json)?)),
        (ValueType::Json, Value::Text(text)) => {
            Ok(Frame::Text(serde_json::to_string(&serde_json::Value::String(text))?))
        }
        (_, value) => Err(mismatch(&value)),
    }
}
