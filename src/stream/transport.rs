//! Channel-based stream transport.

use axum::body::Bytes;
use tokio::sync::mpsc;

/// A unit exchanged between the transport and a stream session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Session accepted the stream (outgoing only).
    Accept,
    Text(String),
    Binary(Bytes),
    /// Close with the given code.
    Close(u16),
}

/// Session-side ends of a stream connection.
#[derive(Debug)]
pub struct StreamTransport {
    pub(crate) incoming: mpsc::Receiver<Frame>,
    pub(crate) outgoing: mpsc::Sender<Frame>,
}

impl StreamTransport {
    /// Create a connected transport/peer pair with the given channel capacity.
    pub fn channel(capacity: usize) -> (Self, StreamPeer) {
        let capacity = capacity.max(1);
        let (to_session, incoming) = mpsc::channel(capacity);
        let (outgoing, from_session) = mpsc::channel(capacity);
        (
            Self { incoming, outgoing },
            StreamPeer {
                to_session,
                from_session,
            },
        )
    }

    /// Send a frame to the peer, ignoring a peer that already went away.
    pub(crate) async fn send(&self, frame: Frame) {
        if self.outgoing.send(frame).await.is_err() {
            tracing::trace!("Stream peer dropped before frame was delivered");
        }
    }
}

/// Transport-side ends of a stream connection, held by the glue (or a test).
#[derive(Debug)]
pub struct StreamPeer {
    to_session: mpsc::Sender<Frame>,
    from_session: mpsc::Receiver<Frame>,
}

impl StreamPeer {
    /// Deliver an inbound frame to the session.
    ///
    /// Returns `false` if the session side is gone.
    pub async fn send(&self, frame: Frame) -> bool {
        self.to_session.send(frame).await.is_ok()
    }

    /// Receive the next frame emitted by the session.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.from_session.recv().await
    }

    /// Split into the raw sender and receiver.
    pub fn into_parts(self) -> (mpsc::Sender<Frame>, mpsc::Receiver<Frame>) {
        (self.to_session, self.from_session)
    }
}
