//! Client-side driver for the signaling relay.
//!
//! [`SignalClient`] speaks the relay's JSON frame protocol over a WebSocket.
//! It sends the five client frames and surfaces inbound [`ServerFrame`]s one at
//! a time; call-state bookkeeping on top of those events lives in [`call`].
//! Integration tests use it as the reference client.

pub mod call;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::signaling::protocol::{ClientFrame, ServerFrame};

#[derive(Error, Debug)]
pub enum SignalClientError {
    #[error("transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] serde_json::Error),
}

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// A connected signaling client.
pub struct SignalClient {
    write: WsSink,
    read: WsSource,
}

impl SignalClient {
    /// Connect to the relay's `/ws` endpoint, authenticating with `token`.
    /// `server_url` is the ws:// base, e.g. `ws://127.0.0.1:5000`.
    pub async fn connect(server_url: &str, token: &str) -> Result<Self, SignalClientError> {
        let url = format!("{}/ws?token={}", server_url, token);
        let (stream, _response) = connect_async(&url).await?;
        let (write, read) = stream.split();
        Ok(Self { write, read })
    }

    /// Announce the identity this connection is reachable under.
    pub async fn register(&mut self, identity: &str) -> Result<(), SignalClientError> {
        self.send(&ClientFrame::Register {
            identity: identity.to_string(),
        })
        .await
    }

    /// Start a call to `target`, attributed to `source`.
    pub async fn offer(
        &mut self,
        source: &str,
        target: &str,
        payload: Value,
    ) -> Result<(), SignalClientError> {
        self.send(&ClientFrame::Offer {
            target_identity: target.to_string(),
            payload,
            source_identity: source.to_string(),
        })
        .await
    }

    /// Answer a ringing call from `target` (the original caller).
    pub async fn accept(&mut self, target: &str, payload: Value) -> Result<(), SignalClientError> {
        self.send(&ClientFrame::Accept {
            target_identity: target.to_string(),
            payload,
        })
        .await
    }

    /// Decline a ringing call from `target`.
    pub async fn reject(&mut self, target: &str) -> Result<(), SignalClientError> {
        self.send(&ClientFrame::Reject {
            target_identity: target.to_string(),
        })
        .await
    }

    /// Hang up on `target`.
    pub async fn end(&mut self, target: &str) -> Result<(), SignalClientError> {
        self.send(&ClientFrame::End {
            target_identity: target.to_string(),
        })
        .await
    }

    /// Receive the next signaling frame from the relay.
    ///
    /// Control frames (ping/pong) are handled transparently; `Ok(None)` means
    /// the relay closed the connection.
    pub async fn next_event(&mut self) -> Result<Option<ServerFrame>, SignalClientError> {
        loop {
            match self.read.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(serde_json::from_str(text.as_str())?));
                }
                Some(Ok(Message::Ping(data))) => {
                    self.write.send(Message::Pong(data)).await?;
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => {
                    // Pong or unexpected binary — skip
                }
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    /// Close the connection cleanly.
    pub async fn close(&mut self) -> Result<(), SignalClientError> {
        self.write.send(Message::Close(None)).await?;
        Ok(())
    }

    async fn send(&mut self, frame: &ClientFrame) -> Result<(), SignalClientError> {
        let text = serde_json::to_string(frame)?;
        self.write.send(Message::Text(text.into())).await?;
        Ok(())
    }
}
