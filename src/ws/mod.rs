pub mod actor;
pub mod handler;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::signaling::protocol::ServerFrame;

/// Handle for one live WebSocket connection.
///
/// Allocated from a process-wide counter, so a handle is never reused after the
/// connection closes — a target that disconnects between resolve and send can
/// only produce a dropped message, never a misdelivered one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(u64);

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

impl ConnId {
    /// Allocate a fresh, never-before-used connection handle.
    pub fn fresh() -> Self {
        ConnId(NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Type alias for the sender half of a WebSocket connection's channel.
/// Other parts of the system can clone this to push messages to a specific client.
pub type ConnectionSender = mpsc::UnboundedSender<axum::extract::ws::Message>;

/// Connection map: tracks the live sender for every open WebSocket connection,
/// keyed by connection handle. Arc<DashMap<ConnId, ConnectionSender>>
pub type ConnectionMap = Arc<DashMap<ConnId, ConnectionSender>>;

/// Create a new empty connection map.
pub fn new_connection_map() -> ConnectionMap {
    Arc::new(DashMap::new())
}

/// Serialize a frame and queue it on one connection.
///
/// Sending to a handle that is unknown or already closed is a no-op: targets may
/// disconnect between resolve and send, and that race is tolerated rather than
/// surfaced as an error.
pub fn send_frame(connections: &ConnectionMap, conn: ConnId, frame: &ServerFrame) {
    let text = match serde_json::to_string(frame) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(conn = %conn, error = %e, "Failed to encode outbound frame");
            return;
        }
    };

    if let Some(sender) = connections.get(&conn) {
        let _ = sender.send(axum::extract::ws::Message::Text(text.into()));
    }
}
