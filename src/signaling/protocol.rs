//! Wire shapes for the signaling relay.
//!
//! JSON text frames, internally tagged on `type`. The `payload` field carries
//! the peer-connection handshake blob (SDP offer/answer); the relay never
//! inspects it, so it stays an opaque `serde_json::Value` end to end.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frames a client sends to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum ClientFrame {
    /// Bind this connection to an identity. A later register for the same
    /// identity supersedes the earlier connection (reconnect case).
    Register { identity: String },
    /// Start a call: deliver the handshake payload to `target_identity`.
    /// `source_identity` is echoed back to the callee as `from` so it can
    /// address its answer.
    Offer {
        target_identity: String,
        payload: Value,
        source_identity: String,
    },
    /// Answer a call: deliver the answering handshake payload to the caller.
    Accept {
        target_identity: String,
        payload: Value,
    },
    /// Decline a ringing call.
    Reject { target_identity: String },
    /// Hang up an accepted (or still-ringing) call.
    End { target_identity: String },
}

/// Frames the relay sends to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum ServerFrame {
    /// Incoming call from `from`.
    Offer { from: String, payload: Value },
    /// The callee accepted; `payload` is its answering handshake blob.
    Accept { payload: Value },
    /// The callee declined.
    Reject,
    /// The counterpart hung up.
    End,
    /// A frame from this connection could not be handled. The connection
    /// itself stays open.
    Error { message: String },
}
