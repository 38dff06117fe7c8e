//! Session router: stateless dispatch of signaling frames.
//!
//! Every relay operation is at-most-once and fire-and-forget: resolve the
//! target identity, forward the frame verbatim to its live connection, and
//! silently drop it when the target is offline. The source is deliberately not
//! told about an unreachable target — like a phone ringing into silence, the
//! caller applies its own give-up policy. Ordering per source-target pair is
//! whatever the underlying connection ordering gives us; the router adds no
//! ordering or deduplication of its own.
//!
//! Note: `source_identity` on an offer is client-supplied and copied verbatim
//! into `from`. The relay does not cross-check it against the authenticated
//! user, so a connection can attribute an offer to any identity string. Closing
//! that gap means binding registration to the JWT subject, which changes the
//! protocol contract — tracked as an open product question, not patched here.

use serde_json::Value;

use crate::signaling::protocol::{ClientFrame, ServerFrame};
use crate::state::AppState;
use crate::ws::{send_frame, ConnId, ConnectionSender};

/// Handle one inbound text frame from a connection.
///
/// Malformed frames are answered with an `error` frame on the offending
/// connection and otherwise ignored; they never affect other connections.
pub fn handle_frame(state: &AppState, conn: ConnId, tx: &ConnectionSender, raw: &str) {
    let frame = match serde_json::from_str::<ClientFrame>(raw) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(conn = %conn, error = %e, "Malformed signaling frame");
            send_error(tx, "malformed signaling frame");
            return;
        }
    };

    match frame {
        ClientFrame::Register { identity } => {
            state.calls.register(&identity, conn);
            tracing::info!(
                conn = %conn,
                identity = %identity,
                registered = state.calls.len(),
                "Identity registered"
            );
        }
        ClientFrame::Offer {
            target_identity,
            payload,
            source_identity,
        } => relay_offer(state, &source_identity, &target_identity, payload),
        ClientFrame::Accept {
            target_identity,
            payload,
        } => relay_accept(state, &target_identity, payload),
        ClientFrame::Reject { target_identity } => relay_reject(state, &target_identity),
        ClientFrame::End { target_identity } => relay_end(state, &target_identity),
    }
}

/// Deliver an offer to `target_identity`, attributing it to `source_identity`.
pub fn relay_offer(state: &AppState, source_identity: &str, target_identity: &str, payload: Value) {
    match state.calls.resolve(target_identity) {
        Some(target) => {
            tracing::info!(from = %source_identity, to = %target_identity, "Relaying offer");
            send_frame(
                &state.connections,
                target,
                &ServerFrame::Offer {
                    from: source_identity.to_string(),
                    payload,
                },
            );
        }
        None => {
            tracing::debug!(from = %source_identity, to = %target_identity, "Offer target offline, dropping");
        }
    }
}

/// Deliver an accept (the answering handshake payload) back to the caller.
pub fn relay_accept(state: &AppState, target_identity: &str, payload: Value) {
    match state.calls.resolve(target_identity) {
        Some(target) => {
            tracing::info!(to = %target_identity, "Relaying accept");
            send_frame(&state.connections, target, &ServerFrame::Accept { payload });
        }
        None => {
            tracing::debug!(to = %target_identity, "Accept target offline, dropping");
        }
    }
}

/// Tell the caller the callee declined.
pub fn relay_reject(state: &AppState, target_identity: &str) {
    match state.calls.resolve(target_identity) {
        Some(target) => {
            tracing::info!(to = %target_identity, "Relaying reject");
            send_frame(&state.connections, target, &ServerFrame::Reject);
        }
        None => {
            tracing::debug!(to = %target_identity, "Reject target offline, dropping");
        }
    }
}

/// Tell the counterpart the call is over.
pub fn relay_end(state: &AppState, target_identity: &str) {
    match state.calls.resolve(target_identity) {
        Some(target) => {
            tracing::info!(to = %target_identity, "Relaying end");
            send_frame(&state.connections, target, &ServerFrame::End);
        }
        None => {
            tracing::debug!(to = %target_identity, "End target offline, dropping");
        }
    }
}

/// Send an `error` frame directly on the offending connection's channel.
fn send_error(tx: &ConnectionSender, message: &str) {
    let frame = ServerFrame::Error {
        message: message.to_string(),
    };
    if let Ok(text) = serde_json::to_string(&frame) {
        let _ = tx.send(axum::extract::ws::Message::Text(text.into()));
    }
}
