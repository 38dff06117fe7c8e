//! Explicit call lifecycle for one peer-to-peer call.
//!
//! One state value with guarded transitions, instead of independent
//! call/accepted/ended flags that can drift into contradictory combinations.

use thiserror::Error;

/// Where a call is in its lifecycle.
///
/// `Ringing → Accepted → Ended` is the happy path; `Rejected` and a direct
/// `Ringing → Ended` (caller gives up, or counterpart hangs up before
/// answering) are the alternate terminals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// No call in progress.
    Idle,
    /// An offer is outstanding: dialing out, or an incoming call awaiting an
    /// answer.
    Ringing,
    /// Both sides exchanged handshake payloads; media is (being) established.
    Accepted,
    /// The callee declined. Terminal.
    Rejected,
    /// The call is over. Terminal.
    Ended,
}

/// What happened, locally or from the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallEvent {
    /// An offer was sent or received.
    Ring,
    /// The call was answered (local accept, or the relay's accept frame).
    Accept,
    /// The call was declined (local reject, or the relay's reject frame).
    Reject,
    /// The call was hung up (locally, or the relay's end frame).
    HangUp,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("call event {event:?} is not valid in state {state:?}")]
pub struct InvalidTransition {
    pub state: CallState,
    pub event: CallEvent,
}

impl CallState {
    /// Apply one event, returning the next state or an error for transitions
    /// the lifecycle does not allow (e.g. accepting a call that is not
    /// ringing, or reviving an ended one).
    pub fn apply(self, event: CallEvent) -> Result<CallState, InvalidTransition> {
        use CallEvent::*;
        use CallState::*;

        match (self, event) {
            (Idle, Ring) => Ok(Ringing),
            (Ringing, Accept) => Ok(Accepted),
            (Ringing, Reject) => Ok(Rejected),
            (Ringing, HangUp) => Ok(Ended),
            (Accepted, HangUp) => Ok(Ended),
            (state, event) => Err(InvalidTransition { state, event }),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CallState::Rejected | CallState::Ended)
    }
}

/// One call, bound to its counterpart identity.
#[derive(Debug, Clone)]
pub struct CallSession {
    peer: String,
    state: CallState,
}

impl CallSession {
    /// A dialed call: the offer to `peer` has been sent.
    pub fn outgoing(peer: impl Into<String>) -> Self {
        Self {
            peer: peer.into(),
            state: CallState::Ringing,
        }
    }

    /// An incoming call: an offer from `peer` arrived.
    pub fn incoming(peer: impl Into<String>) -> Self {
        Self {
            peer: peer.into(),
            state: CallState::Ringing,
        }
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    /// Apply an event, advancing the session state.
    pub fn apply(&mut self, event: CallEvent) -> Result<CallState, InvalidTransition> {
        self.state = self.state.apply(event)?;
        Ok(self.state)
    }
}
