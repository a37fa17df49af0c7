//! Error types for lockpair sessions.
//!
//! Three layers: [`CloseResult`] is the single terminal value an engine
//! reports, [`SessionError`] is what an outstanding waiter receives when the
//! session ends without giving it a value, and [`RouterError`] is returned to
//! an engine that breaks the event ordering contract.
//!
//! Consumers never see an error raised synchronously from a command; every
//! failure travels through a future or a delegate callback.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::EventKind;

/// Machine-readable classification of an engine failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolErrorKind {
    /// Peers derived different keys (wrong code or active attacker).
    VerificationMismatch,
    /// Peer sent a message that could not be decoded.
    MalformedMessage,
    /// Rendezvous server refused a request.
    ServerRejected,
    /// Session closed before any peer showed up.
    Lonely,
    /// Any other engine-reported failure.
    Other,
}

impl fmt::Display for ProtocolErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::VerificationMismatch => "verification mismatch",
            Self::MalformedMessage => "malformed message",
            Self::ServerRejected => "server rejected",
            Self::Lonely => "lonely",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// Structured failure reported by the engine.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}: {detail}")]
pub struct ProtocolError {
    /// Classification.
    pub kind: ProtocolErrorKind,
    /// Human-readable context.
    pub detail: String,
}

impl ProtocolError {
    /// Create a protocol error of the given kind.
    pub fn new(kind: ProtocolErrorKind, detail: impl Into<String>) -> Self {
        Self { kind, detail: detail.into() }
    }
}

/// Terminal value of a session, delivered exactly once through `on_closed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseResult {
    /// Normal closure. Carries an application-meaningful value, possibly
    /// empty.
    Success(Vec<u8>),
    /// Engine-reported failure.
    ProtocolError(ProtocolError),
    /// Teardown was forced before the session could finish.
    Cancelled,
}

impl CloseResult {
    /// Successful close with no value.
    pub fn empty() -> Self {
        Self::Success(Vec::new())
    }

    /// True for [`CloseResult::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Error handed to waiters that were still outstanding at close.
    ///
    /// A protocol failure passes through as [`SessionError::Protocol`]. A
    /// clean close becomes [`SessionError::ClosedWhilePending`] so callers can
    /// tell "the peer misbehaved" apart from "the session ended first".
    pub fn to_error(&self) -> SessionError {
        match self {
            Self::Success(result) => SessionError::ClosedWhilePending { result: result.clone() },
            Self::ProtocolError(e) => SessionError::Protocol(e.clone()),
            Self::Cancelled => SessionError::Cancelled,
        }
    }

    /// Output of a close future: the success value, or the failure.
    pub fn into_result(self) -> Result<Vec<u8>, SessionError> {
        match self {
            Self::Success(result) => Ok(result),
            Self::ProtocolError(e) => Err(SessionError::Protocol(e)),
            Self::Cancelled => Err(SessionError::Cancelled),
        }
    }
}

impl From<ProtocolError> for CloseResult {
    fn from(err: ProtocolError) -> Self {
        Self::ProtocolError(err)
    }
}

/// Errors delivered to consumer-facing futures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The engine reported a structured failure.
    #[error("protocol error: {0}")]
    Protocol(ProtocolError),

    /// The session closed cleanly before this value arrived.
    #[error("session closed before the value arrived ({} byte result)", .result.len())]
    ClosedWhilePending {
        /// Success value the session closed with.
        result: Vec<u8>,
    },

    /// The session was cancelled.
    #[error("session cancelled")]
    Cancelled,

    /// The session was dropped while this future was outstanding.
    #[error("session dropped before the value arrived")]
    Abandoned,
}

impl SessionError {
    /// Returns true if the session ended without any engine failure.
    ///
    /// Clean endings are a normal part of the lifecycle (a consumer waiting
    /// for a message that never came). Protocol errors are never clean.
    pub fn is_clean_close(&self) -> bool {
        matches!(self, Self::ClosedWhilePending { .. })
    }
}

/// Event ordering violations reported back to the engine.
///
/// The engine promises never to emit after `on_closed`. The router rejects
/// such events without touching any state and reports them here.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterError {
    /// A code, verifier or payload arrived after close.
    #[error("{event} event after session closed")]
    EventAfterClose {
        /// Event that arrived late
        event: EventKind,
    },

    /// `on_closed` fired a second time.
    #[error("session already closed")]
    AlreadyClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_close_is_distinguishable_from_protocol_error() {
        let clean = CloseResult::Success(b"happy".to_vec()).to_error();
        assert!(clean.is_clean_close());
        assert_eq!(clean, SessionError::ClosedWhilePending { result: b"happy".to_vec() });

        let failed =
            CloseResult::from(ProtocolError::new(ProtocolErrorKind::VerificationMismatch, "bad"))
                .to_error();
        assert!(!failed.is_clean_close());
        assert!(matches!(
            failed,
            SessionError::Protocol(ProtocolError { kind: ProtocolErrorKind::VerificationMismatch, .. })
        ));
    }

    #[test]
    fn cancelled_close_maps_to_cancelled() {
        assert_eq!(CloseResult::Cancelled.to_error(), SessionError::Cancelled);
        assert_eq!(CloseResult::Cancelled.into_result(), Err(SessionError::Cancelled));
    }

    #[test]
    fn success_close_result_yields_value() {
        assert_eq!(CloseResult::Success(b"ok".to_vec()).into_result(), Ok(b"ok".to_vec()));
        assert!(CloseResult::empty().is_success());
    }

    #[test]
    fn router_error_names_the_event() {
        let err = RouterError::EventAfterClose { event: EventKind::Verifier };
        assert_eq!(err.to_string(), "verifier event after session closed");
    }
}
