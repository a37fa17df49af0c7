//! Delegate that records what it is told.

use std::{
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
};

use lockpair_client::Delegate;
use lockpair_core::{Code, CloseResult, Verifier};

/// One delegate callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DelegateEvent {
    /// `on_code_ready`
    Code(Code),
    /// `on_verifier_ready`
    Verifier(Verifier),
    /// `on_message`
    Message(Vec<u8>),
    /// `on_session_closed`
    Closed(CloseResult),
}

impl fmt::Display for DelegateEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "code {code}"),
            Self::Verifier(verifier) => write!(f, "verifier {verifier}"),
            Self::Message(plaintext) => write!(f, "message {}", String::from_utf8_lossy(plaintext)),
            Self::Closed(CloseResult::Success(value)) => {
                write!(f, "closed ok ({} bytes)", value.len())
            },
            Self::Closed(CloseResult::ProtocolError(e)) => write!(f, "closed error ({e})"),
            Self::Closed(CloseResult::Cancelled) => f.write_str("closed cancelled"),
        }
    }
}

/// [`Delegate`] appending every callback to an in-memory log.
#[derive(Debug, Default)]
pub struct RecordingDelegate {
    events: Mutex<Vec<DelegateEvent>>,
}

impl RecordingDelegate {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Callbacks so far, oldest first.
    pub fn events(&self) -> Vec<DelegateEvent> {
        self.lock().clone()
    }

    /// Received payloads so far, in delivery order.
    pub fn messages(&self) -> Vec<Vec<u8>> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                DelegateEvent::Message(plaintext) => Some(plaintext.clone()),
                _ => None,
            })
            .collect()
    }

    /// The close result, once the session closed.
    pub fn closed(&self) -> Option<CloseResult> {
        self.lock().iter().find_map(|event| match event {
            DelegateEvent::Closed(result) => Some(result.clone()),
            _ => None,
        })
    }

    /// Callbacks so far, one per line.
    pub fn transcript(&self) -> String {
        self.lock().iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
    }

    fn lock(&self) -> MutexGuard<'_, Vec<DelegateEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, event: DelegateEvent) {
        tracing::trace!(%event, "delegate callback");
        self.lock().push(event);
    }
}

impl Delegate for RecordingDelegate {
    fn on_code_ready(&self, code: Code) {
        self.push(DelegateEvent::Code(code));
    }

    fn on_verifier_ready(&self, verifier: Verifier) {
        self.push(DelegateEvent::Verifier(verifier));
    }

    fn on_message(&self, plaintext: Vec<u8>) {
        self.push(DelegateEvent::Message(plaintext));
    }

    fn on_session_closed(&self, result: CloseResult) {
        self.push(DelegateEvent::Closed(result));
    }
}
