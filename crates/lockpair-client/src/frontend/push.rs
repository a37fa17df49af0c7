//! Push-based frontend.
//!
//! Every engine event is handed straight to the consumer's [`Delegate`]
//! within the same call that ingested it. Nothing is cached, buffered or
//! retried; a delegate that is not ready for an event has to deal with that
//! itself.

use std::sync::{Arc, Mutex};

use lockpair_core::{Code, CloseResult, Engine, EventKind, RouterError, Side, Verifier};

use super::{Frontend, FrontendSnapshot};
use crate::router::{Lifecycle, lock};

/// Consumer callbacks for the push frontend.
///
/// All four are required. Callbacks run on the engine's call stack and never
/// under the facade's lock.
///
/// An engine may report an event on the stack of the command that caused it
/// (a synchronous close, a code echoed back by `set_code`). The caller then
/// still holds the session mutably, so a delegate must not reach back into it
/// from such a callback; record the follow-up and issue it once the command
/// has returned. Events that arrive from outside a command carry no such
/// restriction.
pub trait Delegate: Send + Sync {
    /// The negotiated code is known.
    fn on_code_ready(&self, code: Code);

    /// A verifier was (re)computed.
    fn on_verifier_ready(&self, verifier: Verifier);

    /// A payload arrived from the peer.
    fn on_message(&self, plaintext: Vec<u8>);

    /// The session ended.
    fn on_session_closed(&self, result: CloseResult);
}

/// Delegate plus lifecycle of one push-based session.
pub(crate) struct PushState {
    delegate: Arc<dyn Delegate>,
    lifecycle: Mutex<Lifecycle>,
}

impl PushState {
    pub(crate) fn new(delegate: Arc<dyn Delegate>) -> Self {
        Self { delegate, lifecycle: Mutex::new(Lifecycle::default()) }
    }

    fn admit(&self, event: EventKind) -> Result<(), RouterError> {
        lock(&self.lifecycle).accept(event)
    }

    pub(crate) fn on_code(&self, code: Code) -> Result<(), RouterError> {
        self.admit(EventKind::Code)?;
        self.delegate.on_code_ready(code);
        Ok(())
    }

    pub(crate) fn on_verifier(&self, verifier: Verifier) -> Result<(), RouterError> {
        self.admit(EventKind::Verifier)?;
        self.delegate.on_verifier_ready(verifier);
        Ok(())
    }

    pub(crate) fn on_received(&self, plaintext: Vec<u8>) -> Result<(), RouterError> {
        self.admit(EventKind::Received)?;
        self.delegate.on_message(plaintext);
        Ok(())
    }

    pub(crate) fn on_closed(&self, result: CloseResult) -> Result<(), RouterError> {
        self.admit(EventKind::Closed)?;
        self.delegate.on_session_closed(result);
        Ok(())
    }

    fn request_close(&self) {
        lock(&self.lifecycle).close_requested = true;
    }

    fn snapshot(&self) -> FrontendSnapshot {
        FrontendSnapshot { lifecycle: *lock(&self.lifecycle), ..FrontendSnapshot::default() }
    }
}

/// Frontend forwarding session events to a [`Delegate`].
///
/// Built by [`crate::delegated_session`].
pub struct PushFrontend<E: Engine> {
    engine: E,
    side: Side,
    state: Arc<PushState>,
}

impl<E: Engine> PushFrontend<E> {
    pub(crate) fn new(engine: E, side: Side, state: Arc<PushState>) -> Self {
        Self { engine, side, state }
    }

    /// Ask the engine to close. Completion arrives through
    /// [`Delegate::on_session_closed`].
    pub fn close(&mut self) {
        tracing::debug!(side = %self.side, "close");
        self.state.request_close();
        self.engine.close();
    }

    /// Lifecycle flags (waiter counts are always zero).
    pub fn snapshot(&self) -> FrontendSnapshot {
        self.state.snapshot()
    }
}

impl<E: Engine> Frontend for PushFrontend<E> {
    type Engine = E;

    fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    fn engine(&self) -> &E {
        &self.engine
    }

    fn side(&self) -> &Side {
        &self.side
    }
}
