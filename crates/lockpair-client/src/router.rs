//! Engine-to-frontend event routing.
//!
//! The [`EventRouter`] is the [`EventSink`] every engine is built with. It is
//! a cheap cloneable handle over whichever frontend was selected at
//! construction and enforces the lifecycle shared by both:
//!
//! ```text
//! ┌───────┐  first event  ┌────────┐   on_closed   ┌────────┐
//! │ Fresh │──────────────>│ Active │──────────────>│ Closed │
//! └───────┘               └────────┘               └────────┘
//!                     code_known / verifier_known
//!                     set independently while Active
//! ```
//!
//! `Closed` is absorbing. An event arriving after it is an engine bug: the
//! router rejects it with [`RouterError`], logs it, and leaves every waiter
//! and cached value untouched. A second `on_closed` is rejected the same way,
//! so close futures are never resolved twice.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lockpair_core::{Code, CloseResult, EventKind, EventSink, RouterError, Verifier};

use crate::frontend::{future::FutureState, push::PushState};

/// Session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No engine event yet.
    #[default]
    Fresh,
    /// At least one event ingested, not closed.
    Active,
    /// `on_closed` has fired.
    Closed,
}

/// Per-session lifecycle flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Lifecycle {
    /// Current phase.
    pub phase: Phase,
    /// A code has been ingested.
    pub code_known: bool,
    /// A verifier has been ingested.
    pub verifier_known: bool,
    /// `close()` has been dispatched to the engine.
    pub close_requested: bool,
}

impl Lifecycle {
    /// Apply an engine event as a transition input.
    pub(crate) fn accept(&mut self, event: EventKind) -> Result<(), RouterError> {
        if self.phase == Phase::Closed {
            return Err(match event {
                EventKind::Closed => RouterError::AlreadyClosed,
                event => RouterError::EventAfterClose { event },
            });
        }

        match event {
            EventKind::Code => self.code_known = true,
            EventKind::Verifier => self.verifier_known = true,
            EventKind::Received => {},
            EventKind::Closed => {
                self.phase = Phase::Closed;
                return Ok(());
            },
        }
        self.phase = Phase::Active;
        Ok(())
    }
}

#[derive(Clone)]
enum Route {
    Future(Arc<Mutex<FutureState>>),
    Push(Arc<PushState>),
}

/// Event sink handed to the engine.
///
/// Either variant ingests the same four events; the engine cannot tell them
/// apart.
#[derive(Clone)]
pub struct EventRouter {
    route: Route,
}

impl EventRouter {
    pub(crate) fn future(state: Arc<Mutex<FutureState>>) -> Self {
        Self { route: Route::Future(state) }
    }

    pub(crate) fn push(state: Arc<PushState>) -> Self {
        Self { route: Route::Push(state) }
    }

    /// True if events are pushed to a delegate rather than buffered.
    pub fn is_push(&self) -> bool {
        matches!(self.route, Route::Push(_))
    }

    fn ingest(&self, event: EventKind) {
        tracing::debug!(%event, push = self.is_push(), "ingesting engine event");
    }
}

fn report(event: EventKind, result: Result<(), RouterError>) -> Result<(), RouterError> {
    if let Err(e) = &result {
        tracing::error!(%event, error = %e, "engine broke event ordering, event discarded");
    }
    result
}

impl EventSink for EventRouter {
    fn on_code(&self, code: Code) -> Result<(), RouterError> {
        self.ingest(EventKind::Code);
        let result = match &self.route {
            Route::Future(state) => lock(state).on_code(code),
            Route::Push(state) => state.on_code(code),
        };
        report(EventKind::Code, result)
    }

    fn on_verifier(&self, verifier: Verifier) -> Result<(), RouterError> {
        self.ingest(EventKind::Verifier);
        let result = match &self.route {
            Route::Future(state) => lock(state).on_verifier(verifier),
            Route::Push(state) => state.on_verifier(verifier),
        };
        report(EventKind::Verifier, result)
    }

    fn on_received(&self, plaintext: Vec<u8>) -> Result<(), RouterError> {
        self.ingest(EventKind::Received);
        let result = match &self.route {
            Route::Future(state) => lock(state).on_received(plaintext),
            Route::Push(state) => state.on_received(plaintext),
        };
        report(EventKind::Received, result)
    }

    fn on_closed(&self, result: CloseResult) -> Result<(), RouterError> {
        self.ingest(EventKind::Closed);
        let outcome = match &self.route {
            Route::Future(state) => lock(state).on_closed(result),
            Route::Push(state) => state.on_closed(result),
        };
        report(EventKind::Closed, outcome)
    }
}

/// Lock frontend state, recovering from poisoning.
///
/// No user code runs while the lock is held, so a poisoned lock can only
/// come from a panic inside the facade's own bookkeeping.
pub(crate) fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_event_activates() {
        let mut lifecycle = Lifecycle::default();
        assert_eq!(lifecycle.phase, Phase::Fresh);

        assert_eq!(lifecycle.accept(EventKind::Verifier), Ok(()));
        assert_eq!(lifecycle.phase, Phase::Active);
        assert!(lifecycle.verifier_known);
        assert!(!lifecycle.code_known);
    }

    #[test]
    fn closed_is_absorbing() {
        let mut lifecycle = Lifecycle::default();
        assert_eq!(lifecycle.accept(EventKind::Closed), Ok(()));

        assert_eq!(
            lifecycle.accept(EventKind::Code),
            Err(RouterError::EventAfterClose { event: EventKind::Code })
        );
        assert_eq!(lifecycle.accept(EventKind::Closed), Err(RouterError::AlreadyClosed));
        assert_eq!(lifecycle.phase, Phase::Closed);
        assert!(!lifecycle.code_known);
    }
}
