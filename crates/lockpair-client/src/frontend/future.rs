//! Future-based frontend.
//!
//! Engine events are cached or buffered until a consumer asks for them:
//!
//! - code and verifier: broadcast singletons, late callers get the cache
//! - received payloads: FIFO, matched against waiters in registration order
//! - close: every `close()` call gets its own future of the close result
//!
//! # Close asymmetry
//!
//! On close, pending verifier and received waiters are resolved with the
//! close error. Pending code waiters are left alone since a code is knowable
//! locally. They still resolve (with
//! [`lockpair_core::SessionError::Abandoned`]) once the frontend is dropped,
//! even if the engine keeps delivering into the shared state.

use std::{
    mem,
    sync::{Arc, Mutex},
};

use lockpair_core::{
    Code, CloseResult, Engine, EventKind, RouterError, SessionError, Side, Verifier,
};

use super::{Frontend, FrontendSnapshot};
use crate::{
    router::{Lifecycle, lock},
    waiter::{Broadcast, Pending, Resolver, WaiterQueue, waiter},
};

/// Waiters, caches and buffers of one future-based session.
#[derive(Debug, Default)]
pub(crate) struct FutureState {
    lifecycle: Lifecycle,
    code: Broadcast<Code>,
    verifier: Broadcast<Verifier>,
    received: WaiterQueue<Vec<u8>>,
    close_waiters: Vec<Resolver<Vec<u8>>>,
    close_result: Option<CloseResult>,
}

impl FutureState {
    pub(crate) fn when_code(&mut self) -> Pending<Code> {
        self.code.subscribe()
    }

    pub(crate) fn when_verifier(&mut self) -> Pending<Verifier> {
        if self.verifier.value().is_none()
            && let Some(result) = &self.close_result
        {
            return Pending::ready(Err(result.to_error()));
        }
        self.verifier.subscribe()
    }

    pub(crate) fn when_received(&mut self) -> Pending<Vec<u8>> {
        // Buffered payloads stay claimable after close.
        if self.received.buffered() == 0
            && let Some(result) = &self.close_result
        {
            return Pending::ready(Err(result.to_error()));
        }
        self.received.next()
    }

    pub(crate) fn request_close(&mut self) -> Pending<Vec<u8>> {
        self.lifecycle.close_requested = true;
        if let Some(result) = &self.close_result {
            return Pending::ready(result.clone().into_result());
        }
        let (resolver, pending) = waiter();
        self.close_waiters.push(resolver);
        pending
    }

    pub(crate) fn on_code(&mut self, code: Code) -> Result<(), RouterError> {
        self.lifecycle.accept(EventKind::Code)?;
        let resolved = self.code.publish(code);
        tracing::trace!(resolved, "code published");
        Ok(())
    }

    pub(crate) fn on_verifier(&mut self, verifier: Verifier) -> Result<(), RouterError> {
        self.lifecycle.accept(EventKind::Verifier)?;
        let resolved = self.verifier.publish(verifier);
        tracing::trace!(resolved, "verifier published");
        Ok(())
    }

    pub(crate) fn on_received(&mut self, plaintext: Vec<u8>) -> Result<(), RouterError> {
        self.lifecycle.accept(EventKind::Received)?;
        self.received.push(plaintext);
        Ok(())
    }

    pub(crate) fn on_closed(&mut self, result: CloseResult) -> Result<(), RouterError> {
        self.lifecycle.accept(EventKind::Closed)?;

        let err = result.to_error();
        let failed = self.verifier.fail_all(&err) + self.received.fail_all(&err);
        tracing::debug!(
            failed,
            untouched_code_waiters = self.code.waiting(),
            close_waiters = self.close_waiters.len(),
            success = result.is_success(),
            "session closed"
        );

        for resolver in mem::take(&mut self.close_waiters) {
            resolver.resolve(result.clone().into_result());
        }
        self.close_result = Some(result);
        Ok(())
    }

    /// Fail every outstanding waiter with [`SessionError::Abandoned`].
    ///
    /// Caches and buffers are kept; only waiters are released.
    pub(crate) fn abandon(&mut self) -> usize {
        let err = SessionError::Abandoned;
        let mut failed =
            self.code.fail_all(&err) + self.verifier.fail_all(&err) + self.received.fail_all(&err);
        for resolver in mem::take(&mut self.close_waiters) {
            failed += usize::from(resolver.resolve(Err(err.clone())));
        }
        failed
    }

    pub(crate) fn snapshot(&self) -> FrontendSnapshot {
        FrontendSnapshot {
            lifecycle: self.lifecycle,
            code_waiters: self.code.waiting(),
            verifier_waiters: self.verifier.waiting(),
            received_waiters: self.received.waiting(),
            buffered_received: self.received.buffered(),
            close_waiters: self.close_waiters.len(),
        }
    }
}

/// Frontend exposing session events as one-shot futures.
///
/// Built by [`crate::deferred_session`]. The engine delivers into the same
/// state through an [`crate::EventRouter`].
pub struct FutureFrontend<E: Engine> {
    engine: E,
    side: Side,
    state: Arc<Mutex<FutureState>>,
}

impl<E: Engine> FutureFrontend<E> {
    pub(crate) fn new(engine: E, side: Side, state: Arc<Mutex<FutureState>>) -> Self {
        Self { engine, side, state }
    }

    /// Future of the negotiated code.
    ///
    /// Resolves immediately if the code is already known.
    pub fn when_code(&self) -> Pending<Code> {
        lock(&self.state).when_code()
    }

    /// Future of the verifier.
    ///
    /// Resolves immediately with the latest verifier if one is known, or with
    /// the close error if the session already closed without one.
    pub fn when_verifier(&self) -> Pending<Verifier> {
        lock(&self.state).when_verifier()
    }

    /// Future of the next received payload, in arrival order.
    pub fn when_received(&self) -> Pending<Vec<u8>> {
        lock(&self.state).when_received()
    }

    /// Ask the engine to close, and get a future of the close result.
    ///
    /// Each call gets its own future; all of them resolve with the same
    /// result.
    pub fn close(&mut self) -> Pending<Vec<u8>> {
        tracing::debug!(side = %self.side, "close");
        // Register first: the engine may report the close synchronously.
        let pending = lock(&self.state).request_close();
        self.engine.close();
        pending
    }

    /// Observable waiter and buffer counts.
    pub fn snapshot(&self) -> FrontendSnapshot {
        lock(&self.state).snapshot()
    }
}

impl<E: Engine> Drop for FutureFrontend<E> {
    fn drop(&mut self) {
        // The engine's sink may outlive us.
        let abandoned = lock(&self.state).abandon();
        if abandoned > 0 {
            tracing::debug!(side = %self.side, abandoned, "session dropped with pending futures");
        }
    }
}

impl<E: Engine> Frontend for FutureFrontend<E> {
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

#[cfg(test)]
mod tests {
    use lockpair_core::{ProtocolError, ProtocolErrorKind};

    use super::*;

    fn mismatch() -> CloseResult {
        CloseResult::from(ProtocolError::new(ProtocolErrorKind::VerificationMismatch, "keys differ"))
    }

    #[test]
    fn close_fails_verifier_and_received_waiters() {
        let mut state = FutureState::default();
        let mut verifier = state.when_verifier();
        let mut received = state.when_received();

        assert_eq!(state.on_closed(mismatch()), Ok(()));

        let expected = mismatch().to_error();
        assert_eq!(verifier.try_take(), Some(Err(expected.clone())));
        assert_eq!(received.try_take(), Some(Err(expected)));
    }

    #[test]
    fn close_leaves_code_waiters_pending() {
        let mut state = FutureState::default();
        let mut code = state.when_code();

        assert_eq!(state.on_closed(CloseResult::empty()), Ok(()));

        assert!(code.try_take().is_none());
        assert_eq!(state.snapshot().code_waiters, 1);
    }

    #[test]
    fn abandon_releases_every_waiter_but_keeps_buffers() {
        let mut state = FutureState::default();
        let mut code = state.when_code();
        let mut verifier = state.when_verifier();
        let mut close = state.request_close();
        assert_eq!(state.on_received(b"kept".to_vec()), Ok(()));
        let mut first = state.when_received();
        let mut second = state.when_received();

        assert_eq!(state.abandon(), 4);

        assert_eq!(first.try_take(), Some(Ok(b"kept".to_vec())));
        assert_eq!(code.try_take(), Some(Err(SessionError::Abandoned)));
        assert_eq!(verifier.try_take(), Some(Err(SessionError::Abandoned)));
        assert_eq!(second.try_take(), Some(Err(SessionError::Abandoned)));
        assert_eq!(close.try_take(), Some(Err(SessionError::Abandoned)));
        assert_eq!(state.snapshot().code_waiters, 0);
    }

    #[test]
    fn close_futures_resolve_once_each() {
        let mut state = FutureState::default();
        let mut first = state.request_close();
        let mut second = state.request_close();

        assert_eq!(state.on_closed(CloseResult::Success(b"done".to_vec())), Ok(()));
        assert_eq!(state.on_closed(CloseResult::Cancelled), Err(RouterError::AlreadyClosed));

        assert_eq!(first.try_take(), Some(Ok(b"done".to_vec())));
        assert_eq!(second.try_take(), Some(Ok(b"done".to_vec())));
        assert_eq!(state.snapshot().close_waiters, 0);
    }

    #[test]
    fn late_close_future_gets_recorded_result() {
        let mut state = FutureState::default();
        assert_eq!(state.on_closed(mismatch()), Ok(()));

        let mut late = state.request_close();
        assert_eq!(late.try_take(), Some(Err(mismatch().to_error())));
    }

    #[test]
    fn buffered_payloads_survive_close() {
        let mut state = FutureState::default();
        assert_eq!(state.on_received(b"one".to_vec()), Ok(()));
        assert_eq!(state.on_closed(CloseResult::empty()), Ok(()));

        assert_eq!(state.when_received().try_take(), Some(Ok(b"one".to_vec())));
        assert_eq!(
            state.when_received().try_take(),
            Some(Err(SessionError::ClosedWhilePending { result: Vec::new() }))
        );
    }

    #[test]
    fn verifier_cache_outlives_close() {
        let mut state = FutureState::default();
        assert_eq!(state.on_verifier(Verifier::new(vec![1, 2])), Ok(()));
        assert_eq!(state.on_closed(CloseResult::Cancelled), Ok(()));

        assert_eq!(state.when_verifier().try_take(), Some(Ok(Verifier::new(vec![1, 2]))));
    }

    #[test]
    fn events_after_close_leave_state_untouched() {
        let mut state = FutureState::default();
        assert_eq!(state.on_closed(CloseResult::empty()), Ok(()));
        let before = state.snapshot();

        assert_eq!(
            state.on_received(b"late".to_vec()),
            Err(RouterError::EventAfterClose { event: EventKind::Received })
        );
        assert_eq!(
            state.on_code(Code::from("1-late")),
            Err(RouterError::EventAfterClose { event: EventKind::Code })
        );
        assert_eq!(state.snapshot(), before);
    }
}
