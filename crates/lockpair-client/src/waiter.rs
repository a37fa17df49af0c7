//! One-shot waiters and the two channel shapes built on them.
//!
//! Every consumer-facing future is a [`Pending`] backed by a
//! `tokio::sync::oneshot` pair. The facade keeps the sending half
//! ([`Resolver`]) until a value or the session's end resolves it.
//!
//! - [`Broadcast`]: singleton channel (code, verifier). One cached value,
//!   every waiter gets a copy.
//! - [`WaiterQueue`]: FIFO channel (received payloads). Each value goes to
//!   exactly one waiter; unclaimed values are buffered.
//!
//! # Invariants
//!
//! - A channel never holds both waiters and a claimable value
//! - Waiter lists are taken out of the channel before any waiter is resolved,
//!   so a registration made during resolution lands in a fresh list

use std::{
    collections::VecDeque,
    future::Future,
    mem,
    pin::Pin,
    task::{Context, Poll},
};

use lockpair_core::SessionError;
use tokio::sync::oneshot::{self, error::TryRecvError};

/// Future of one session value.
///
/// Resolves exactly once: with the value, with the error the session closed
/// with, or with [`SessionError::Abandoned`] if the session was dropped
/// first. There is no cancel operation; dropping a `Pending` only discards
/// interest in the value.
#[derive(Debug)]
#[must_use = "a Pending does nothing unless awaited or polled"]
pub struct Pending<T> {
    rx: oneshot::Receiver<Result<T, SessionError>>,
}

impl<T> Pending<T> {
    /// Already-resolved future.
    pub(crate) fn ready(outcome: Result<T, SessionError>) -> Self {
        let (resolver, pending) = waiter();
        resolver.resolve(outcome);
        pending
    }

    /// Take the outcome without waiting, if it is available.
    ///
    /// For poll-driven consumers. The outcome is handed out once; do not call
    /// again (or await) after it returned `Some`.
    pub fn try_take(&mut self) -> Option<Result<T, SessionError>> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(SessionError::Abandoned)),
        }
    }
}

impl<T> Future for Pending<T> {
    type Output = Result<T, SessionError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(SessionError::Abandoned)))
    }
}

/// Sending half of a [`Pending`].
#[derive(Debug)]
pub(crate) struct Resolver<T> {
    tx: oneshot::Sender<Result<T, SessionError>>,
}

impl<T> Resolver<T> {
    /// Resolve the waiter. Returns false if its future was dropped.
    pub(crate) fn resolve(self, outcome: Result<T, SessionError>) -> bool {
        self.tx.send(outcome).is_ok()
    }

    /// Hand `value` to the waiter, or get it back if the future was dropped.
    pub(crate) fn offer(self, value: T) -> Option<T> {
        match self.tx.send(Ok(value)) {
            Ok(()) | Err(Err(_)) => None,
            Err(Ok(value)) => Some(value),
        }
    }
}

/// Create a linked resolver/future pair.
pub(crate) fn waiter<T>() -> (Resolver<T>, Pending<T>) {
    let (tx, rx) = oneshot::channel();
    (Resolver { tx }, Pending { rx })
}

/// Singleton channel: cache-and-broadcast.
#[derive(Debug)]
pub(crate) struct Broadcast<T> {
    value: Option<T>,
    waiters: Vec<Resolver<T>>,
}

impl<T> Default for Broadcast<T> {
    fn default() -> Self {
        Self { value: None, waiters: Vec::new() }
    }
}

impl<T: Clone> Broadcast<T> {
    /// Future of the value: resolved now if cached, else queued.
    pub(crate) fn subscribe(&mut self) -> Pending<T> {
        if let Some(value) = &self.value {
            return Pending::ready(Ok(value.clone()));
        }
        let (resolver, pending) = waiter();
        self.waiters.push(resolver);
        pending
    }

    /// Cache `value` (replacing any previous one) and resolve every waiter.
    ///
    /// Returns the number of live waiters resolved.
    pub(crate) fn publish(&mut self, value: T) -> usize {
        let waiters = mem::take(&mut self.waiters);
        self.value = Some(value.clone());
        waiters.into_iter().map(|w| w.resolve(Ok(value.clone()))).filter(|ok| *ok).count()
    }

    /// Resolve every waiter with `err`. The cache is untouched.
    pub(crate) fn fail_all(&mut self, err: &SessionError) -> usize {
        let waiters = mem::take(&mut self.waiters);
        waiters.into_iter().map(|w| w.resolve(Err(err.clone()))).filter(|ok| *ok).count()
    }

    /// Cached value, if any.
    pub(crate) fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Number of registered waiters.
    pub(crate) fn waiting(&self) -> usize {
        self.waiters.len()
    }
}

/// FIFO channel: each value is claimed by exactly one waiter.
#[derive(Debug)]
pub(crate) struct WaiterQueue<T> {
    buffered: VecDeque<T>,
    waiters: VecDeque<Resolver<T>>,
}

impl<T> Default for WaiterQueue<T> {
    fn default() -> Self {
        Self { buffered: VecDeque::new(), waiters: VecDeque::new() }
    }
}

impl<T> WaiterQueue<T> {
    /// Future of the next value: the oldest buffered one, or a queued waiter.
    pub(crate) fn next(&mut self) -> Pending<T> {
        if let Some(value) = self.buffered.pop_front() {
            return Pending::ready(Ok(value));
        }
        let (resolver, pending) = waiter();
        self.waiters.push_back(resolver);
        pending
    }

    /// Deliver `value` to the oldest live waiter, or buffer it.
    ///
    /// Waiters whose futures were dropped are discarded on the way, so an
    /// abandoned future never swallows a value.
    pub(crate) fn push(&mut self, value: T) {
        let mut value = value;
        while let Some(resolver) = self.waiters.pop_front() {
            match resolver.offer(value) {
                None => return,
                Some(returned) => {
                    tracing::trace!("skipping dropped waiter");
                    value = returned;
                },
            }
        }
        self.buffered.push_back(value);
    }

    /// Resolve every waiter with `err`. Buffered values stay claimable.
    pub(crate) fn fail_all(&mut self, err: &SessionError) -> usize {
        let waiters = mem::take(&mut self.waiters);
        waiters.into_iter().map(|w| w.resolve(Err(err.clone()))).filter(|ok| *ok).count()
    }

    /// Number of registered waiters.
    pub(crate) fn waiting(&self) -> usize {
        self.waiters.len()
    }

    /// Number of unclaimed values.
    pub(crate) fn buffered(&self) -> usize {
        self.buffered.len()
    }
}
