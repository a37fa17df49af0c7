//! Consumer-facing frontends.
//!
//! Both frontends share one command surface ([`Frontend`]) that forwards to
//! the engine unchanged. They differ only in how engine events reach the
//! consumer:
//!
//! - [`FutureFrontend`]: one-shot [`crate::Pending`] futures, with buffering
//! - [`PushFrontend`]: synchronous [`Delegate`] callbacks, no buffering

pub(crate) mod future;
pub(crate) mod push;

use std::sync::Arc;

pub use future::FutureFrontend;
use lockpair_core::{Code, CodeInput, Engine, Side, Trace, TraceSelector, TraceSink};
pub use push::{Delegate, PushFrontend};

use crate::router::{Lifecycle, Phase};

/// Command surface shared by both frontends.
///
/// Every command is dispatched to the engine as-is and never fails here; the
/// engine reports problems later through `on_closed`. `close` is not part of
/// this trait because its return value differs per frontend.
pub trait Frontend {
    /// Engine commands are forwarded to.
    type Engine: Engine;

    /// Mutable access to the engine.
    fn engine_mut(&mut self) -> &mut Self::Engine;

    /// Shared access to the engine.
    fn engine(&self) -> &Self::Engine;

    /// Session side generated at construction.
    fn side(&self) -> &Side;

    /// Ask the engine to allocate a code of `code_length` words.
    fn allocate_code(&mut self, code_length: usize) {
        tracing::debug!(side = %self.side(), code_length, "allocate_code");
        self.engine_mut().allocate_code(code_length);
    }

    /// Ask the engine to read a code from `input`.
    fn input_code(&mut self, input: Box<dyn CodeInput>) {
        tracing::debug!(side = %self.side(), "input_code");
        self.engine_mut().input_code(input);
    }

    /// Hand the engine a code known in advance.
    fn set_code(&mut self, code: Code) {
        tracing::debug!(side = %self.side(), %code, "set_code");
        self.engine_mut().set_code(code);
    }

    /// Queue a payload for the peer.
    fn send(&mut self, plaintext: Vec<u8>) {
        tracing::debug!(side = %self.side(), len = plaintext.len(), "send");
        self.engine_mut().send(plaintext);
    }

    /// Install a transition trace on the engine.
    fn enable_trace(&mut self, label: &str, selector: TraceSelector, sink: Arc<dyn TraceSink>) {
        tracing::debug!(side = %self.side(), label, %selector, "enable_trace");
        self.engine_mut().set_trace(Trace::new(label, selector, sink));
    }
}

/// Observable frontend state, for invariant checks and diagnostics.
///
/// Counts are always zero for the push frontend, which holds no waiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrontendSnapshot {
    /// Lifecycle flags.
    pub lifecycle: Lifecycle,
    /// Pending `when_code` futures.
    pub code_waiters: usize,
    /// Pending `when_verifier` futures.
    pub verifier_waiters: usize,
    /// Pending `when_received` futures.
    pub received_waiters: usize,
    /// Received payloads not yet claimed.
    pub buffered_received: usize,
    /// Pending close futures.
    pub close_waiters: usize,
}

impl FrontendSnapshot {
    /// True once `on_closed` has fired.
    pub fn is_closed(&self) -> bool {
        self.lifecycle.phase == Phase::Closed
    }
}
