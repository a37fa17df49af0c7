//! Standard frontend invariants.

use lockpair_client::{FrontendSnapshot, Phase};

use super::{Invariant, InvariantResult, Violation};

/// A FIFO channel never holds waiters and claimable payloads at once.
///
/// A payload arriving while someone waits must go to the waiter, and a waiter
/// registering while payloads are buffered must take one.
pub struct ChannelExclusivity;

impl Invariant for ChannelExclusivity {
    fn name(&self) -> &'static str {
        "channel_exclusivity"
    }

    fn check(&self, state: &FrontendSnapshot) -> InvariantResult {
        if state.received_waiters > 0 && state.buffered_received > 0 {
            return Err(Violation {
                invariant: self.name(),
                message: format!(
                    "{} received waiters alongside {} buffered payloads",
                    state.received_waiters, state.buffered_received
                ),
            });
        }
        Ok(())
    }
}

/// Closing resolves every verifier, received and close waiter.
///
/// Code waiters are exempt: they outlive the close and resolve when the
/// session is dropped.
pub struct ClosedHoldsNoWaiters;

impl Invariant for ClosedHoldsNoWaiters {
    fn name(&self) -> &'static str {
        "closed_holds_no_waiters"
    }

    fn check(&self, state: &FrontendSnapshot) -> InvariantResult {
        let held = state.verifier_waiters + state.received_waiters + state.close_waiters;
        if state.is_closed() && held > 0 {
            return Err(Violation {
                invariant: self.name(),
                message: format!(
                    "closed session holds {} verifier, {} received and {} close waiters",
                    state.verifier_waiters, state.received_waiters, state.close_waiters
                ),
            });
        }
        Ok(())
    }
}

/// Once a singleton value is cached nobody is left waiting for it.
pub struct CachedValuesHaveNoWaiters;

impl Invariant for CachedValuesHaveNoWaiters {
    fn name(&self) -> &'static str {
        "cached_values_have_no_waiters"
    }

    fn check(&self, state: &FrontendSnapshot) -> InvariantResult {
        let lifecycle = &state.lifecycle;
        if lifecycle.code_known && state.code_waiters > 0 {
            return Err(Violation {
                invariant: self.name(),
                message: format!("code known but {} code waiters pending", state.code_waiters),
            });
        }
        if lifecycle.verifier_known && state.verifier_waiters > 0 {
            return Err(Violation {
                invariant: self.name(),
                message: format!(
                    "verifier known but {} verifier waiters pending",
                    state.verifier_waiters
                ),
            });
        }
        Ok(())
    }
}

/// Knowledge flags are only ever set by an engine event.
pub struct FlagsImplyActive;

impl Invariant for FlagsImplyActive {
    fn name(&self) -> &'static str {
        "flags_imply_active"
    }

    fn check(&self, state: &FrontendSnapshot) -> InvariantResult {
        let lifecycle = &state.lifecycle;
        if lifecycle.phase == Phase::Fresh && (lifecycle.code_known || lifecycle.verifier_known) {
            return Err(Violation {
                invariant: self.name(),
                message: format!("fresh session with flags {lifecycle:?}"),
            });
        }
        Ok(())
    }
}
