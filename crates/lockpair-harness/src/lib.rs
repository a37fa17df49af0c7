//! Deterministic test harness for lockpair sessions.
//!
//! Engines, environment and delegate implementations that make session
//! behaviour reproducible:
//!
//! - [`SimEnv`]: seeded RNG and a virtual clock
//! - [`Script`] / [`ScriptedEngine`]: an engine the test drives event by event
//! - [`Loopback`]: two in-memory engines that pair with each other
//! - [`RecordingDelegate`]: a push delegate that logs every callback
//!
//! # Invariant Testing
//!
//! The `invariants` module checks [`lockpair_client::FrontendSnapshot`]s
//! against properties that must hold after every step. Use
//! [`InvariantRegistry::standard()`] for the full set.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod loopback;
pub mod recording;
pub mod scripted;
pub mod sim_env;

pub use invariants::{
    CachedValuesHaveNoWaiters, ChannelExclusivity, ClosedHoldsNoWaiters, FlagsImplyActive,
    Invariant, InvariantRegistry, InvariantResult, Violation,
};
pub use loopback::{End, Loopback, LoopbackEngine};
pub use recording::{DelegateEvent, RecordingDelegate};
pub use scripted::{Command, Script, ScriptedEngine};
pub use sim_env::{SimEnv, SimInstant};
