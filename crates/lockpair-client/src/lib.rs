//! Lockpair client
//!
//! Dual-mode event facade over a secure pairing engine. The engine negotiates
//! a short code with a peer, derives a verifier, exchanges payloads and
//! eventually closes; this crate turns its four event kinds into something a
//! consumer can use, in one of two ways chosen at construction:
//!
//! - **Future-based** ([`deferred_session`]): `when_code`, `when_verifier`,
//!   `when_received` and `close` return one-shot [`Pending`] futures. Values
//!   that arrive early are cached (code, verifier) or buffered (payloads).
//! - **Push-based** ([`delegated_session`]): every event is handed to a
//!   [`Delegate`] the moment it arrives.
//!
//! # Architecture
//!
//! ```text
//! consumer ──commands──> Frontend ──────────────> Engine
//!    ^                                              │
//!    │                                           events
//!    │                                              v
//!    └──── Pending / Delegate <──── EventRouter (EventSink)
//! ```
//!
//! All state lives behind the router; the engine only ever sees an
//! `Arc<dyn EventSink>`. No consumer code runs while the facade holds its
//! lock. Events may still arrive on the stack of the command that caused
//! them, while the caller holds the session; see [`Delegate`] for what that
//! means for push consumers.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod frontend;
pub mod router;
pub mod session;
pub mod system_env;
pub mod waiter;

pub use config::{DEFAULT_APP_ID, DEFAULT_RELAY_URL, SessionConfig};
pub use frontend::{Delegate, Frontend, FrontendSnapshot, FutureFrontend, PushFrontend};
pub use lockpair_core::{
    Code, CloseResult, CodeInput, Engine, EngineFactory, EngineParams, Environment, EventKind,
    EventSink, ProtocolError, ProtocolErrorKind, RouterError, SessionError, Side, TraceSelector,
    TraceSink, Verifier,
};
pub use router::{EventRouter, Lifecycle, Phase};
pub use session::{Session, deferred_session, delegated_session, session};
pub use system_env::SystemEnv;
pub use waiter::Pending;
