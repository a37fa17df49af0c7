//! Lockpair core
//!
//! Data model and contracts for the dual-mode event facade of a secure pairing
//! client. Nothing here performs I/O: the protocol engine is an external
//! collaborator reached only through [`engine::Engine`] and
//! [`engine::EventSink`].
//!
//! # Modules
//!
//! - [`types`]: `Code`, `Verifier`, `Side`, event kinds
//! - [`error`]: `CloseResult` and the session/router error taxonomy
//! - [`engine`]: engine commands, event sink, construction parameters
//! - [`env`]: time and randomness injection
//! - [`trace`], [`journal`], [`timing`]: collaborators passed to the engine

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod engine;
pub mod env;
pub mod error;
pub mod journal;
pub mod timing;
pub mod trace;
pub mod types;

pub use engine::{CodeInput, Engine, EngineFactory, EngineParams, EventSink, TransportHandle};
pub use env::Environment;
pub use error::{CloseResult, ProtocolError, ProtocolErrorKind, RouterError, SessionError};
pub use journal::{ImmediateJournal, Journal};
pub use timing::{DebugTiming, Timing};
pub use trace::{DEFAULT_TRACE_MACHINES, LogTraceSink, Trace, TraceSelector, TraceSink};
pub use types::{Code, DEFAULT_CODE_LENGTH, EventKind, Side, Verifier};
