//! Contracts between the facade and the protocol engine.
//!
//! The engine owns the protocol: code negotiation, key exchange, message
//! transport. The facade only forwards commands ([`Engine`]) and ingests the
//! four event kinds ([`EventSink`]). The engine is built with an
//! `Arc<dyn EventSink>` and never learns which frontend sits behind it.
//!
//! # Ordering contract
//!
//! - `on_code` fires at most once, `on_verifier` any number of times,
//!   `on_received` once per inbound payload in arrival order
//! - `on_closed` fires exactly once, after every other event
//! - nothing fires after `on_closed`

use std::{
    any::Any,
    io::{self, BufRead, Write},
    sync::Arc,
};

use crate::{
    error::{CloseResult, RouterError},
    journal::Journal,
    timing::Timing,
    trace::Trace,
    types::{Code, Side, Verifier},
};

/// Opaque transport-anonymization handle, passed through to the engine.
pub type TransportHandle = Arc<dyn Any + Send + Sync>;

/// Event ingestion side of the facade.
///
/// Implemented by the event router. Returns [`RouterError`] when the engine
/// breaks the ordering contract; the event is then discarded.
pub trait EventSink: Send + Sync {
    /// The negotiated code is known.
    fn on_code(&self, code: Code) -> Result<(), RouterError>;

    /// A verifier was (re)computed.
    fn on_verifier(&self, verifier: Verifier) -> Result<(), RouterError>;

    /// A payload arrived from the peer.
    fn on_received(&self, plaintext: Vec<u8>) -> Result<(), RouterError>;

    /// The session has ended.
    fn on_closed(&self, result: CloseResult) -> Result<(), RouterError>;
}

/// Interactive source a code is read from (e.g. a terminal).
pub trait CodeInput: Send {
    /// Read one code, showing `prompt` if the source can display it.
    fn read_code(&mut self, prompt: &str) -> io::Result<String>;
}

impl<R: BufRead + Send> CodeInput for R {
    fn read_code(&mut self, _prompt: &str) -> io::Result<String> {
        let mut line = String::new();
        if self.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no code entered"));
        }
        Ok(line.trim().to_owned())
    }
}

/// Commands accepted by the engine.
///
/// Every command is fire-and-forget: results come back later through the
/// [`EventSink`]. Commands issued after `on_closed` are the engine's to
/// reject or ignore.
pub trait Engine: Send {
    /// Begin the session. Called exactly once, right after construction.
    fn start(&mut self);

    /// Allocate a fresh code of `code_length` words. Eventually triggers
    /// `on_code`.
    fn allocate_code(&mut self, code_length: usize);

    /// Collect a code from `input`. Eventually triggers `on_code`.
    fn input_code(&mut self, input: Box<dyn CodeInput>);

    /// Use a code known in advance. Triggers `on_code` with the same value
    /// once accepted.
    fn set_code(&mut self, code: Code);

    /// Queue a payload for the peer.
    fn send(&mut self, plaintext: Vec<u8>);

    /// Begin teardown. Eventually triggers exactly one `on_closed`.
    fn close(&mut self);

    /// Install a transition trace.
    fn set_trace(&mut self, trace: Trace);
}

/// Everything an engine is constructed with besides its event sink.
pub struct EngineParams {
    /// Per-session random identifier.
    pub side: Side,
    /// Application identifier scoping codes on the rendezvous server.
    pub app_id: String,
    /// Rendezvous server address.
    pub relay_url: String,
    /// Event loop the engine schedules its work on, if any.
    pub runtime: Option<tokio::runtime::Handle>,
    /// Transport-anonymization handle.
    pub transport: Option<TransportHandle>,
    /// Timing instrumentation.
    pub timing: Arc<dyn Timing>,
    /// Outbound-action journal.
    pub journal: Arc<dyn Journal>,
    /// Diagnostic stream for human-readable engine output.
    pub diagnostics: Option<Box<dyn Write + Send>>,
}

/// Builds an engine wired to a facade's event sink.
///
/// Implemented for any `FnOnce(EngineParams, Arc<dyn EventSink>) -> E`.
pub trait EngineFactory {
    /// Engine produced.
    type Engine: Engine;

    /// Construct the engine.
    fn build(self, params: EngineParams, events: Arc<dyn EventSink>) -> Self::Engine;
}

impl<F, E> EngineFactory for F
where
    F: FnOnce(EngineParams, Arc<dyn EventSink>) -> E,
    E: Engine,
{
    type Engine = E;

    fn build(self, params: EngineParams, events: Arc<dyn EventSink>) -> E {
        self(params, events)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn buffered_reader_yields_trimmed_code() {
        let mut input = Cursor::new(b"  7-guitarist-revenge \n".to_vec());
        assert_eq!(input.read_code("code: ").ok().as_deref(), Some("7-guitarist-revenge"));
    }

    #[test]
    fn exhausted_reader_is_an_error() {
        let mut input = Cursor::new(Vec::new());
        let err = input.read_code("code: ").err().map(|e| e.kind());
        assert_eq!(err, Some(io::ErrorKind::UnexpectedEof));
    }
}
