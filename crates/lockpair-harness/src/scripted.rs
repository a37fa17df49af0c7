//! Engine driven by the test instead of a protocol.
//!
//! [`ScriptedEngine`] records every command it receives and otherwise does
//! nothing on its own. The test keeps a [`Script`] handle and fires engine
//! events through it whenever the scenario calls for one, so the exact
//! interleaving of commands, events and waiter registrations is under test
//! control.
//!
//! ```ignore
//! let script = Script::new();
//! let mut session = deferred_session(SessionConfig::default(), &env, script.factory());
//! let code = session.when_code();
//! script.code("4-purple-sausages")?;
//! ```

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError},
};

use lockpair_core::{
    Code, CloseResult, CodeInput, Engine, EngineFactory, EngineParams, EventSink, RouterError,
    Side, Trace, Verifier,
};

/// One command as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `start`
    Start,
    /// `allocate_code`
    AllocateCode(usize),
    /// `input_code`, with what the input produced.
    InputCode(Result<Code, String>),
    /// `set_code`
    SetCode(Code),
    /// `send`
    Send(Vec<u8>),
    /// `close`
    Close,
    /// `set_trace`, with the trace label.
    SetTrace(String),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::AllocateCode(length) => write!(f, "allocate_code {length}"),
            Self::InputCode(Ok(code)) => write!(f, "input_code {code}"),
            Self::InputCode(Err(e)) => write!(f, "input_code failed: {e}"),
            Self::SetCode(code) => write!(f, "set_code {code}"),
            Self::Send(payload) => write!(f, "send {}", String::from_utf8_lossy(payload)),
            Self::Close => f.write_str("close"),
            Self::SetTrace(label) => write!(f, "set_trace {label}"),
        }
    }
}

#[derive(Default)]
struct Shared {
    commands: Mutex<Vec<Command>>,
    sink: OnceLock<Arc<dyn EventSink>>,
    side: OnceLock<Side>,
    close_with: Mutex<Option<CloseResult>>,
    echo_codes: Mutex<bool>,
}

/// Test-side handle of a [`ScriptedEngine`].
///
/// Clones share the same engine.
#[derive(Clone, Default)]
pub struct Script {
    shared: Arc<Shared>,
}

impl Script {
    /// Handle for an engine that has not been built yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory building the engine this script drives. Use once.
    pub fn factory(&self) -> impl EngineFactory<Engine = ScriptedEngine> + use<> {
        let shared = Arc::clone(&self.shared);
        move |params: EngineParams, events: Arc<dyn EventSink>| {
            // A second build keeps the first sink.
            let _ = shared.sink.set(events);
            let _ = shared.side.set(params.side.clone());
            ScriptedEngine { shared, trace: None }
        }
    }

    /// Make `close()` fire `on_closed(result)` before returning.
    pub fn close_synchronously(&self, result: CloseResult) -> &Self {
        *lock(&self.shared.close_with) = Some(result);
        self
    }

    /// Make `set_code()` and `input_code()` fire `on_code` before returning.
    pub fn echo_codes(&self) -> &Self {
        *lock(&self.shared.echo_codes) = true;
        self
    }

    /// Commands received so far.
    pub fn commands(&self) -> Vec<Command> {
        lock(&self.shared.commands).clone()
    }

    /// Commands received so far, one per line.
    pub fn command_log(&self) -> String {
        self.commands().iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
    }

    /// Side the engine was built with.
    pub fn side(&self) -> Option<Side> {
        self.shared.side.get().cloned()
    }

    /// Fire `on_code`.
    pub fn code(&self, code: &str) -> Result<(), RouterError> {
        self.sink().on_code(Code::from(code))
    }

    /// Fire `on_verifier`.
    pub fn verifier(&self, verifier: &[u8]) -> Result<(), RouterError> {
        self.sink().on_verifier(Verifier::new(verifier.to_vec()))
    }

    /// Fire `on_received`.
    pub fn received(&self, plaintext: &[u8]) -> Result<(), RouterError> {
        self.sink().on_received(plaintext.to_vec())
    }

    /// Fire `on_closed`.
    pub fn closed(&self, result: CloseResult) -> Result<(), RouterError> {
        self.sink().on_closed(result)
    }

    #[allow(clippy::expect_used)]
    fn sink(&self) -> &Arc<dyn EventSink> {
        self.shared.sink.get().expect("script fired an event before the engine was built")
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Script")
            .field("built", &self.shared.sink.get().is_some())
            .field("commands", &lock(&self.shared.commands).len())
            .finish()
    }
}

/// Engine that records commands and fires only what its [`Script`] says.
pub struct ScriptedEngine {
    shared: Arc<Shared>,
    trace: Option<Trace>,
}

impl ScriptedEngine {
    /// Trace installed through `set_trace`, if any.
    pub fn trace(&self) -> Option<&Trace> {
        self.trace.as_ref()
    }

    fn record(&self, command: Command) {
        tracing::trace!(%command, "scripted engine command");
        lock(&self.shared.commands).push(command);
    }

    fn echo(&self, code: Code) {
        let echo = *lock(&self.shared.echo_codes);
        if echo
            && let Some(sink) = self.shared.sink.get()
            && let Err(e) = sink.on_code(code)
        {
            tracing::warn!(error = %e, "echoed code rejected");
        }
    }
}

impl Engine for ScriptedEngine {
    fn start(&mut self) {
        self.record(Command::Start);
    }

    fn allocate_code(&mut self, code_length: usize) {
        self.record(Command::AllocateCode(code_length));
    }

    fn input_code(&mut self, mut input: Box<dyn CodeInput>) {
        match input.read_code("Enter code: ") {
            Ok(code) => {
                let code = Code::from(code);
                self.record(Command::InputCode(Ok(code.clone())));
                self.echo(code);
            },
            Err(e) => self.record(Command::InputCode(Err(e.to_string()))),
        }
    }

    fn set_code(&mut self, code: Code) {
        self.record(Command::SetCode(code.clone()));
        self.echo(code);
    }

    fn send(&mut self, plaintext: Vec<u8>) {
        self.record(Command::Send(plaintext));
    }

    fn close(&mut self) {
        self.record(Command::Close);
        let result = lock(&self.shared.close_with).take();
        if let Some(result) = result
            && let Some(sink) = self.shared.sink.get()
            && let Err(e) = sink.on_closed(result)
        {
            tracing::warn!(error = %e, "synchronous close rejected");
        }
    }

    fn set_trace(&mut self, trace: Trace) {
        self.record(Command::SetTrace(trace.label().to_owned()));
        self.trace = Some(trace);
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
