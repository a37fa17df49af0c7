//! In-memory engine pair that pairs two sessions without a network.
//!
//! [`Loopback`] owns the shared wire; each of its two [`End`]s builds one
//! [`LoopbackEngine`]. The engines behave like a real pairing engine, only
//! much simpler:
//!
//! - a code is allocated from the environment's RNG, or set/input directly
//! - once both ends know a code, equal codes produce the same verifier
//!   (SHA-256 of the code) on both ends and unequal codes close both ends
//!   with a verification mismatch
//! - payloads sent before verification are held and flushed after it
//! - closing a verified end closes its peer too
//!
//! Events are delivered synchronously on the caller's stack, through each
//! end's journal, and never while the wire lock is held.

use std::{
    io::Write,
    mem,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use lockpair_core::{
    Code, CloseResult, CodeInput, Engine, EngineFactory, EngineParams, Environment, EventSink,
    Journal, ProtocolError, ProtocolErrorKind, RouterError, Side, Timing, Trace, Verifier,
};
use sha2::{Digest, Sha256};

const WORDS: [&str; 16] = [
    "absurd", "blowtorch", "crumpled", "drumbeat", "eyeglass", "flagpole", "guitarist", "hamlet",
    "indoors", "jawbone", "kickoff", "locale", "mohawk", "northward", "offload", "revenge",
];

/// One end of a [`Loopback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum End {
    /// The end that usually allocates the code.
    Left,
    /// The end that usually types it in.
    Right,
}

impl End {
    fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }

    fn peer(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

#[derive(Default)]
struct Endpoint {
    sink: Option<Arc<dyn EventSink>>,
    journal: Option<Arc<dyn Journal>>,
    code: Option<Code>,
    verified: bool,
    closed: bool,
    held: Vec<Vec<u8>>,
}

#[derive(Default)]
struct Wire {
    ends: [Endpoint; 2],
}

impl Wire {
    fn end(&mut self, end: End) -> &mut Endpoint {
        &mut self.ends[end.index()]
    }
}

/// Event to hand to one end's sink once the wire is unlocked.
enum Delivery {
    Code(Code),
    Verifier(Verifier),
    Received(Vec<u8>),
    Closed(CloseResult),
}

struct Outgoing {
    sink: Arc<dyn EventSink>,
    journal: Option<Arc<dyn Journal>>,
    delivery: Delivery,
}

impl Outgoing {
    /// Hand the event to the sink, through the endpoint's journal if it has
    /// one. Every event takes the same path so a deferring journal cannot
    /// reorder them.
    fn deliver(self) {
        let Self { sink, journal, delivery } = self;
        match journal {
            Some(journal) => {
                journal.queue_outbound(Box::new(move || report(dispatch(&*sink, delivery))));
            },
            None => report(dispatch(&*sink, delivery)),
        }
    }
}

fn dispatch(sink: &dyn EventSink, delivery: Delivery) -> Option<RouterError> {
    match delivery {
        Delivery::Code(code) => sink.on_code(code),
        Delivery::Verifier(verifier) => sink.on_verifier(verifier),
        Delivery::Received(plaintext) => sink.on_received(plaintext),
        Delivery::Closed(result) => sink.on_closed(result),
    }
    .err()
}

fn report(error: Option<RouterError>) {
    if let Some(e) = error {
        tracing::warn!(error = %e, "loopback event rejected");
    }
}

/// Shared wire between two loopback engines.
pub struct Loopback<E: Environment> {
    env: E,
    wire: Arc<Mutex<Wire>>,
}

impl<E: Environment> Loopback<E> {
    /// Fresh wire; codes are drawn from `env`.
    pub fn new(env: E) -> Self {
        Self { env, wire: Arc::new(Mutex::new(Wire::default())) }
    }

    /// Factory for the engine at `end`. Use once per end.
    pub fn factory(&self, end: End) -> impl EngineFactory<Engine = LoopbackEngine<E>> + use<E> {
        let env = self.env.clone();
        let wire = Arc::clone(&self.wire);
        move |params: EngineParams, events: Arc<dyn EventSink>| {
            {
                let mut guard = lock(&wire);
                let endpoint = guard.end(end);
                endpoint.sink = Some(events);
                endpoint.journal = Some(params.journal);
            }
            LoopbackEngine {
                end,
                env,
                wire,
                side: params.side,
                timing: params.timing,
                diagnostics: params.diagnostics,
                trace: None,
            }
        }
    }
}

/// Engine half of a [`Loopback`].
pub struct LoopbackEngine<E: Environment> {
    end: End,
    env: E,
    wire: Arc<Mutex<Wire>>,
    side: Side,
    timing: Arc<dyn Timing>,
    diagnostics: Option<Box<dyn Write + Send>>,
    trace: Option<Trace>,
}

impl<E: Environment> LoopbackEngine<E> {
    /// Side this engine was built with.
    pub fn side(&self) -> &Side {
        &self.side
    }

    fn emit(&self, machine: &str, old_state: &str, input: &str, new_state: &str) {
        if let Some(trace) = &self.trace {
            trace.emit(machine, old_state, input, new_state);
        }
    }

    fn diagnose(&mut self, line: &str) {
        if let Some(out) = self.diagnostics.as_mut()
            && let Err(e) = writeln!(out, "{line}")
        {
            tracing::warn!(error = %e, "diagnostic write failed");
        }
    }

    fn generate_code(&self, code_length: usize) -> Code {
        let nameplate = 1 + self.env.random_u64() % 99;
        let mut parts = vec![nameplate.to_string()];
        for _ in 0..code_length {
            let index = (self.env.random_u64() % WORDS.len() as u64) as usize;
            parts.push(WORDS[index].to_owned());
        }
        Code::from(parts.join("-"))
    }

    /// Record our code and pair with the peer if it has one too.
    fn learn_code(&mut self, code: Code) {
        let outgoing = {
            let mut wire = lock(&self.wire);
            let mut outgoing = Vec::new();
            let me = wire.end(self.end);
            if me.closed || me.code.is_some() {
                tracing::debug!(end = ?self.end, "code ignored");
                return;
            }
            me.code = Some(code.clone());
            outgoing.extend(to(me, Delivery::Code(code)));
            outgoing.extend(pair(&mut wire));
            outgoing
        };

        self.timing.record("code");
        self.emit("C", "S0_idle", "got_code", "S1_known");
        if outgoing.iter().any(|o| matches!(o.delivery, Delivery::Verifier(_))) {
            self.timing.record("verified");
            self.emit("K", "S0_know_nothing", "got_pake", "S1_verified");
        }
        outgoing.into_iter().for_each(Outgoing::deliver);
    }
}

fn to(endpoint: &Endpoint, delivery: Delivery) -> Option<Outgoing> {
    let sink = Arc::clone(endpoint.sink.as_ref()?);
    Some(Outgoing { sink, journal: endpoint.journal.clone(), delivery })
}

/// Compare codes once both ends have one.
fn pair(wire: &mut Wire) -> Vec<Outgoing> {
    let [left, right] = &mut wire.ends;
    let (Some(left_code), Some(right_code)) = (&left.code, &right.code) else {
        return Vec::new();
    };
    if left.closed || right.closed {
        return Vec::new();
    }

    let mut outgoing = Vec::new();
    if left_code == right_code {
        let verifier = Verifier::new(Sha256::digest(left_code.as_str().as_bytes()).to_vec());
        tracing::debug!(%verifier, "loopback ends verified");
        for endpoint in [&mut *left, &mut *right] {
            endpoint.verified = true;
            outgoing.extend(to(endpoint, Delivery::Verifier(verifier.clone())));
        }
        for payload in mem::take(&mut left.held) {
            outgoing.extend(to(right, Delivery::Received(payload)));
        }
        for payload in mem::take(&mut right.held) {
            outgoing.extend(to(left, Delivery::Received(payload)));
        }
    } else {
        tracing::debug!("loopback codes differ");
        let err = ProtocolError::new(ProtocolErrorKind::VerificationMismatch, "codes differ");
        for endpoint in [&mut *left, &mut *right] {
            endpoint.closed = true;
            outgoing.extend(to(endpoint, Delivery::Closed(CloseResult::from(err.clone()))));
        }
    }
    outgoing
}

impl<E: Environment> Engine for LoopbackEngine<E> {
    fn start(&mut self) {
        tracing::debug!(side = %self.side, end = ?self.end, "loopback engine started");
        self.timing.record("start");
        self.emit("B", "S0_empty", "start", "S1_lonely");
    }

    fn allocate_code(&mut self, code_length: usize) {
        let code = self.generate_code(code_length);
        self.diagnose(&format!("Pairing code is: {code}"));
        self.learn_code(code);
    }

    fn input_code(&mut self, mut input: Box<dyn CodeInput>) {
        match input.read_code("Enter pairing code: ") {
            Ok(code) => self.learn_code(Code::from(code)),
            Err(e) => {
                tracing::debug!(error = %e, "code input failed");
                let outgoing = {
                    let mut wire = lock(&self.wire);
                    let me = wire.end(self.end);
                    if me.closed {
                        return;
                    }
                    me.closed = true;
                    let err = ProtocolError::new(ProtocolErrorKind::Other, e.to_string());
                    to(me, Delivery::Closed(CloseResult::from(err)))
                };
                outgoing.into_iter().for_each(Outgoing::deliver);
            },
        }
    }

    fn set_code(&mut self, code: Code) {
        self.learn_code(code);
    }

    fn send(&mut self, plaintext: Vec<u8>) {
        let outgoing = {
            let mut wire = lock(&self.wire);
            let me = wire.end(self.end);
            if me.closed {
                tracing::debug!("send after close dropped");
                return;
            }
            if !me.verified {
                me.held.push(plaintext);
                return;
            }
            to(wire.end(self.end.peer()), Delivery::Received(plaintext))
        };
        outgoing.into_iter().for_each(Outgoing::deliver);
    }

    fn close(&mut self) {
        self.timing.record("close");
        self.emit("T", "S0_open", "close", "S1_closing");

        let outgoing = {
            let mut wire = lock(&self.wire);
            let me = wire.end(self.end);
            if me.closed {
                return;
            }
            me.closed = true;
            let verified = me.verified;
            let result = if verified {
                CloseResult::empty()
            } else {
                CloseResult::from(ProtocolError::new(
                    ProtocolErrorKind::Lonely,
                    "closed before the peer verified",
                ))
            };
            let mut outgoing: Vec<Outgoing> = to(me, Delivery::Closed(result)).into_iter().collect();

            let peer = wire.end(self.end.peer());
            if verified && !peer.closed {
                peer.closed = true;
                outgoing.extend(to(peer, Delivery::Closed(CloseResult::empty())));
            }
            outgoing
        };
        outgoing.into_iter().for_each(Outgoing::deliver);
    }

    fn set_trace(&mut self, trace: Trace) {
        self.trace = Some(trace);
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
