//! Lockpair demo binary.
//!
//! Pairs two sessions over the in-memory loopback engine: one side allocates
//! a code, the other types it in, then every `--message` crosses from the
//! first side to the second before both close.
//!
//! # Usage
//!
//! ```bash
//! # Future-based frontends
//! lockpair-demo --message hello --message "second payload"
//!
//! # Push-based receiving side, with engine transition traces
//! lockpair-demo --push --trace --log-level debug
//! ```

use std::{io::Cursor, sync::Arc};

use clap::Parser;
use lockpair_client::{
    Frontend, SessionConfig, SessionError, TraceSelector, deferred_session, delegated_session,
};
use lockpair_core::LogTraceSink;
use lockpair_harness::{End, Loopback, RecordingDelegate, SimEnv};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Lockpair loopback demo
#[derive(Parser, Debug)]
#[command(name = "lockpair-demo")]
#[command(about = "Pair two lockpair sessions over an in-memory loopback")]
#[command(version)]
struct Args {
    /// Application identifier
    #[arg(long, default_value = lockpair_client::DEFAULT_APP_ID)]
    app_id: String,

    /// Rendezvous server address (passed to the engine, unused by loopback)
    #[arg(long, default_value = lockpair_client::DEFAULT_RELAY_URL)]
    relay_url: String,

    /// Number of words in the allocated code
    #[arg(long, default_value_t = lockpair_core::DEFAULT_CODE_LENGTH)]
    code_length: usize,

    /// Payload to send to the receiving side (repeatable)
    #[arg(short, long = "message")]
    messages: Vec<String>,

    /// Receive through a push delegate instead of futures
    #[arg(long)]
    push: bool,

    /// Seed for the deterministic environment
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log engine state transitions
    #[arg(long)]
    trace: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!(seed = args.seed, push = args.push, "Lockpair demo starting");

    let env = SimEnv::with_seed(args.seed);
    let wire = Loopback::new(env.clone());
    let config = || SessionConfig::new(args.app_id.clone(), args.relay_url.clone());

    let mut sender = deferred_session(config(), &env, wire.factory(End::Left));
    if args.trace {
        sender.enable_trace("sender", TraceSelector::default(), Arc::new(LogTraceSink));
    }

    sender.allocate_code(args.code_length);
    let code = sender.when_code().await?;
    tracing::info!(%code, "Code allocated");

    if args.push {
        let log = Arc::new(RecordingDelegate::new());
        let mut receiver =
            delegated_session(config(), &env, wire.factory(End::Right), Arc::clone(&log) as _);
        if args.trace {
            receiver.enable_trace("receiver", TraceSelector::default(), Arc::new(LogTraceSink));
        }
        receiver.input_code(Box::new(Cursor::new(format!("{code}\n").into_bytes())));

        let verifier = sender.when_verifier().await?;
        tracing::info!(%verifier, "Sessions verified");

        for message in &args.messages {
            sender.send(message.as_bytes().to_vec());
        }
        sender.close().await?;

        for event in log.events() {
            tracing::info!(%event, "Receiver delegate");
        }
    } else {
        let mut receiver = deferred_session(config(), &env, wire.factory(End::Right));
        if args.trace {
            receiver.enable_trace("receiver", TraceSelector::default(), Arc::new(LogTraceSink));
        }
        receiver.input_code(Box::new(Cursor::new(format!("{code}\n").into_bytes())));

        let verifier = sender.when_verifier().await?;
        let theirs = receiver.when_verifier().await?;
        tracing::info!(%verifier, matches = verifier == theirs, "Sessions verified");

        for message in &args.messages {
            sender.send(message.as_bytes().to_vec());
            let received = receiver.when_received().await?;
            tracing::info!(payload = %String::from_utf8_lossy(&received), "Receiver got payload");
        }

        sender.close().await?;
        match receiver.close().await {
            Ok(_) => tracing::info!("Receiver closed"),
            Err(SessionError::Protocol(e)) => tracing::warn!(error = %e, "Receiver closed badly"),
            Err(e) => return Err(e.into()),
        }
    }

    tracing::info!("Lockpair demo finished");
    Ok(())
}
