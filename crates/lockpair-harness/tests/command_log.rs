//! Snapshot of the commands a frontend forwards to its engine.
//!
//! Commands must reach the engine unchanged and in call order, whichever
//! frontend issued them.

use std::{io::Cursor, sync::Arc};

use lockpair_client::{
    Frontend, SessionConfig, TraceSelector, deferred_session, delegated_session, session,
};
use lockpair_core::LogTraceSink;
use lockpair_harness::{RecordingDelegate, Script, SimEnv};

fn drive(frontend: &mut impl Frontend) {
    frontend.enable_trace("pairing", TraceSelector::default(), Arc::new(LogTraceSink));
    frontend.allocate_code(2);
    frontend.input_code(Box::new(Cursor::new(b"3-eyeglass-kickoff\n".to_vec())));
    frontend.set_code("5-revenge-locale".into());
    frontend.send(b"hello".to_vec());
}

#[test]
fn future_frontend_forwards_commands_verbatim() {
    let script = Script::new();
    let mut frontend = deferred_session(SessionConfig::default(), &SimEnv::default(), script.factory());
    drive(&mut frontend);
    let _ = frontend.close();

    insta::assert_snapshot!(script.command_log(), @r"
    start
    set_trace pairing
    allocate_code 2
    input_code 3-eyeglass-kickoff
    set_code 5-revenge-locale
    send hello
    close
    ");
}

#[test]
fn push_frontend_forwards_the_same_commands() {
    let future_script = Script::new();
    let mut future = session(SessionConfig::default(), &SimEnv::default(), future_script.factory(), None);
    drive(&mut future);
    let _ = future.close();

    let push_script = Script::new();
    let mut push = delegated_session(
        SessionConfig::default(),
        &SimEnv::default(),
        push_script.factory(),
        Arc::new(RecordingDelegate::new()),
    );
    drive(&mut push);
    push.close();

    assert_eq!(push_script.commands(), future_script.commands());
}

#[test]
fn failed_code_input_is_recorded() {
    let script = Script::new();
    let mut frontend = deferred_session(SessionConfig::default(), &SimEnv::default(), script.factory());
    frontend.input_code(Box::new(Cursor::new(Vec::<u8>::new())));

    insta::assert_snapshot!(script.command_log(), @r"
    start
    input_code failed: no code entered
    ");
}

#[test]
fn delegate_transcript_follows_engine_events() {
    use lockpair_client::{CloseResult, ProtocolError, ProtocolErrorKind};

    let script = Script::new();
    let log = Arc::new(RecordingDelegate::new());
    let _push = delegated_session(
        SessionConfig::default(),
        &SimEnv::default(),
        script.factory(),
        Arc::clone(&log) as _,
    );

    assert!(script.code("3-crumpled-flagpole").is_ok());
    assert!(script.verifier(&[0xca, 0xfe]).is_ok());
    assert!(script.received(b"hello").is_ok());
    let mismatch = ProtocolError::new(ProtocolErrorKind::VerificationMismatch, "codes differ");
    assert!(script.closed(CloseResult::from(mismatch)).is_ok());
    assert!(script.received(b"too late").is_err());

    insta::assert_snapshot!(log.transcript(), @r"
    code 3-crumpled-flagpole
    verifier cafe
    message hello
    closed error (verification mismatch: codes differ)
    ");
}
