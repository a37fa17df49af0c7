//! Behaviour of the future-based frontend against a scripted engine.

use std::time::Duration;

use lockpair_client::{
    Code, CloseResult, Frontend, ProtocolError, ProtocolErrorKind, RouterError, SessionConfig,
    SessionError, Verifier, deferred_session,
};
use lockpair_harness::{Command, InvariantRegistry, Script, SimEnv};
use proptest::prelude::*;

fn started() -> (Script, lockpair_client::FutureFrontend<lockpair_harness::ScriptedEngine>) {
    let script = Script::new();
    let frontend = deferred_session(SessionConfig::default(), &SimEnv::default(), script.factory());
    (script, frontend)
}

fn mismatch() -> CloseResult {
    CloseResult::from(ProtocolError::new(ProtocolErrorKind::VerificationMismatch, "bad code"))
}

#[test]
fn construction_starts_engine_once() {
    let (script, frontend) = started();
    assert_eq!(script.commands(), vec![Command::Start]);
    assert_eq!(script.side().as_ref(), Some(frontend.side()));
    assert_eq!(frontend.side().as_str().len(), 10);
}

proptest! {
    /// Every early code waiter resolves with the one code.
    #[test]
    fn early_code_waiters_all_resolve(n in 1usize..32) {
        let (script, frontend) = started();
        let mut waiters: Vec<_> = (0..n).map(|_| frontend.when_code()).collect();
        prop_assert!(waiters.iter_mut().all(|w| w.try_take().is_none()));

        prop_assert_eq!(script.code("4-purple-sausages"), Ok(()));

        for waiter in &mut waiters {
            prop_assert_eq!(waiter.try_take(), Some(Ok(Code::from("4-purple-sausages"))));
        }
        prop_assert_eq!(frontend.snapshot().code_waiters, 0);
    }

    /// Buffered payloads come out in arrival order.
    #[test]
    fn buffered_payloads_keep_arrival_order(payloads in prop::collection::vec(any::<Vec<u8>>(), 0..16)) {
        let (script, frontend) = started();
        for payload in &payloads {
            prop_assert_eq!(script.received(payload), Ok(()));
        }

        let drained: Vec<_> =
            payloads.iter().filter_map(|_| frontend.when_received().try_take()).collect();
        let expected: Vec<Result<Vec<u8>, SessionError>> = payloads.into_iter().map(Ok).collect();
        prop_assert_eq!(drained, expected);
    }
}

#[test]
fn late_code_subscriber_resolves_immediately() {
    let (script, frontend) = started();
    assert_eq!(script.code("2-tango-zulu"), Ok(()));

    assert_eq!(frontend.when_code().try_take(), Some(Ok(Code::from("2-tango-zulu"))));
    assert_eq!(frontend.when_code().try_take(), Some(Ok(Code::from("2-tango-zulu"))));
}

#[test]
fn latest_verifier_is_cached() {
    let (script, frontend) = started();
    let mut early = frontend.when_verifier();
    assert_eq!(script.verifier(&[1]), Ok(()));
    assert_eq!(script.verifier(&[2]), Ok(()));

    assert_eq!(early.try_take(), Some(Ok(Verifier::new(vec![1]))));
    assert_eq!(frontend.when_verifier().try_take(), Some(Ok(Verifier::new(vec![2]))));
}

#[test]
fn three_payloads_three_waiters_in_order() {
    let (script, frontend) = started();
    for payload in [b"m1", b"m2", b"m3"] {
        assert_eq!(script.received(payload), Ok(()));
    }

    assert_eq!(frontend.when_received().try_take(), Some(Ok(b"m1".to_vec())));
    assert_eq!(frontend.when_received().try_take(), Some(Ok(b"m2".to_vec())));
    assert_eq!(frontend.when_received().try_take(), Some(Ok(b"m3".to_vec())));
}

#[test]
fn interleaved_waiters_and_payloads() {
    let (script, frontend) = started();
    let mut a = frontend.when_received();
    assert_eq!(script.received(b"m1"), Ok(()));
    assert_eq!(a.try_take(), Some(Ok(b"m1".to_vec())));

    // Nothing buffered: B queues.
    let mut b = frontend.when_received();
    assert!(b.try_take().is_none());
    assert_eq!(script.received(b"m2"), Ok(()));
    assert_eq!(b.try_take(), Some(Ok(b"m2".to_vec())));

    // Already buffered: C resolves at once.
    assert_eq!(script.received(b"m3"), Ok(()));
    assert_eq!(frontend.when_received().try_take(), Some(Ok(b"m3".to_vec())));
}

#[tokio::test]
async fn close_drains_pending_waiters() {
    let (script, frontend) = started();
    let verifier = frontend.when_verifier();
    let received = frontend.when_received();

    let closer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        script.closed(mismatch())
    });

    let expected = SessionError::Protocol(ProtocolError::new(
        ProtocolErrorKind::VerificationMismatch,
        "bad code",
    ));
    let (verifier, received) = futures::join!(verifier, received);
    assert_eq!(verifier, Err(expected.clone()));
    assert_eq!(received, Err(expected));
    assert_eq!(closer.await.ok(), Some(Ok(())));
}

#[test]
fn clean_close_fails_waiters_distinguishably() {
    let (script, frontend) = started();
    let mut received = frontend.when_received();
    assert_eq!(script.closed(CloseResult::Success(b"bye".to_vec())), Ok(()));

    let Some(Err(err)) = received.try_take() else {
        panic!("received waiter was not failed");
    };
    assert!(err.is_clean_close());
    assert_eq!(err, SessionError::ClosedWhilePending { result: b"bye".to_vec() });
}

#[test]
fn second_close_event_never_double_resolves() {
    let (script, mut frontend) = started();
    let mut first = frontend.close();

    assert_eq!(script.closed(CloseResult::Success(b"one".to_vec())), Ok(()));
    assert_eq!(script.closed(CloseResult::Success(b"two".to_vec())), Err(RouterError::AlreadyClosed));

    assert_eq!(first.try_take(), Some(Ok(b"one".to_vec())));
    assert_eq!(frontend.close().try_take(), Some(Ok(b"one".to_vec())));
}

#[test]
fn every_close_call_gets_its_own_future() {
    let (script, mut frontend) = started();
    let mut first = frontend.close();
    let mut second = frontend.close();
    assert_eq!(frontend.snapshot().close_waiters, 2);

    assert_eq!(script.closed(CloseResult::Cancelled), Ok(()));

    assert_eq!(first.try_take(), Some(Err(SessionError::Cancelled)));
    assert_eq!(second.try_take(), Some(Err(SessionError::Cancelled)));
    assert_eq!(
        script.commands(),
        vec![Command::Start, Command::Close, Command::Close]
    );
}

#[test]
fn synchronous_close_is_not_missed() {
    let (script, mut frontend) = started();
    script.close_synchronously(CloseResult::Success(b"fast".to_vec()));

    assert_eq!(frontend.close().try_take(), Some(Ok(b"fast".to_vec())));
    assert!(frontend.snapshot().lifecycle.close_requested);
}

#[test]
fn code_waiters_survive_close_until_session_drops() {
    let (script, frontend) = started();
    let mut code = frontend.when_code();
    assert_eq!(script.closed(CloseResult::empty()), Ok(()));

    assert!(code.try_take().is_none());
    assert!(frontend.when_code().try_take().is_none());
    InvariantRegistry::standard().assert_all(&frontend.snapshot(), "after close");

    drop(frontend);
    assert_eq!(code.try_take(), Some(Err(SessionError::Abandoned)));
    assert!(script.side().is_some());
}

#[tokio::test]
async fn dropping_the_session_releases_awaiting_futures() {
    let (script, mut frontend) = started();
    let code = frontend.when_code();
    let verifier = frontend.when_verifier();
    let received = frontend.when_received();
    let close = frontend.close();

    drop(frontend);

    let (code, verifier, received, close) = futures::join!(code, verifier, received, close);
    assert_eq!(code, Err(SessionError::Abandoned));
    assert_eq!(verifier, Err(SessionError::Abandoned));
    assert_eq!(received, Err(SessionError::Abandoned));
    assert_eq!(close, Err(SessionError::Abandoned));

    // The engine still holds its sink; late events land nowhere.
    assert_eq!(script.code("1-late"), Ok(()));
}

#[test]
fn late_registration_after_close() {
    let (script, frontend) = started();
    assert_eq!(script.received(b"kept"), Ok(()));
    assert_eq!(script.closed(mismatch()), Ok(()));

    assert!(matches!(frontend.when_verifier().try_take(), Some(Err(SessionError::Protocol(_)))));
    assert_eq!(frontend.when_received().try_take(), Some(Ok(b"kept".to_vec())));
    assert!(matches!(frontend.when_received().try_take(), Some(Err(SessionError::Protocol(_)))));
}

#[test]
fn dropped_waiter_does_not_swallow_payload() {
    let (script, frontend) = started();
    let abandoned = frontend.when_received();
    let mut live = frontend.when_received();
    drop(abandoned);

    assert_eq!(script.received(b"m1"), Ok(()));
    assert_eq!(live.try_take(), Some(Ok(b"m1".to_vec())));
}

#[test]
fn events_after_close_are_rejected() {
    let (script, frontend) = started();
    assert_eq!(script.closed(CloseResult::empty()), Ok(()));
    let before = frontend.snapshot();

    assert_eq!(
        script.code("1-late"),
        Err(RouterError::EventAfterClose { event: lockpair_client::EventKind::Code })
    );
    assert_eq!(
        script.received(b"late"),
        Err(RouterError::EventAfterClose { event: lockpair_client::EventKind::Received })
    );
    assert_eq!(frontend.snapshot(), before);
}

#[test]
fn commands_are_forwarded_in_order() {
    let (script, mut frontend) = started();
    frontend.allocate_code(3);
    frontend.set_code(Code::from("8-offload-locale"));
    frontend.send(b"payload".to_vec());

    assert_eq!(script.commands(), vec![
        Command::Start,
        Command::AllocateCode(3),
        Command::SetCode(Code::from("8-offload-locale")),
        Command::Send(b"payload".to_vec()),
    ]);
}

#[test]
fn echoed_code_resolves_waiter() {
    let (script, mut frontend) = started();
    script.echo_codes();
    let mut code = frontend.when_code();

    frontend.set_code(Code::from("6-hamlet-drumbeat"));
    assert_eq!(code.try_take(), Some(Ok(Code::from("6-hamlet-drumbeat"))));
    assert!(frontend.snapshot().lifecycle.code_known);
}
