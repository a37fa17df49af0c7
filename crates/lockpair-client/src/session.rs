//! Session construction.
//!
//! A session is one engine plus one frontend, wired together through an
//! [`EventRouter`]. The frontend is chosen once, at construction, and never
//! changes:
//!
//! - [`deferred_session`]: future-based
//! - [`delegated_session`]: push-based
//! - [`session`]: either, depending on whether a delegate is supplied
//!
//! Construction generates the session's [`Side`], resolves configuration
//! defaults, builds the engine through the supplied [`EngineFactory`] and
//! starts it. Nothing else happens until the consumer issues a command.

use std::sync::{Arc, Mutex};

use lockpair_core::{Engine, EngineFactory, Environment, EventSink, Side};

use crate::{
    config::SessionConfig,
    frontend::{
        Delegate, Frontend, FrontendSnapshot, FutureFrontend, PushFrontend, future::FutureState,
        push::PushState,
    },
    router::EventRouter,
    waiter::Pending,
};

/// A session with either frontend.
///
/// Returned by [`session`]. Use [`Session::as_future`] to reach the
/// `when_*` accessors.
pub enum Session<E: Engine> {
    /// Future-based frontend.
    Future(FutureFrontend<E>),
    /// Push-based frontend.
    Push(PushFrontend<E>),
}

impl<E: Engine> Session<E> {
    /// Ask the engine to close.
    ///
    /// Future-based sessions return a future of the close result; push-based
    /// sessions report through the delegate and return `None`.
    pub fn close(&mut self) -> Option<Pending<Vec<u8>>> {
        match self {
            Self::Future(frontend) => Some(frontend.close()),
            Self::Push(frontend) => {
                frontend.close();
                None
            },
        }
    }

    /// The future-based frontend, if this session uses one.
    pub fn as_future(&self) -> Option<&FutureFrontend<E>> {
        match self {
            Self::Future(frontend) => Some(frontend),
            Self::Push(_) => None,
        }
    }

    /// The push-based frontend, if this session uses one.
    pub fn as_push(&self) -> Option<&PushFrontend<E>> {
        match self {
            Self::Future(_) => None,
            Self::Push(frontend) => Some(frontend),
        }
    }

    /// Observable frontend state.
    pub fn snapshot(&self) -> FrontendSnapshot {
        match self {
            Self::Future(frontend) => frontend.snapshot(),
            Self::Push(frontend) => frontend.snapshot(),
        }
    }
}

impl<E: Engine> Frontend for Session<E> {
    type Engine = E;

    fn engine_mut(&mut self) -> &mut E {
        match self {
            Self::Future(frontend) => frontend.engine_mut(),
            Self::Push(frontend) => frontend.engine_mut(),
        }
    }

    fn engine(&self) -> &E {
        match self {
            Self::Future(frontend) => frontend.engine(),
            Self::Push(frontend) => frontend.engine(),
        }
    }

    fn side(&self) -> &Side {
        match self {
            Self::Future(frontend) => frontend.side(),
            Self::Push(frontend) => frontend.side(),
        }
    }
}

/// Build a session, push-based if `delegate` is given, future-based
/// otherwise.
pub fn session<Env, F>(
    config: SessionConfig,
    env: &Env,
    factory: F,
    delegate: Option<Arc<dyn Delegate>>,
) -> Session<F::Engine>
where
    Env: Environment,
    F: EngineFactory,
{
    match delegate {
        Some(delegate) => Session::Push(delegated_session(config, env, factory, delegate)),
        None => Session::Future(deferred_session(config, env, factory)),
    }
}

/// Build a future-based session.
pub fn deferred_session<Env, F>(
    config: SessionConfig,
    env: &Env,
    factory: F,
) -> FutureFrontend<F::Engine>
where
    Env: Environment,
    F: EngineFactory,
{
    let state = Arc::new(Mutex::new(FutureState::default()));
    let (engine, side) = build_engine(config, env, factory, EventRouter::future(Arc::clone(&state)));
    FutureFrontend::new(engine, side, state)
}

/// Build a push-based session reporting to `delegate`.
pub fn delegated_session<Env, F>(
    config: SessionConfig,
    env: &Env,
    factory: F,
    delegate: Arc<dyn Delegate>,
) -> PushFrontend<F::Engine>
where
    Env: Environment,
    F: EngineFactory,
{
    let state = Arc::new(PushState::new(delegate));
    let (engine, side) = build_engine(config, env, factory, EventRouter::push(Arc::clone(&state)));
    PushFrontend::new(engine, side, state)
}

fn build_engine<Env, F>(
    config: SessionConfig,
    env: &Env,
    factory: F,
    router: EventRouter,
) -> (F::Engine, Side)
where
    Env: Environment,
    F: EngineFactory,
{
    let side = Side::generate(env);
    tracing::debug!(
        %side,
        app_id = %config.app_id,
        relay_url = %config.relay_url,
        push = router.is_push(),
        "building session"
    );

    let params = config.into_params(side.clone(), env);
    let events: Arc<dyn EventSink> = Arc::new(router);
    let mut engine = factory.build(params, events);
    engine.start();
    (engine, side)
}
