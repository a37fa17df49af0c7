//! Timing instrumentation handed to engines.

use std::sync::{Mutex, PoisonError};

use crate::env::Environment;

/// Sink for named timing events.
pub trait Timing: Send + Sync {
    /// Record that `event` happened now.
    fn record(&self, event: &str);
}

/// Records events with environment time and logs them at `trace` level.
pub struct DebugTiming<E: Environment> {
    env: E,
    events: Mutex<Vec<(String, E::Instant)>>,
}

impl<E: Environment> DebugTiming<E> {
    /// Create an empty recorder.
    pub fn new(env: E) -> Self {
        Self { env, events: Mutex::new(Vec::new()) }
    }

    /// Names of recorded events, oldest first.
    pub fn event_names(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Recorded events with their timestamps, oldest first.
    pub fn events(&self) -> Vec<(String, E::Instant)> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl<E: Environment> Timing for DebugTiming<E> {
    fn record(&self, event: &str) {
        let now = self.env.now();
        tracing::trace!(event, ?now, "timing");
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push((event.to_owned(), now));
    }
}
