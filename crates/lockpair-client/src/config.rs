//! Session construction parameters.

use std::{fmt, io::Write, sync::Arc};

use lockpair_core::{
    DebugTiming, EngineParams, Environment, ImmediateJournal, Journal, Side, Timing,
    TransportHandle,
};

/// Application identifier used when none is configured.
pub const DEFAULT_APP_ID: &str = "lockpair.dev/pairing";

/// Rendezvous server used when none is configured.
pub const DEFAULT_RELAY_URL: &str = "ws://localhost:4000/v1";

/// Session configuration.
///
/// Only the application id and relay URL are required; every collaborator
/// has a default.
pub struct SessionConfig {
    /// Application identifier scoping codes on the rendezvous server.
    pub app_id: String,
    /// Rendezvous server address.
    pub relay_url: String,
    /// Event loop for the engine. Defaults to the ambient tokio runtime, if
    /// there is one.
    pub runtime: Option<tokio::runtime::Handle>,
    /// Transport-anonymization handle, passed through untouched.
    pub transport: Option<TransportHandle>,
    /// Timing instrumentation. Defaults to [`DebugTiming`].
    pub timing: Option<Arc<dyn Timing>>,
    /// Outbound-action journal. Defaults to [`ImmediateJournal`].
    pub journal: Option<Arc<dyn Journal>>,
    /// Diagnostic stream for the engine's human-readable output.
    pub diagnostics: Option<Box<dyn Write + Send>>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_APP_ID, DEFAULT_RELAY_URL)
    }
}

impl SessionConfig {
    /// Configuration with default collaborators.
    pub fn new(app_id: impl Into<String>, relay_url: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            relay_url: relay_url.into(),
            runtime: None,
            transport: None,
            timing: None,
            journal: None,
            diagnostics: None,
        }
    }

    /// Run the engine on `runtime`.
    #[must_use]
    pub fn with_runtime(mut self, runtime: tokio::runtime::Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Pass an anonymizing transport handle to the engine.
    #[must_use]
    pub fn with_transport(mut self, transport: TransportHandle) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Record timing events into `timing`.
    #[must_use]
    pub fn with_timing(mut self, timing: Arc<dyn Timing>) -> Self {
        self.timing = Some(timing);
        self
    }

    /// Route outbound actions through `journal`.
    #[must_use]
    pub fn with_journal(mut self, journal: Arc<dyn Journal>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Send engine diagnostics to `diagnostics`.
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Box<dyn Write + Send>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// Resolve defaults and produce the engine's parameters.
    pub(crate) fn into_params<E: Environment>(self, side: Side, env: &E) -> EngineParams {
        EngineParams {
            side,
            app_id: self.app_id,
            relay_url: self.relay_url,
            runtime: self.runtime.or_else(|| tokio::runtime::Handle::try_current().ok()),
            transport: self.transport,
            timing: self.timing.unwrap_or_else(|| Arc::new(DebugTiming::new(env.clone()))),
            journal: self.journal.unwrap_or_else(|| Arc::new(ImmediateJournal)),
            diagnostics: self.diagnostics,
        }
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("app_id", &self.app_id)
            .field("relay_url", &self.relay_url)
            .field("runtime", &self.runtime.is_some())
            .field("transport", &self.transport.is_some())
            .field("timing", &self.timing.is_some())
            .field("journal", &self.journal.is_some())
            .field("diagnostics", &self.diagnostics.is_some())
            .finish()
    }
}
