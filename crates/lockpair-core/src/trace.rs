//! State-transition tracing for engines.
//!
//! A consumer installs a [`Trace`] through `enable_trace`; the engine calls
//! [`Trace::emit`] on every internal transition and the trace forwards the
//! ones whose machine is selected.

use std::{collections::BTreeSet, fmt, sync::Arc};

/// Machines traced when the caller does not choose.
pub const DEFAULT_TRACE_MACHINES: &str = "B N M S O K R RC NL C T";

/// Set of machine names whose transitions are reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceSelector {
    machines: BTreeSet<String>,
}

impl TraceSelector {
    /// Parse a whitespace-separated list of machine names.
    pub fn parse(machines: &str) -> Self {
        Self { machines: machines.split_whitespace().map(str::to_owned).collect() }
    }

    /// Whether transitions of `machine` are reported.
    pub fn contains(&self, machine: &str) -> bool {
        self.machines.contains(machine)
    }

    /// Number of selected machines.
    pub fn len(&self) -> usize {
        self.machines.len()
    }

    /// True if nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }
}

impl Default for TraceSelector {
    fn default() -> Self {
        Self::parse(DEFAULT_TRACE_MACHINES)
    }
}

impl fmt::Display for TraceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.machines.iter().map(String::as_str).collect();
        f.write_str(&names.join(" "))
    }
}

/// Receiver of traced transitions.
///
/// Arguments are `(session_label, machine, old_state, input, new_state)`.
pub trait TraceSink: Send + Sync {
    /// Report one transition.
    fn transition(&self, label: &str, machine: &str, old_state: &str, input: &str, new_state: &str);
}

impl<F> TraceSink for F
where
    F: Fn(&str, &str, &str, &str, &str) + Send + Sync,
{
    fn transition(&self, label: &str, machine: &str, old_state: &str, input: &str, new_state: &str) {
        self(label, machine, old_state, input, new_state);
    }
}

/// Default sink: one `tracing` event per transition on `lockpair::trace`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTraceSink;

impl TraceSink for LogTraceSink {
    fn transition(&self, label: &str, machine: &str, old_state: &str, input: &str, new_state: &str) {
        tracing::debug!(
            target: "lockpair::trace",
            "{label}.{machine}[{old_state}].{input} -> [{new_state}]"
        );
    }
}

/// Installed trace: label, selector and sink bundled for the engine.
#[derive(Clone)]
pub struct Trace {
    label: String,
    selector: TraceSelector,
    sink: Arc<dyn TraceSink>,
}

impl Trace {
    /// Bundle a trace configuration.
    pub fn new(label: impl Into<String>, selector: TraceSelector, sink: Arc<dyn TraceSink>) -> Self {
        Self { label: label.into(), selector, sink }
    }

    /// Trace every default machine into [`LogTraceSink`].
    pub fn logging(label: impl Into<String>) -> Self {
        Self::new(label, TraceSelector::default(), Arc::new(LogTraceSink))
    }

    /// Session label passed to the sink.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Selected machines.
    pub fn selector(&self) -> &TraceSelector {
        &self.selector
    }

    /// Forward a transition if its machine is selected.
    pub fn emit(&self, machine: &str, old_state: &str, input: &str, new_state: &str) {
        if self.selector.contains(machine) {
            self.sink.transition(&self.label, machine, old_state, input, new_state);
        }
    }
}

impl fmt::Debug for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trace")
            .field("label", &self.label)
            .field("selector", &self.selector.to_string())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn default_selector_has_all_machines() {
        let selector = TraceSelector::default();
        assert_eq!(selector.len(), 11);
        assert!(selector.contains("RC"));
        assert!(selector.contains("NL"));
        assert!(!selector.contains("X"));
    }

    #[test]
    fn logging_trace_selects_default_machines() {
        let trace = Trace::logging("bob");
        assert_eq!(trace.label(), "bob");
        assert_eq!(trace.selector().to_string(), "B C K M N NL O R RC S T");
    }

    #[test]
    fn selector_ignores_extra_whitespace() {
        let selector = TraceSelector::parse("  B   K ");
        assert_eq!(selector.to_string(), "B K");
    }

    #[test]
    fn emit_filters_unselected_machines() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let sink = move |label: &str, machine: &str, old: &str, input: &str, new: &str| {
            if let Ok(mut seen) = sink_seen.lock() {
                seen.push(format!("{label}.{machine}[{old}].{input} -> [{new}]"));
            }
        };
        let trace = Trace::new("alice", TraceSelector::parse("B"), Arc::new(sink));

        trace.emit("B", "S0", "start", "S1");
        trace.emit("K", "S0", "got_pake", "S1");

        let seen = seen.lock().map(|s| s.clone()).unwrap_or_default();
        assert_eq!(seen, vec!["alice.B[S0].start -> [S1]".to_string()]);
    }
}
