//! Outbound-action journal handed to engines.
//!
//! Engines that persist their state route every outbound side effect through
//! a journal so the effect runs only once the state change that caused it has
//! been checkpointed. The facade itself never inspects the journal.

/// Deferred outbound side effect.
pub type OutboundAction = Box<dyn FnOnce() + Send>;

/// Sink for outbound actions.
pub trait Journal: Send + Sync {
    /// Queue an action to run after the current checkpoint.
    fn queue_outbound(&self, action: OutboundAction);
}

/// Journal without persistence: every action runs immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateJournal;

impl Journal for ImmediateJournal {
    fn queue_outbound(&self, action: OutboundAction) {
        action();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    #[test]
    fn immediate_journal_runs_action_inline() {
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);

        ImmediateJournal.queue_outbound(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
