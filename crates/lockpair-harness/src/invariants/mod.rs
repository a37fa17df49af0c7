//! Invariant checking for frontend state.
//!
//! Invariants are properties that must hold after every command and every
//! engine event, whatever order they arrive in. Tests take a
//! [`FrontendSnapshot`] after each step and run the registry against it.
//!
//! # Usage
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! registry.assert_all(&session.snapshot(), "after on_closed");
//! ```

mod checks;

pub use checks::{
    CachedValuesHaveNoWaiters, ChannelExclusivity, ClosedHoldsNoWaiters, FlagsImplyActive,
};
use lockpair_client::FrontendSnapshot;

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Invariant violation with context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Name of the violated invariant.
    pub invariant: &'static str,
    /// Description of what went wrong.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// A property checked against a frontend snapshot.
pub trait Invariant: Send + Sync {
    /// Invariant name for error reporting.
    fn name(&self) -> &'static str;

    /// Check the invariant against `state`.
    fn check(&self, state: &FrontendSnapshot) -> InvariantResult;
}

/// Registry of invariants to check.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Registry with every standard frontend invariant.
    ///
    /// Includes:
    /// - [`ChannelExclusivity`]: never both received waiters and buffered payloads
    /// - [`ClosedHoldsNoWaiters`]: a closed session only keeps code waiters
    /// - [`CachedValuesHaveNoWaiters`]: a known code or verifier has no waiters
    /// - [`FlagsImplyActive`]: knowledge flags are only set after an event
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(ChannelExclusivity);
        registry.add(ClosedHoldsNoWaiters);
        registry.add(CachedValuesHaveNoWaiters);
        registry.add(FlagsImplyActive);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants against `state`, collecting every violation.
    pub fn check_all(&self, state: &FrontendSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants, panicking with every violation found.
    #[allow(clippy::panic)]
    pub fn assert_all(&self, state: &FrontendSnapshot, context: &str) {
        if let Err(violations) = self.check_all(state) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("Invariant violation {context}:\n  {}", messages.join("\n  "));
        }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}
