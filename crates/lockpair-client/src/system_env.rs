//! Production Environment implementation using system time and RNG.
//!
//! `SystemEnv` uses `std::time::Instant` for time and the OS cryptographic
//! RNG (getrandom) for randomness. Not reproducible, but suitable for
//! generating session sides.

use lockpair_core::Environment;

/// Production environment using system time and cryptographic RNG.
///
/// # Panics
///
/// Panics if the OS RNG fails. A client without working cryptographic
/// randomness cannot generate a trustworthy side; RNG failure indicates an
/// OS-level problem.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer)
            .expect("invariant: OS RNG failure is unrecoverable - cannot generate session side");
    }
}
