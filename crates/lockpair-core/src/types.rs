//! Session values exchanged between the engine and its consumers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::env::Environment;

/// Number of words in an allocated code when the caller has no preference.
pub const DEFAULT_CODE_LENGTH: usize = 2;

/// Number of random bytes in a [`Side`].
pub const SIDE_BYTES: usize = 5;

/// Short, human-relayable pairing code (e.g. `4-purple-sausages`).
///
/// Produced at most once per session, then immutable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Code(String);

impl Code {
    /// Wrap a code string.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading channel number of a `N-word-word` code, if it has one.
    pub fn nameplate(&self) -> Option<&str> {
        self.0.split_once('-').map(|(nameplate, _)| nameplate)
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Code {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<String> for Code {
    fn from(code: String) -> Self {
        Self(code)
    }
}

/// Out-of-band confirmation material derived from the key exchange.
///
/// Displayed as lowercase hex so both users can compare it by eye.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Verifier(Vec<u8>);

impl Verifier {
    /// Wrap raw verifier bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw verifier bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Display for Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Per-session random identifier handed to the engine.
///
/// Opaque to the facade: it is generated once at construction and only ever
/// passed through.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Side(String);

impl Side {
    /// Draw a fresh side from the environment's RNG.
    pub fn generate<E: Environment>(env: &E) -> Self {
        let mut bytes = [0u8; SIDE_BYTES];
        env.random_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Side as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The four engine-originated event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Negotiated code.
    Code,
    /// Verifier value.
    Verifier,
    /// Received payload.
    Received,
    /// Terminal close.
    Closed,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Code => "code",
            Self::Verifier => "verifier",
            Self::Received => "received",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use proptest::prelude::*;

    use super::*;

    #[derive(Clone)]
    struct CountingEnv(u8);

    impl Environment for CountingEnv {
        type Instant = Instant;

        #[allow(clippy::disallowed_methods)]
        fn now(&self) -> Instant {
            Instant::now()
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            for (i, byte) in buffer.iter_mut().enumerate() {
                *byte = self.0.wrapping_add(i as u8);
            }
        }
    }

    #[test]
    fn side_is_ten_hex_chars() {
        let side = Side::generate(&CountingEnv(0xa0));
        assert_eq!(side.as_str(), "a0a1a2a3a4");
    }

    #[test]
    fn verifier_displays_as_hex() {
        let verifier = Verifier::new(vec![0x00, 0xff, 0x10]);
        assert_eq!(verifier.to_string(), "00ff10");
    }

    #[test]
    fn code_nameplate_is_leading_number() {
        assert_eq!(Code::from("4-purple-sausages").nameplate(), Some("4"));
        assert_eq!(Code::from("nodash").nameplate(), None);
    }

    proptest! {
        #[test]
        fn prop_side_always_lowercase_hex(seed in any::<u8>()) {
            let side = Side::generate(&CountingEnv(seed));
            prop_assert_eq!(side.as_str().len(), SIDE_BYTES * 2);
            prop_assert!(side.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }
}
