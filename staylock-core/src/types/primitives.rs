use serde::{Deserialize, Serialize};

/// Identifier of a rentable property. Existence is checked by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyId(pub u64);

impl std::fmt::Display for PropertyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PropertyId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Opaque caller-bound identifier of a soft lock.
///
/// Stable across the requests of one booking session, freshly generated on
/// the first probe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockToken(String);

impl LockToken {
    /// Length of generated tokens
    pub const GENERATED_LEN: usize = 21;

    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Generates a fresh random token for a new booking session.
    pub fn generate() -> Self {
        Self(nanoid::format(
            nanoid::rngs::default,
            &nanoid::alphabet::SAFE,
            Self::GENERATED_LEN,
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LockToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LockToken {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

/// Guest metadata recorded on a confirmed reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl GuestDetails {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
        }
    }
}
