//! Identifiers for tracked entities.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Caller-assigned identity of a work item.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartNumber(String);

/// Error returned when a part number is blank.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("part number must not be empty")]
pub struct EmptyPartNumber;

impl PartNumber {
    /// Create a part number. Surrounding whitespace is trimmed.
    pub fn new(value: impl AsRef<str>) -> Result<Self, EmptyPartNumber> {
        let value = value.as_ref().trim();
        if value.is_empty() {
            return Err(EmptyPartNumber);
        }
        Ok(Self(value.to_string()))
    }

    /// Borrow the raw string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PartNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PartNumber {
    type Err = EmptyPartNumber;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Unique identifier for a Phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhaseId(Ulid);

impl PhaseId {
    /// Generate a new PhaseId
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for PhaseId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PhaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for PhaseId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Unique identifier for a Subphase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubphaseId(Ulid);

impl SubphaseId {
    /// Generate a new SubphaseId
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SubphaseId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubphaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for SubphaseId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}
