//! Worker records resolvable from a scanned badge.

use serde::{Deserialize, Serialize};

/// A worker who can be assigned to subphases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    /// Directory identifier
    pub id: String,

    /// Display name
    pub name: String,

    /// Badge barcode
    pub barcode: String,
}

impl Employee {
    /// Create an employee record.
    pub fn new(id: impl Into<String>, name: impl Into<String>, barcode: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            barcode: barcode.into(),
        }
    }
}
