//! Employee directory backends.

use std::collections::HashMap;
use std::path::Path;
use optrack_core::Employee;
use tracing::{debug, warn};
use super::{EmployeeDirectory, Result};

/// Directory held in memory, keyed by barcode.
#[derive(Debug, Default, Clone)]
pub struct MemoryDirectory {
    by_barcode: HashMap<String, Employee>,
}

impl MemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from a list of employees. Later duplicates win.
    pub fn from_employees(employees: impl IntoIterator<Item = Employee>) -> Self {
        let mut dir = Self::new();
        for employee in employees {
            dir.insert(employee);
        }
        dir
    }

    /// Add or replace an employee.
    pub fn insert(&mut self, employee: Employee) {
        self.by_barcode
            .insert(employee.barcode.trim().to_string(), employee);
    }

    /// Number of employees.
    pub fn len(&self) -> usize {
        self.by_barcode.len()
    }

    /// Whether the directory is empty.
    pub fn is_empty(&self) -> bool {
        self.by_barcode.is_empty()
    }
}

#[async_trait::async_trait]
impl EmployeeDirectory for MemoryDirectory {
    async fn resolve_by_barcode(&self, code: &str) -> Result<Option<Employee>> {
        // Scanners commonly append a newline or pad with spaces.
        Ok(self.by_barcode.get(code.trim()).cloned())
    }
}

/// Directory loaded from a JSON array of employees.
#[derive(Debug, Clone)]
pub struct JsonDirectory {
    inner: MemoryDirectory,
}

impl JsonDirectory {
    /// Load `path`. A missing file yields an empty directory.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let employees: Vec<Employee> = match crate::json_storage::read_json(path).await? {
            Some(list) => list,
            None => {
                warn!(path = %path.display(), "employee directory file not found; no workers can be resolved");
                Vec::new()
            }
        };
        debug!(count = employees.len(), "loaded employee directory");
        Ok(Self {
            inner: MemoryDirectory::from_employees(employees),
        })
    }

    /// Number of employees loaded.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether no employees were loaded.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait::async_trait]
impl EmployeeDirectory for JsonDirectory {
    async fn resolve_by_barcode(&self, code: &str) -> Result<Option<Employee>> {
        self.inner.resolve_by_barcode(code).await
    }
}
