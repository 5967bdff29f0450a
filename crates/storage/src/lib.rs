//! Storage abstraction and implementations for optrack.
//!
//! This crate provides the work-item repository and employee directory
//! collaborators, with JSON-file and in-memory implementations.

#![warn(missing_docs)]

pub mod trait_;
pub mod json_storage;
pub mod memory;
pub mod directory;

pub use trait_::{Repository, EmployeeDirectory, StorageError, Result, Versioned};
pub use json_storage::JsonStorage;
pub use memory::MemoryStorage;
pub use directory::{MemoryDirectory, JsonDirectory};
