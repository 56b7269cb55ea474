//! Local persistence for users.
//!
//! This module provides:
//! - The `CacheStore` contract consumed by the sync layer
//! - A SQLite-backed store for real use
//! - An in-memory store for tests and throwaway sessions
//!
//! Stores never surface errors to their callers. A failed read looks like an
//! empty cache and a failed write is logged and dropped.

mod memory;
mod storage;
mod traits;

pub use memory::MemoryStore;
pub use storage::SqliteStore;
pub use traits::CacheStore;
