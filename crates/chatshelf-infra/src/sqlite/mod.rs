//! SQLite storage layer.
//!
//! The history store is a two-key document table backed by SQLite with WAL
//! mode and split read/write connection pools.

pub mod history;
pub mod pool;
