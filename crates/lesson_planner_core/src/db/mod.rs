//! SQLite bootstrap for the durable key-value backend.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the planner store.
//! - Apply schema migrations in deterministic order.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - No planner data is read or written before migrations succeed.
//! - Failures are reported as `StoreError`.

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};
