//! Persistence abstractions and implementations.
//!
//! # Responsibility
//! - Define the key-value and file exchange contracts the planner depends on.
//! - Isolate storage encoding and SQL details from the planner store.
//!
//! # Invariants
//! - Only `PlannerRepository` knows the persisted key layout.
//! - Storage APIs return semantic errors (`StoreError::Corrupt`,
//!   `ExchangeError::NotFound`) in addition to transport errors.

pub mod file_exchange;
pub mod kv_store;
pub mod planner_repo;
