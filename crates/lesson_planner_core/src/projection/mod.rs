//! Read-only calendar projections over planner state.
//!
//! # Responsibility
//! - Derive per-date, per-week and per-month groupings for UI layers.
//!
//! # Invariants
//! - Projections are pure functions of their inputs and never mutate the
//!   planner store.

pub mod calendar;
