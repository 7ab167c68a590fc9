//! Planner use-case services.
//!
//! # Responsibility
//! - Own planner state and every mutation on it (`planner_store`).
//! - Translate drag gestures and backup files into store mutations.
//! - Keep UI layers decoupled from storage details.

pub mod drag_service;
pub mod exchange_service;
pub mod planner_store;
