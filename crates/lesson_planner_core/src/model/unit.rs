//! Unit domain model.
//!
//! # Responsibility
//! - Define the date-ranged grouping that lessons belong to.
//!
//! # Invariants
//! - `id` is stable and never reused.
//! - `name` is non-blank.
//! - `start_date <= end_date` when both are set.
//! - `order` equals the unit's display position among all units.

use super::{normalize_label, validate_date_range, ModelValidationError};
use crate::dates::weekdays_in_range;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a unit.
pub type UnitId = Uuid;

/// Course unit: a named, optionally date-ranged grouping of lessons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Display position among all units.
    pub order: usize,
}

impl Unit {
    /// Creates a unit with a generated id.
    ///
    /// # Errors
    /// - `EmptyUnitName` when `name` is blank after trim.
    /// - `InvalidDateRange` when both dates are set and reversed.
    pub fn new(
        name: impl Into<String>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        order: usize,
    ) -> Result<Self, ModelValidationError> {
        let name = normalize_label(name.into(), ModelValidationError::EmptyUnitName)?;
        validate_date_range(start_date, end_date)?;
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            start_date,
            end_date,
            order,
        })
    }

    /// Replaces both dates, leaving the unit untouched on failure.
    pub fn set_dates(
        &mut self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<(), ModelValidationError> {
        validate_date_range(start_date, end_date)?;
        self.start_date = start_date;
        self.end_date = end_date;
        Ok(())
    }

    /// Renames the unit, leaving it untouched on failure.
    pub fn rename(&mut self, name: impl Into<String>) -> Result<(), ModelValidationError> {
        self.name = normalize_label(name.into(), ModelValidationError::EmptyUnitName)?;
        Ok(())
    }

    /// Checks record invariants, used on records that did not come through
    /// the constructor (storage and import paths).
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.id.is_nil() {
            return Err(ModelValidationError::NilId);
        }
        if self.name.trim().is_empty() {
            return Err(ModelValidationError::EmptyUnitName);
        }
        validate_date_range(self.start_date, self.end_date)
    }

    /// Weekday slots covered by the unit's date range.
    ///
    /// Empty until both dates are set.
    pub fn weekdays(&self) -> Vec<NaiveDate> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => weekdays_in_range(start, end),
            _ => Vec::new(),
        }
    }
}
