//! Planner domain model.
//!
//! # Responsibility
//! - Define the canonical Unit and Lesson records shared by every layer.
//! - Own record-level validation (non-empty labels, date ordering).
//!
//! # Invariants
//! - Every record is identified by a stable v4 UUID.
//! - Dates carry no time component.
//! - Wire field names are camelCase to match the persisted/exported layout.

use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod lesson;
pub mod unit;

/// Record-level validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelValidationError {
    /// Unit name is blank after trim.
    EmptyUnitName,
    /// Lesson title is blank after trim.
    EmptyLessonTitle,
    /// Start date is after end date.
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    /// Record id is the nil UUID.
    NilId,
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUnitName => write!(f, "unit name must not be blank"),
            Self::EmptyLessonTitle => write!(f, "lesson title must not be blank"),
            Self::InvalidDateRange { start, end } => {
                write!(f, "start date ({start}) must not be after end date ({end})")
            }
            Self::NilId => write!(f, "record id must not be nil"),
        }
    }
}

impl Error for ModelValidationError {}

/// Trims a label, rejecting blank input with the supplied error.
pub(crate) fn normalize_label(
    value: String,
    blank: ModelValidationError,
) -> Result<String, ModelValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(blank);
    }
    Ok(trimmed.to_string())
}

/// Checks `start <= end` when both ends are present.
pub fn validate_date_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), ModelValidationError> {
    match (start, end) {
        (Some(start), Some(end)) if start > end => {
            Err(ModelValidationError::InvalidDateRange { start, end })
        }
        _ => Ok(()),
    }
}
