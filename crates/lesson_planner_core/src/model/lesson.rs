//! Lesson domain model.
//!
//! # Responsibility
//! - Define the per-day lesson record and its create/patch inputs.
//! - Provide partition renumbering used by every order-touching mutation.
//!
//! # Invariants
//! - `unit_id` is fixed at creation; patches cannot move a lesson between units.
//! - `title` is non-blank.
//! - Within one `(unit_id, date)` partition, `order` is `0..k-1` after any
//!   mutation that touched the partition.

use super::unit::UnitId;
use super::{normalize_label, ModelValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a lesson.
pub type LessonId = Uuid;

/// One planned lesson on one calendar date.
///
/// Descriptive fields default to empty/false so older documents that omit
/// them still decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: LessonId,
    pub unit_id: UnitId,
    pub date: NaiveDate,
    /// Position within the `(unit_id, date)` partition.
    pub order: usize,
    pub title: String,
    #[serde(default)]
    pub activity_assignment: String,
    #[serde(default)]
    pub readings: String,
    #[serde(default)]
    pub google_slides_link: String,
    #[serde(default)]
    pub additional_links: String,
    #[serde(default)]
    pub is_graded: bool,
}

/// Input for creating a lesson.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonDraft {
    pub title: String,
    pub date: NaiveDate,
    pub activity_assignment: String,
    pub readings: String,
    pub google_slides_link: String,
    pub additional_links: String,
    pub is_graded: bool,
}

impl LessonDraft {
    /// Creates a draft with empty descriptive fields.
    pub fn new(title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            date,
            activity_assignment: String::new(),
            readings: String::new(),
            google_slides_link: String::new(),
            additional_links: String::new(),
            is_graded: false,
        }
    }

    /// Sets the graded flag.
    pub fn graded(mut self, is_graded: bool) -> Self {
        self.is_graded = is_graded;
        self
    }
}

/// Partial update for an existing lesson. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LessonPatch {
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub activity_assignment: Option<String>,
    pub readings: Option<String>,
    pub google_slides_link: Option<String>,
    pub additional_links: Option<String>,
    pub is_graded: Option<bool>,
}

impl Lesson {
    /// Builds a lesson from a draft with a generated id.
    ///
    /// # Errors
    /// - `EmptyLessonTitle` when the draft title is blank after trim.
    pub fn from_draft(
        unit_id: UnitId,
        draft: LessonDraft,
        order: usize,
    ) -> Result<Self, ModelValidationError> {
        let title = normalize_label(draft.title, ModelValidationError::EmptyLessonTitle)?;
        Ok(Self {
            id: Uuid::new_v4(),
            unit_id,
            date: draft.date,
            order,
            title,
            activity_assignment: draft.activity_assignment,
            readings: draft.readings,
            google_slides_link: draft.google_slides_link,
            additional_links: draft.additional_links,
            is_graded: draft.is_graded,
        })
    }

    /// Merges `patch` into this lesson. `order` is never recomputed here.
    ///
    /// Validation runs before any field is written, so a failed patch leaves
    /// the lesson unchanged.
    pub fn apply_patch(&mut self, patch: LessonPatch) -> Result<(), ModelValidationError> {
        let title = patch
            .title
            .map(|value| normalize_label(value, ModelValidationError::EmptyLessonTitle))
            .transpose()?;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(value) = patch.activity_assignment {
            self.activity_assignment = value;
        }
        if let Some(value) = patch.readings {
            self.readings = value;
        }
        if let Some(value) = patch.google_slides_link {
            self.google_slides_link = value;
        }
        if let Some(value) = patch.additional_links {
            self.additional_links = value;
        }
        if let Some(value) = patch.is_graded {
            self.is_graded = value;
        }
        Ok(())
    }

    /// Checks record invariants for records loaded from storage or import.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.id.is_nil() || self.unit_id.is_nil() {
            return Err(ModelValidationError::NilId);
        }
        if self.title.trim().is_empty() {
            return Err(ModelValidationError::EmptyLessonTitle);
        }
        Ok(())
    }

    /// Returns whether this lesson sits in the `(unit_id, date)` partition.
    pub fn in_partition(&self, unit_id: UnitId, date: NaiveDate) -> bool {
        self.unit_id == unit_id && self.date == date
    }
}

/// Number of lessons currently in one `(unit_id, date)` partition.
pub fn partition_len(lessons: &[Lesson], unit_id: UnitId, date: NaiveDate) -> usize {
    lessons
        .iter()
        .filter(|lesson| lesson.in_partition(unit_id, date))
        .count()
}

/// Rewrites `order` inside one partition to `0..k-1`, keeping relative order.
///
/// Ties on `order` keep their collection position. Lessons outside the
/// partition are not touched.
pub fn renumber_partition(lessons: &mut [Lesson], unit_id: UnitId, date: NaiveDate) {
    let mut members: Vec<usize> = lessons
        .iter()
        .enumerate()
        .filter(|(_, lesson)| lesson.in_partition(unit_id, date))
        .map(|(index, _)| index)
        .collect();
    members.sort_by_key(|index| lessons[*index].order);

    for (position, index) in members.into_iter().enumerate() {
        lessons[index].order = position;
    }
}

#[cfg(test)]
mod tests {
    use super::{renumber_partition, Lesson, LessonDraft, LessonPatch};
    use crate::model::ModelValidationError;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn failed_patch_leaves_lesson_unchanged() {
        let mut lesson = Lesson::from_draft(Uuid::new_v4(), LessonDraft::new("Intro", day(2)), 0)
            .unwrap();
        let before = lesson.clone();

        let err = lesson
            .apply_patch(LessonPatch {
                title: Some("   ".to_string()),
                date: Some(day(3)),
                ..LessonPatch::default()
            })
            .unwrap_err();

        assert_eq!(err, ModelValidationError::EmptyLessonTitle);
        assert_eq!(lesson, before);
    }

    #[test]
    fn renumber_partition_closes_gaps_and_ignores_other_partitions() {
        let unit = Uuid::new_v4();
        let other_unit = Uuid::new_v4();
        let mut lessons = vec![
            Lesson::from_draft(unit, LessonDraft::new("b", day(2)), 5).unwrap(),
            Lesson::from_draft(unit, LessonDraft::new("a", day(2)), 2).unwrap(),
            Lesson::from_draft(unit, LessonDraft::new("x", day(3)), 7).unwrap(),
            Lesson::from_draft(other_unit, LessonDraft::new("y", day(2)), 9).unwrap(),
        ];

        renumber_partition(&mut lessons, unit, day(2));

        assert_eq!(lessons[0].order, 1);
        assert_eq!(lessons[1].order, 0);
        assert_eq!(lessons[2].order, 7);
        assert_eq!(lessons[3].order, 9);
    }
}
