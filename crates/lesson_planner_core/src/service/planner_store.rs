//! Planner domain store.
//!
//! # Responsibility
//! - Own the canonical unit and lesson collections plus the unit selection.
//! - Provide every mutation (create/update/delete/reorder) for both entities.
//! - Persist both collections after each applied mutation.
//!
//! # Invariants
//! - Validation failures never mutate state.
//! - Unit `order` values are a duplicate-free `0..n-1` ranking after load,
//!   import, add, delete and reorder.
//! - Lesson `order` values are `0..k-1` inside every `(unit_id, date)`
//!   partition after load and import, and inside each partition touched by
//!   add, delete or drag moves.
//! - A persistence failure never rolls back in-memory state; it is recorded
//!   for the caller and logged.
//! - A unit with dependent lessons cannot be deleted.

use crate::model::lesson::{
    partition_len, renumber_partition, Lesson, LessonDraft, LessonId, LessonPatch,
};
use crate::model::unit::{Unit, UnitId};
use crate::model::ModelValidationError;
use crate::repo::kv_store::{KeyValueStore, StoreError};
use crate::repo::planner_repo::PlannerRepository;
use chrono::NaiveDate;
use log::{debug, error, info, warn};
use std::collections::{BTreeSet, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type PlannerResult<T> = Result<T, PlannerError>;

/// Errors from planner store operations.
#[derive(Debug)]
pub enum PlannerError {
    /// Record-level validation failed (blank label, reversed dates).
    Validation(ModelValidationError),
    /// Target unit does not exist.
    UnitNotFound(UnitId),
    /// Target lesson does not exist.
    LessonNotFound(LessonId),
    /// Operation needs a selected unit and none is selected.
    NoUnitSelected,
    /// Unit still owns lessons and cannot be deleted.
    UnitHasLessons { unit_id: UnitId, lesson_count: usize },
    /// Reorder input is not a permutation of the existing units.
    UnitSetMismatch(String),
    /// Loading persisted state failed.
    Store(StoreError),
}

impl Display for PlannerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::UnitNotFound(id) => write!(f, "unit not found: {id}"),
            Self::LessonNotFound(id) => write!(f, "lesson not found: {id}"),
            Self::NoUnitSelected => write!(f, "no unit is selected"),
            Self::UnitHasLessons {
                unit_id,
                lesson_count,
            } => write!(
                f,
                "unit {unit_id} still has {lesson_count} lesson(s); delete them first"
            ),
            Self::UnitSetMismatch(details) => {
                write!(f, "reorder input must list every unit exactly once: {details}")
            }
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PlannerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ModelValidationError> for PlannerError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for PlannerError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Single owner of planner state for one session.
pub struct PlannerStore<S: KeyValueStore> {
    repo: PlannerRepository<S>,
    units: Vec<Unit>,
    lessons: Vec<Lesson>,
    selected_unit: Option<UnitId>,
    session_id: String,
    persistence_failure: Option<StoreError>,
}

impl<S: KeyValueStore> PlannerStore<S> {
    /// Loads persisted state and selects the first unit by list position.
    ///
    /// # Errors
    /// - `Store` when a persisted collection cannot be read or decoded, or
    ///   when a missing session identifier cannot be written.
    pub fn open(mut repo: PlannerRepository<S>) -> PlannerResult<Self> {
        let units = repo.load_units()?;
        let lessons = repo.load_lessons()?;
        let session_id = repo.load_or_create_session_id()?;
        Ok(Self::from_parts(repo, units, lessons, session_id))
    }

    /// Like `open`, but starts from empty collections when persisted state is
    /// unreadable, so the session can continue in memory.
    pub fn open_or_empty(mut repo: PlannerRepository<S>) -> Self {
        let loaded = repo
            .load_units()
            .and_then(|units| repo.load_lessons().map(|lessons| (units, lessons)));
        let (units, lessons) = match loaded {
            Ok(collections) => collections,
            Err(err) => {
                error!(
                    "event=state_load module=planner_store status=error fallback=empty error={}",
                    err
                );
                (Vec::new(), Vec::new())
            }
        };

        let session_id = match repo.load_or_create_session_id() {
            Ok(session_id) => session_id,
            Err(err) => {
                warn!(
                    "event=session_id_load module=planner_store status=error fallback=ephemeral error={}",
                    err
                );
                Uuid::new_v4().to_string()
            }
        };

        Self::from_parts(repo, units, lessons, session_id)
    }

    fn from_parts(
        repo: PlannerRepository<S>,
        units: Vec<Unit>,
        lessons: Vec<Lesson>,
        session_id: String,
    ) -> Self {
        let selected_unit = units.first().map(|unit| unit.id);
        let mut store = Self {
            repo,
            units,
            lessons,
            selected_unit,
            session_id,
            persistence_failure: None,
        };
        store.normalize_orders();
        info!(
            "event=state_load module=planner_store status=ok units={} lessons={}",
            store.units.len(),
            store.lessons.len()
        );
        store
    }

    /// Units in stored list order.
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Units sorted by `order` (stable on ties).
    pub fn units_by_order(&self) -> Vec<&Unit> {
        let mut units: Vec<&Unit> = self.units.iter().collect();
        units.sort_by_key(|unit| unit.order);
        units
    }

    pub fn unit(&self, unit_id: UnitId) -> Option<&Unit> {
        self.units.iter().find(|unit| unit.id == unit_id)
    }

    /// All lessons in stored list order.
    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    pub fn lesson(&self, lesson_id: LessonId) -> Option<&Lesson> {
        self.lessons.iter().find(|lesson| lesson.id == lesson_id)
    }

    pub fn lessons_for_unit(&self, unit_id: UnitId) -> Vec<&Lesson> {
        self.lessons
            .iter()
            .filter(|lesson| lesson.unit_id == unit_id)
            .collect()
    }

    /// Lessons of the selected unit; empty when nothing is selected.
    pub fn visible_lessons(&self) -> Vec<&Lesson> {
        match self.selected_unit {
            Some(unit_id) => self.lessons_for_unit(unit_id),
            None => Vec::new(),
        }
    }

    pub fn selected_unit_id(&self) -> Option<UnitId> {
        self.selected_unit
    }

    pub fn selected_unit(&self) -> Option<&Unit> {
        self.selected_unit.and_then(|unit_id| self.unit(unit_id))
    }

    /// Anonymous identifier persisted for this browser profile.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn repository(&self) -> &PlannerRepository<S> {
        &self.repo
    }

    /// Persistence failure from the most recent mutation, if any.
    pub fn last_persistence_failure(&self) -> Option<&StoreError> {
        self.persistence_failure.as_ref()
    }

    /// Takes the persistence failure from the most recent mutation.
    pub fn take_persistence_failure(&mut self) -> Option<StoreError> {
        self.persistence_failure.take()
    }

    /// Selects a unit. Idempotent; never touches persisted data.
    pub fn select_unit(&mut self, unit_id: UnitId) -> PlannerResult<()> {
        self.unit_index(unit_id)?;
        self.selected_unit = Some(unit_id);
        debug!("event=unit_select module=planner_store status=ok unit_id={unit_id}");
        Ok(())
    }

    /// Appends a unit with `order = unit count`.
    ///
    /// The new unit becomes the selection when nothing is selected yet, which
    /// is the case exactly when it is the first unit.
    pub fn add_unit(
        &mut self,
        name: impl Into<String>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> PlannerResult<Unit> {
        let unit = Unit::new(name, start_date, end_date, self.units.len())
            .map_err(|err| self.rejected("unit_add", err))?;

        self.units.push(unit.clone());
        if self.selected_unit.is_none() {
            self.selected_unit = Some(unit.id);
        }

        info!(
            "event=unit_add module=planner_store status=ok unit_id={} order={}",
            unit.id, unit.order
        );
        self.persist("unit_add");
        Ok(unit)
    }

    /// Overwrites both dates of a unit.
    ///
    /// # Errors
    /// - `Validation(InvalidDateRange)` when both dates are set and reversed.
    pub fn update_unit_dates(
        &mut self,
        unit_id: UnitId,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> PlannerResult<()> {
        let index = self.unit_index(unit_id)?;
        if let Err(err) = self.units[index].set_dates(start_date, end_date) {
            return Err(self.rejected("unit_update_dates", err));
        }

        info!("event=unit_update_dates module=planner_store status=ok unit_id={unit_id}");
        self.persist("unit_update_dates");
        Ok(())
    }

    /// Renames a unit.
    pub fn rename_unit(&mut self, unit_id: UnitId, name: impl Into<String>) -> PlannerResult<()> {
        let index = self.unit_index(unit_id)?;
        if let Err(err) = self.units[index].rename(name) {
            return Err(self.rejected("unit_rename", err));
        }

        info!("event=unit_rename module=planner_store status=ok unit_id={unit_id}");
        self.persist("unit_rename");
        Ok(())
    }

    /// Deletes a unit that owns no lessons.
    ///
    /// Remaining units are renumbered to close the gap. When the deleted unit
    /// was selected, the first remaining unit by `order` is selected instead.
    pub fn delete_unit(&mut self, unit_id: UnitId) -> PlannerResult<()> {
        let index = self.unit_index(unit_id)?;
        let lesson_count = self
            .lessons
            .iter()
            .filter(|lesson| lesson.unit_id == unit_id)
            .count();
        if lesson_count > 0 {
            warn!(
                "event=unit_delete module=planner_store status=rejected unit_id={unit_id} lesson_count={lesson_count}"
            );
            return Err(PlannerError::UnitHasLessons {
                unit_id,
                lesson_count,
            });
        }

        self.units.remove(index);
        self.renumber_units();
        if self.selected_unit == Some(unit_id) {
            let next = self.units_by_order().first().map(|unit| unit.id);
            self.selected_unit = next;
        }

        info!(
            "event=unit_delete module=planner_store status=ok unit_id={unit_id} remaining={}",
            self.units.len()
        );
        self.persist("unit_delete");
        Ok(())
    }

    /// Rewrites every unit's `order` to its position in `ordered_ids`.
    ///
    /// # Errors
    /// - `UnitSetMismatch` unless `ordered_ids` lists every existing unit
    ///   exactly once and nothing else. No mutation happens on failure.
    pub fn reorder_units(&mut self, ordered_ids: &[UnitId]) -> PlannerResult<()> {
        if ordered_ids.len() != self.units.len() {
            return Err(PlannerError::UnitSetMismatch(format!(
                "expected {} unit ids, got {}",
                self.units.len(),
                ordered_ids.len()
            )));
        }

        let mut seen = HashSet::with_capacity(ordered_ids.len());
        let mut reordered = Vec::with_capacity(ordered_ids.len());
        for (position, unit_id) in ordered_ids.iter().enumerate() {
            if !seen.insert(*unit_id) {
                return Err(PlannerError::UnitSetMismatch(format!(
                    "duplicate unit id {unit_id}"
                )));
            }
            let Some(unit) = self.unit(*unit_id) else {
                return Err(PlannerError::UnitSetMismatch(format!(
                    "unknown unit id {unit_id}"
                )));
            };
            let mut unit = unit.clone();
            unit.order = position;
            reordered.push(unit);
        }

        self.units = reordered;
        info!(
            "event=unit_reorder module=planner_store status=ok units={}",
            self.units.len()
        );
        self.persist("unit_reorder");
        Ok(())
    }

    /// Adds a lesson at the end of its `(unit_id, date)` partition.
    pub fn add_lesson(&mut self, unit_id: UnitId, draft: LessonDraft) -> PlannerResult<Lesson> {
        self.unit_index(unit_id)?;
        let order = partition_len(&self.lessons, unit_id, draft.date);
        let lesson = Lesson::from_draft(unit_id, draft, order)
            .map_err(|err| self.rejected("lesson_add", err))?;

        self.lessons.push(lesson.clone());
        info!(
            "event=lesson_add module=planner_store status=ok lesson_id={} unit_id={} date={} order={}",
            lesson.id, unit_id, lesson.date, lesson.order
        );
        self.persist("lesson_add");
        Ok(lesson)
    }

    /// Adds a lesson to the currently selected unit.
    ///
    /// # Errors
    /// - `NoUnitSelected` when no unit is selected.
    pub fn add_lesson_to_selected(&mut self, draft: LessonDraft) -> PlannerResult<Lesson> {
        let unit_id = self.selected_unit.ok_or(PlannerError::NoUnitSelected)?;
        self.add_lesson(unit_id, draft)
    }

    /// Merges `patch` into a lesson. `order` is left as-is even when the date
    /// changes; callers needing a reflow use the drag protocol.
    pub fn update_lesson(&mut self, lesson_id: LessonId, patch: LessonPatch) -> PlannerResult<Lesson> {
        let index = self.lesson_index(lesson_id)?;
        if let Err(err) = self.lessons[index].apply_patch(patch) {
            return Err(self.rejected("lesson_update", err));
        }

        let lesson = self.lessons[index].clone();
        info!("event=lesson_update module=planner_store status=ok lesson_id={lesson_id}");
        self.persist("lesson_update");
        Ok(lesson)
    }

    /// Removes a lesson and closes the gap in its partition.
    pub fn delete_lesson(&mut self, lesson_id: LessonId) -> PlannerResult<Lesson> {
        let index = self.lesson_index(lesson_id)?;
        let removed = self.lessons.remove(index);
        renumber_partition(&mut self.lessons, removed.unit_id, removed.date);

        info!(
            "event=lesson_delete module=planner_store status=ok lesson_id={lesson_id} date={}",
            removed.date
        );
        self.persist("lesson_delete");
        Ok(removed)
    }

    /// Sets a lesson's date and order directly, without splicing siblings.
    pub fn move_lesson(
        &mut self,
        lesson_id: LessonId,
        date: NaiveDate,
        order: usize,
    ) -> PlannerResult<Lesson> {
        let index = self.lesson_index(lesson_id)?;
        let lesson = &mut self.lessons[index];
        lesson.date = date;
        lesson.order = order;
        let lesson = lesson.clone();

        info!(
            "event=lesson_move module=planner_store status=ok lesson_id={lesson_id} date={date} order={order}"
        );
        self.persist("lesson_move");
        Ok(lesson)
    }

    /// Replaces the lesson collection in one mutation.
    pub(crate) fn commit_lessons(&mut self, lessons: Vec<Lesson>, trigger: &'static str) {
        self.lessons = lessons;
        self.persist(trigger);
    }

    /// Replaces both collections in one mutation and selects the first unit
    /// by list position.
    ///
    /// Unit orders and every lesson partition are compacted to `0..n-1`,
    /// keeping relative order, so later appends cannot collide.
    pub fn replace_all(&mut self, units: Vec<Unit>, lessons: Vec<Lesson>) {
        self.units = units;
        self.lessons = lessons;
        self.normalize_orders();
        self.selected_unit = self.units.first().map(|unit| unit.id);

        info!(
            "event=state_replace module=planner_store status=ok units={} lessons={}",
            self.units.len(),
            self.lessons.len()
        );
        self.persist("state_replace");
    }

    fn unit_index(&self, unit_id: UnitId) -> PlannerResult<usize> {
        self.units
            .iter()
            .position(|unit| unit.id == unit_id)
            .ok_or(PlannerError::UnitNotFound(unit_id))
    }

    fn lesson_index(&self, lesson_id: LessonId) -> PlannerResult<usize> {
        self.lessons
            .iter()
            .position(|lesson| lesson.id == lesson_id)
            .ok_or(PlannerError::LessonNotFound(lesson_id))
    }

    fn renumber_units(&mut self) {
        let mut positions: Vec<usize> = (0..self.units.len()).collect();
        positions.sort_by_key(|index| self.units[*index].order);
        for (order, index) in positions.into_iter().enumerate() {
            self.units[index].order = order;
        }
    }

    fn normalize_orders(&mut self) {
        self.renumber_units();
        let partitions: BTreeSet<(UnitId, NaiveDate)> = self
            .lessons
            .iter()
            .map(|lesson| (lesson.unit_id, lesson.date))
            .collect();
        for (unit_id, date) in partitions {
            renumber_partition(&mut self.lessons, unit_id, date);
        }
    }

    fn rejected(&self, event: &'static str, err: ModelValidationError) -> PlannerError {
        warn!("event={event} module=planner_store status=rejected reason={err}");
        PlannerError::Validation(err)
    }

    fn persist(&mut self, trigger: &'static str) {
        match self.repo.save_collections(&self.units, &self.lessons) {
            Ok(()) => {
                self.persistence_failure = None;
                debug!(
                    "event=state_persist module=planner_store status=ok trigger={trigger} units={} lessons={}",
                    self.units.len(),
                    self.lessons.len()
                );
            }
            Err(err) => {
                error!(
                    "event=state_persist module=planner_store status=error trigger={trigger} error={err}"
                );
                self.persistence_failure = Some(err);
            }
        }
    }
}
