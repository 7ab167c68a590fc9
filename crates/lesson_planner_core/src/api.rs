//! UI-facing callback surface.
//!
//! # Responsibility
//! - Expose every planner action a front end wires to user input.
//! - Convert outcomes into response envelopes carrying a transient notice.
//!
//! # Invariants
//! - Actions never panic; every failure becomes `ok = false` plus an error
//!   notice.
//! - A mutation that applied in memory but failed to persist reports
//!   `ok = true` with an error notice.

use crate::model::lesson::{Lesson, LessonDraft, LessonId, LessonPatch};
use crate::model::unit::{Unit, UnitId};
use crate::model::ModelValidationError;
use crate::repo::file_exchange::FileExchange;
use crate::repo::kv_store::KeyValueStore;
use crate::service::drag_service::{DragError, DragReorder, DropOutcome};
use crate::service::exchange_service::{ExchangeService, ExchangeServiceError, ImportError};
use crate::service::planner_store::{PlannerError, PlannerStore};
use chrono::NaiveDate;
use std::time::Duration;

/// How long a UI keeps a notice visible.
pub const NOTICE_DURATION: Duration = Duration::from_millis(3000);

const SAVE_FAILED: &str = "Error saving data to local storage.";
const INVALID_IMPORT_FORMAT: &str =
    "Invalid file format. Please import a valid lesson planner JSON file.";
const INVALID_IMPORT_JSON: &str = "Error importing data. Make sure the file is a valid JSON.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// Transient user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }
}

/// Action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    /// Whether the action was applied.
    pub ok: bool,
    /// Created or affected entity id, or the written file name for exports.
    pub entity_id: Option<String>,
    /// Diagnostic message.
    pub message: String,
    /// Notice to show, if any.
    pub notice: Option<Notice>,
}

impl ActionResponse {
    fn success(entity_id: Option<String>, notice: Option<&str>) -> Self {
        Self {
            ok: true,
            entity_id,
            message: "ok".to_string(),
            notice: notice.map(Notice::success),
        }
    }

    fn failure(message: impl Into<String>, notice: impl Into<String>) -> Self {
        Self {
            ok: false,
            entity_id: None,
            message: message.into(),
            notice: Some(Notice::error(notice)),
        }
    }
}

/// Planner session as seen by a front end.
pub struct PlannerApi<S: KeyValueStore> {
    store: PlannerStore<S>,
    drag: DragReorder,
}

impl<S: KeyValueStore> PlannerApi<S> {
    pub fn new(store: PlannerStore<S>) -> Self {
        Self {
            store,
            drag: DragReorder::new(),
        }
    }

    pub fn store(&self) -> &PlannerStore<S> {
        &self.store
    }

    pub fn into_store(self) -> PlannerStore<S> {
        self.store
    }

    pub fn drag(&self) -> &DragReorder {
        &self.drag
    }

    /// Units in display order.
    pub fn units(&self) -> Vec<&Unit> {
        self.store.units_by_order()
    }

    pub fn lessons(&self) -> &[Lesson] {
        self.store.lessons()
    }

    pub fn visible_lessons(&self) -> Vec<&Lesson> {
        self.store.visible_lessons()
    }

    pub fn selected_unit_id(&self) -> Option<UnitId> {
        self.store.selected_unit_id()
    }

    pub fn select_unit(&mut self, unit_id: UnitId) -> ActionResponse {
        let result = self.store.select_unit(unit_id);
        self.respond(result.map(|()| Some(unit_id.to_string())), None)
    }

    pub fn add_unit(
        &mut self,
        name: impl Into<String>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> ActionResponse {
        let result = self.store.add_unit(name, start_date, end_date);
        self.respond(
            result.map(|unit| Some(unit.id.to_string())),
            Some("Unit added successfully!"),
        )
    }

    pub fn update_unit_dates(
        &mut self,
        unit_id: UnitId,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> ActionResponse {
        let result = self.store.update_unit_dates(unit_id, start_date, end_date);
        self.respond(
            result.map(|()| Some(unit_id.to_string())),
            Some("Unit dates updated successfully!"),
        )
    }

    pub fn rename_unit(&mut self, unit_id: UnitId, name: impl Into<String>) -> ActionResponse {
        let result = self.store.rename_unit(unit_id, name);
        self.respond(
            result.map(|()| Some(unit_id.to_string())),
            Some("Unit renamed successfully!"),
        )
    }

    pub fn delete_unit(&mut self, unit_id: UnitId) -> ActionResponse {
        let result = self.store.delete_unit(unit_id);
        self.respond(
            result.map(|()| Some(unit_id.to_string())),
            Some("Unit deleted successfully!"),
        )
    }

    pub fn reorder_units(&mut self, ordered_ids: &[UnitId]) -> ActionResponse {
        let result = self.store.reorder_units(ordered_ids);
        self.respond(result.map(|()| None), Some("Units reordered successfully!"))
    }

    /// Adds a lesson to the selected unit.
    pub fn add_lesson(&mut self, draft: LessonDraft) -> ActionResponse {
        let result = self.store.add_lesson_to_selected(draft);
        self.respond(
            result.map(|lesson| Some(lesson.id.to_string())),
            Some("Lesson added successfully!"),
        )
    }

    pub fn update_lesson(&mut self, lesson_id: LessonId, patch: LessonPatch) -> ActionResponse {
        let result = self.store.update_lesson(lesson_id, patch);
        self.respond(
            result.map(|lesson| Some(lesson.id.to_string())),
            Some("Lesson updated successfully!"),
        )
    }

    pub fn delete_lesson(&mut self, lesson_id: LessonId) -> ActionResponse {
        let result = self.store.delete_lesson(lesson_id);
        self.respond(
            result.map(|lesson| Some(lesson.id.to_string())),
            Some("Lesson deleted successfully!"),
        )
    }

    pub fn move_lesson(&mut self, lesson_id: LessonId, date: NaiveDate, order: usize) -> ActionResponse {
        let result = self.store.move_lesson(lesson_id, date, order);
        self.respond(
            result.map(|lesson| Some(lesson.id.to_string())),
            Some("Lesson reordered successfully!"),
        )
    }

    pub fn begin_unit_drag(&mut self, unit_id: UnitId) -> ActionResponse {
        match self.drag.begin_unit_drag(unit_id) {
            Ok(()) => ActionResponse::success(Some(unit_id.to_string()), None),
            Err(err) => drag_failure(err),
        }
    }

    pub fn begin_lesson_drag(&mut self, lesson_id: LessonId, source_date: NaiveDate) -> ActionResponse {
        match self.drag.begin_lesson_drag(lesson_id, source_date) {
            Ok(()) => ActionResponse::success(Some(lesson_id.to_string()), None),
            Err(err) => drag_failure(err),
        }
    }

    /// Abandons the in-flight gesture without touching planner state.
    pub fn cancel_drag(&mut self) -> ActionResponse {
        self.drag.cancel();
        ActionResponse::success(None, None)
    }

    /// Drops the dragged unit at `destination_index` of the unit list.
    pub fn drop_unit(&mut self, destination_index: usize) -> ActionResponse {
        let outcome = self.drag.commit_unit_move(&mut self.store, destination_index);
        self.respond_drop(outcome)
    }

    /// Drops the dragged lesson at `destination_index` of `destination_date`.
    pub fn drop_lesson(&mut self, destination_date: NaiveDate, destination_index: usize) -> ActionResponse {
        let outcome = self
            .drag
            .commit_lesson_move(&mut self.store, destination_date, destination_index);
        self.respond_drop(outcome)
    }

    /// Writes a dated backup through `exchange`. The written file name is
    /// returned as `entity_id`.
    pub fn export<E: FileExchange>(
        &self,
        exchange: &mut ExchangeService<E>,
        today: NaiveDate,
    ) -> ActionResponse {
        match exchange.export_to(&self.store, today) {
            Ok(file_name) => {
                ActionResponse::success(Some(file_name), Some("Data exported successfully!"))
            }
            Err(err) => ActionResponse::failure(
                format!("export failed: {err}"),
                "Error exporting data.",
            ),
        }
    }

    /// Replaces all planner data with the content of `file_name`.
    pub fn import<E: FileExchange>(
        &mut self,
        exchange: &ExchangeService<E>,
        file_name: &str,
    ) -> ActionResponse {
        match exchange.import_from(&mut self.store, file_name) {
            Ok(_) => self.respond(Ok(None), Some("Data imported successfully!")),
            Err(err) => {
                let notice = match &err {
                    ExchangeServiceError::Import(ImportError::InvalidJson(_))
                    | ExchangeServiceError::Exchange(_) => INVALID_IMPORT_JSON,
                    _ => INVALID_IMPORT_FORMAT,
                };
                ActionResponse::failure(format!("import failed: {err}"), notice)
            }
        }
    }

    fn respond_drop(&mut self, outcome: Result<DropOutcome, DragError>) -> ActionResponse {
        match outcome {
            Ok(DropOutcome::UnitMoved) => {
                self.respond(Ok(None), Some("Units reordered successfully!"))
            }
            Ok(DropOutcome::LessonMoved(lesson)) => self.respond(
                Ok(Some(lesson.id.to_string())),
                Some("Lesson reordered successfully!"),
            ),
            Ok(DropOutcome::Ignored) => ActionResponse::success(None, None),
            Err(err) => drag_failure(err),
        }
    }

    fn respond(
        &mut self,
        result: Result<Option<String>, PlannerError>,
        success_notice: Option<&str>,
    ) -> ActionResponse {
        match result {
            Ok(entity_id) => {
                let mut response = ActionResponse::success(entity_id, success_notice);
                if let Some(err) = self.store.take_persistence_failure() {
                    response.message = format!("applied in memory only: {err}");
                    response.notice = Some(Notice::error(SAVE_FAILED));
                }
                response
            }
            Err(err) => ActionResponse::failure(err.to_string(), planner_notice(&err)),
        }
    }
}

fn drag_failure(err: DragError) -> ActionResponse {
    let notice = match &err {
        DragError::Planner(inner) => planner_notice(inner),
        _ => "Drag and drop could not be completed.",
    };
    ActionResponse::failure(err.to_string(), notice)
}

fn planner_notice(err: &PlannerError) -> &'static str {
    match err {
        PlannerError::Validation(ModelValidationError::EmptyUnitName) => {
            "Unit name cannot be empty."
        }
        PlannerError::Validation(ModelValidationError::EmptyLessonTitle) => {
            "Lesson title cannot be empty."
        }
        PlannerError::Validation(ModelValidationError::InvalidDateRange { .. }) => {
            "Start date cannot be after end date."
        }
        PlannerError::Validation(ModelValidationError::NilId) => "Invalid identifier.",
        PlannerError::UnitNotFound(_) => "Unit not found.",
        PlannerError::LessonNotFound(_) => "Lesson not found.",
        PlannerError::NoUnitSelected => "Please select a unit first.",
        PlannerError::UnitHasLessons { .. } => {
            "Cannot delete unit: Please delete all lessons within this unit first."
        }
        PlannerError::UnitSetMismatch(_) => "Units could not be reordered.",
        PlannerError::Store(_) => SAVE_FAILED,
    }
}
