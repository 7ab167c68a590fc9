//! Drag-and-drop reorder protocol.
//!
//! # Responsibility
//! - Track one in-flight drag gesture (`Idle` / `Dragging`).
//! - Turn a completed drop into exactly one planner store mutation.
//!
//! # Invariants
//! - Nothing is written while a gesture is in flight; abandoning a gesture
//!   performs zero store mutations.
//! - Every drop, including a same-date reorder, goes through the same
//!   remove / splice / renumber sequence.
//! - After a lesson drop, the destination `(unit_id, date)` partition and the
//!   source partition are `0..k-1`; every other partition is untouched.
//! - A drop that references a lesson or unit that no longer exists is a
//!   silent no-op.

use crate::dates::to_date_key;
use crate::model::lesson::{renumber_partition, Lesson, LessonId};
use crate::model::unit::UnitId;
use crate::repo::kv_store::KeyValueStore;
use crate::service::planner_store::{PlannerError, PlannerStore};
use chrono::NaiveDate;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::mem;

/// Errors from the drag protocol.
#[derive(Debug)]
pub enum DragError {
    /// A gesture is already in flight.
    AlreadyDragging,
    /// Drop arrived with no gesture in flight.
    NotDragging,
    /// Drop target kind does not match the dragged entity kind.
    TargetMismatch,
    /// Store rejected the resulting state.
    Planner(PlannerError),
}

impl Display for DragError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyDragging => write!(f, "a drag gesture is already in progress"),
            Self::NotDragging => write!(f, "no drag gesture is in progress"),
            Self::TargetMismatch => write!(f, "drop target does not accept the dragged item"),
            Self::Planner(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DragError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Planner(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PlannerError> for DragError {
    fn from(value: PlannerError) -> Self {
        Self::Planner(value)
    }
}

/// What is being dragged and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragSource {
    /// A unit in the flat unit list.
    Unit { unit_id: UnitId },
    /// A lesson, with the canonical key of the date list it left.
    Lesson {
        lesson_id: LessonId,
        source_key: String,
    },
}

/// Gesture state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragSource),
}

/// Where a gesture was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    /// Position in the unit list.
    UnitList { index: usize },
    /// Position in one date's lesson list.
    LessonDate { date: NaiveDate, index: usize },
}

/// Result of a committed drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    UnitMoved,
    LessonMoved(Lesson),
    /// Dragged entity no longer exists; nothing changed.
    Ignored,
}

/// Drag gesture state machine.
#[derive(Debug, Default)]
pub struct DragReorder {
    state: DragState,
}

impl DragReorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    /// Starts dragging a unit.
    pub fn begin_unit_drag(&mut self, unit_id: UnitId) -> Result<(), DragError> {
        self.begin(DragSource::Unit { unit_id })
    }

    /// Starts dragging a lesson out of the list for `source_date`.
    pub fn begin_lesson_drag(
        &mut self,
        lesson_id: LessonId,
        source_date: NaiveDate,
    ) -> Result<(), DragError> {
        self.begin(DragSource::Lesson {
            lesson_id,
            source_key: to_date_key(source_date),
        })
    }

    fn begin(&mut self, source: DragSource) -> Result<(), DragError> {
        if self.is_dragging() {
            return Err(DragError::AlreadyDragging);
        }
        debug!("event=drag_begin module=drag status=ok source={source:?}");
        self.state = DragState::Dragging(source);
        Ok(())
    }

    /// Abandons the gesture (drop outside any target). No store mutation.
    pub fn cancel(&mut self) -> Option<DragSource> {
        match mem::take(&mut self.state) {
            DragState::Idle => None,
            DragState::Dragging(source) => {
                debug!("event=drag_cancel module=drag status=ok");
                Some(source)
            }
        }
    }

    /// Completes the gesture at `target`.
    ///
    /// The state returns to `Idle` whatever the outcome. A target that does
    /// not match the dragged entity abandons the gesture without mutation.
    pub fn commit<S: KeyValueStore>(
        &mut self,
        store: &mut PlannerStore<S>,
        target: DropTarget,
    ) -> Result<DropOutcome, DragError> {
        let DragState::Dragging(source) = mem::take(&mut self.state) else {
            return Err(DragError::NotDragging);
        };

        match (source, target) {
            (DragSource::Unit { unit_id }, DropTarget::UnitList { index }) => {
                let Some(from) = store
                    .units_by_order()
                    .iter()
                    .position(|unit| unit.id == unit_id)
                else {
                    debug!("event=drag_drop module=drag status=skip reason=unit_missing unit_id={unit_id}");
                    return Ok(DropOutcome::Ignored);
                };
                move_unit(store, from, index)?;
                Ok(DropOutcome::UnitMoved)
            }
            (
                DragSource::Lesson {
                    lesson_id,
                    source_key,
                },
                DropTarget::LessonDate { date, index },
            ) => {
                let moved = handle_drag_end_lesson(store, lesson_id, &source_key, date, index);
                Ok(moved.map_or(DropOutcome::Ignored, DropOutcome::LessonMoved))
            }
            _ => {
                warn!("event=drag_drop module=drag status=rejected reason=target_mismatch");
                Err(DragError::TargetMismatch)
            }
        }
    }

    /// Completes a unit gesture at `destination_index`.
    pub fn commit_unit_move<S: KeyValueStore>(
        &mut self,
        store: &mut PlannerStore<S>,
        destination_index: usize,
    ) -> Result<DropOutcome, DragError> {
        self.commit(
            store,
            DropTarget::UnitList {
                index: destination_index,
            },
        )
    }

    /// Completes a lesson gesture on `destination_date` at `destination_index`.
    pub fn commit_lesson_move<S: KeyValueStore>(
        &mut self,
        store: &mut PlannerStore<S>,
        destination_date: NaiveDate,
        destination_index: usize,
    ) -> Result<DropOutcome, DragError> {
        self.commit(
            store,
            DropTarget::LessonDate {
                date: destination_date,
                index: destination_index,
            },
        )
    }
}

/// Moves the unit at display position `from` to display position `to` and
/// commits the resulting list through `reorder_units`.
///
/// `to` is clamped to the last position. An out-of-range `from` is ignored.
pub fn move_unit<S: KeyValueStore>(
    store: &mut PlannerStore<S>,
    from: usize,
    to: usize,
) -> Result<(), PlannerError> {
    let mut ordered: Vec<UnitId> = store.units_by_order().iter().map(|unit| unit.id).collect();
    if from >= ordered.len() {
        debug!(
            "event=unit_drop module=drag status=skip reason=index_out_of_range from={from} len={}",
            ordered.len()
        );
        return Ok(());
    }

    let unit_id = ordered.remove(from);
    let to = to.min(ordered.len());
    ordered.insert(to, unit_id);
    store.reorder_units(&ordered)
}

/// Moves a lesson to `destination_index` on `destination_date`.
///
/// Returns the moved lesson, or `None` when `lesson_id` is unknown (benign
/// race with a deletion; nothing changes). `source_key` is only used for
/// diagnostics: the lesson's stored date is the authoritative source.
pub fn handle_drag_end_lesson<S: KeyValueStore>(
    store: &mut PlannerStore<S>,
    lesson_id: LessonId,
    source_key: &str,
    destination_date: NaiveDate,
    destination_index: usize,
) -> Option<Lesson> {
    let Some(dragged) = store.lesson(lesson_id).cloned() else {
        debug!("event=lesson_drop module=drag status=skip reason=lesson_missing lesson_id={lesson_id}");
        return None;
    };

    let source_date = dragged.date;
    if to_date_key(source_date) != source_key {
        debug!(
            "event=lesson_drop module=drag status=ok note=source_key_mismatch lesson_id={lesson_id}"
        );
    }

    let (lessons, moved) = splice_lesson(
        store.lessons(),
        dragged,
        destination_date,
        destination_index,
    );

    info!(
        "event=lesson_drop module=drag status=ok lesson_id={lesson_id} from={source_date} to={destination_date} order={}",
        moved.order
    );
    store.commit_lessons(lessons, "lesson_drop");
    Some(moved)
}

/// Pure remove / splice / renumber step of a lesson drop.
///
/// Destination lessons are moved to the end of the collection in their new
/// order; all other lessons keep their collection position.
fn splice_lesson(
    current: &[Lesson],
    mut dragged: Lesson,
    destination_date: NaiveDate,
    destination_index: usize,
) -> (Vec<Lesson>, Lesson) {
    let source_date = dragged.date;
    let unit_id = dragged.unit_id;
    dragged.date = destination_date;

    let (mut destination, mut rest): (Vec<Lesson>, Vec<Lesson>) = current
        .iter()
        .filter(|lesson| lesson.id != dragged.id)
        .cloned()
        .partition(|lesson| lesson.in_partition(unit_id, destination_date));

    destination.sort_by_key(|lesson| lesson.order);
    let index = destination_index.min(destination.len());
    destination.insert(index, dragged);
    for (position, lesson) in destination.iter_mut().enumerate() {
        lesson.order = position;
    }
    let moved = destination[index].clone();

    if source_date != destination_date {
        renumber_partition(&mut rest, unit_id, source_date);
    }

    rest.extend(destination);
    (rest, moved)
}
