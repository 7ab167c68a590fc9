use chrono::NaiveDate;
use lesson_planner_core::service::drag_service::{handle_drag_end_lesson, move_unit, DragSource};
use lesson_planner_core::{
    DragError, DragReorder, DragState, DropOutcome, DropTarget, Lesson, LessonDraft,
    MemoryKeyValueStore, PlannerRepository, PlannerStore, Unit,
};
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn store_with_unit() -> (PlannerStore<MemoryKeyValueStore>, Unit) {
    let mut store =
        PlannerStore::open(PlannerRepository::new(MemoryKeyValueStore::new())).unwrap();
    let unit = store
        .add_unit("Algebra I", Some(date(2024, 1, 1)), Some(date(2024, 1, 5)))
        .unwrap();
    (store, unit)
}

fn add(store: &mut PlannerStore<MemoryKeyValueStore>, unit: &Unit, title: &str, day: NaiveDate) -> Lesson {
    store
        .add_lesson(unit.id, LessonDraft::new(title, day))
        .unwrap()
}

fn current(store: &PlannerStore<MemoryKeyValueStore>, lesson: &Lesson) -> Lesson {
    store.lesson(lesson.id).unwrap().clone()
}

fn unit_names(store: &PlannerStore<MemoryKeyValueStore>) -> Vec<String> {
    store
        .units_by_order()
        .iter()
        .map(|unit| unit.name.clone())
        .collect()
}

#[test]
fn same_date_drag_to_front_swaps_orders() {
    let (mut store, unit) = store_with_unit();
    let intro = add(&mut store, &unit, "Intro", date(2024, 1, 2));
    let quiz = add(&mut store, &unit, "Quiz", date(2024, 1, 2));

    let moved = handle_drag_end_lesson(&mut store, quiz.id, "2024-01-02", date(2024, 1, 2), 0)
        .unwrap();

    assert_eq!(moved.order, 0);
    assert_eq!(current(&store, &quiz).order, 0);
    assert_eq!(current(&store, &intro).order, 1);
}

#[test]
fn cross_date_drag_renumbers_source_and_destination() {
    let (mut store, unit) = store_with_unit();
    let first = add(&mut store, &unit, "First", date(2024, 1, 2));
    let second = add(&mut store, &unit, "Second", date(2024, 1, 2));

    handle_drag_end_lesson(&mut store, first.id, "2024-01-02", date(2024, 1, 3), 0).unwrap();

    let moved = current(&store, &first);
    assert_eq!(moved.date, date(2024, 1, 3));
    assert_eq!(moved.order, 0);
    assert_eq!(current(&store, &second).order, 0);
    assert_eq!(store.lessons().len(), 2);
}

#[test]
fn drop_index_is_clamped_to_destination_length() {
    let (mut store, unit) = store_with_unit();
    add(&mut store, &unit, "A", date(2024, 1, 3));
    add(&mut store, &unit, "B", date(2024, 1, 3));
    let mover = add(&mut store, &unit, "Mover", date(2024, 1, 2));

    let moved =
        handle_drag_end_lesson(&mut store, mover.id, "2024-01-02", date(2024, 1, 3), 40).unwrap();

    assert_eq!(moved.order, 2);
}

#[test]
fn dropping_into_the_middle_shifts_later_lessons() {
    let (mut store, unit) = store_with_unit();
    let a = add(&mut store, &unit, "A", date(2024, 1, 3));
    let b = add(&mut store, &unit, "B", date(2024, 1, 3));
    let mover = add(&mut store, &unit, "Mover", date(2024, 1, 4));

    handle_drag_end_lesson(&mut store, mover.id, "2024-01-04", date(2024, 1, 3), 1).unwrap();

    assert_eq!(current(&store, &a).order, 0);
    assert_eq!(current(&store, &mover).order, 1);
    assert_eq!(current(&store, &b).order, 2);
}

#[test]
fn unknown_lesson_drop_is_a_silent_no_op() {
    let (mut store, unit) = store_with_unit();
    let lesson = add(&mut store, &unit, "Intro", date(2024, 1, 2));
    let before = store.lessons().to_vec();

    let moved =
        handle_drag_end_lesson(&mut store, Uuid::new_v4(), "2024-01-02", date(2024, 1, 3), 0);

    assert!(moved.is_none());
    assert_eq!(store.lessons(), before.as_slice());
    assert_eq!(current(&store, &lesson).date, date(2024, 1, 2));
}

#[test]
fn move_unit_relocates_one_item() {
    let (mut store, _) = store_with_unit();
    store.add_unit("Geometry", None, None).unwrap();
    store.add_unit("Calculus", None, None).unwrap();

    move_unit(&mut store, 0, 2).unwrap();
    assert_eq!(unit_names(&store), vec!["Geometry", "Calculus", "Algebra I"]);

    move_unit(&mut store, 2, 0).unwrap();
    assert_eq!(unit_names(&store), vec!["Algebra I", "Geometry", "Calculus"]);

    move_unit(&mut store, 9, 0).unwrap();
    assert_eq!(unit_names(&store), vec!["Algebra I", "Geometry", "Calculus"]);
}

#[test]
fn gesture_commits_a_lesson_move_once() {
    let (mut store, unit) = store_with_unit();
    let intro = add(&mut store, &unit, "Intro", date(2024, 1, 2));
    let quiz = add(&mut store, &unit, "Quiz", date(2024, 1, 2));
    let mut drag = DragReorder::new();

    drag.begin_lesson_drag(quiz.id, date(2024, 1, 2)).unwrap();
    assert_eq!(
        drag.state(),
        &DragState::Dragging(DragSource::Lesson {
            lesson_id: quiz.id,
            source_key: "2024-01-02".to_string(),
        })
    );
    assert!(matches!(
        drag.begin_unit_drag(unit.id),
        Err(DragError::AlreadyDragging)
    ));
    assert_eq!(current(&store, &quiz).order, 1);

    let outcome = drag
        .commit_lesson_move(&mut store, date(2024, 1, 2), 0)
        .unwrap();

    assert!(matches!(outcome, DropOutcome::LessonMoved(ref lesson) if lesson.id == quiz.id));
    assert!(!drag.is_dragging());
    assert_eq!(current(&store, &intro).order, 1);
    assert!(matches!(
        drag.commit_lesson_move(&mut store, date(2024, 1, 2), 0),
        Err(DragError::NotDragging)
    ));
}

#[test]
fn abandoned_gesture_mutates_nothing() {
    let (mut store, unit) = store_with_unit();
    let lesson = add(&mut store, &unit, "Intro", date(2024, 1, 2));
    let before = store.lessons().to_vec();
    let mut drag = DragReorder::new();

    drag.begin_lesson_drag(lesson.id, date(2024, 1, 2)).unwrap();
    let source = drag.cancel();

    assert!(matches!(source, Some(DragSource::Lesson { .. })));
    assert_eq!(drag.state(), &DragState::Idle);
    assert_eq!(store.lessons(), before.as_slice());
    assert_eq!(drag.cancel(), None);
}

#[test]
fn gesture_commits_a_unit_move() {
    let (mut store, algebra) = store_with_unit();
    store.add_unit("Geometry", None, None).unwrap();
    let mut drag = DragReorder::new();

    drag.begin_unit_drag(algebra.id).unwrap();
    let outcome = drag.commit_unit_move(&mut store, 1).unwrap();

    assert_eq!(outcome, DropOutcome::UnitMoved);
    assert_eq!(unit_names(&store), vec!["Geometry", "Algebra I"]);
}

#[test]
fn mismatched_target_abandons_gesture() {
    let (mut store, algebra) = store_with_unit();
    let mut drag = DragReorder::new();

    drag.begin_unit_drag(algebra.id).unwrap();
    let err = drag
        .commit(
            &mut store,
            DropTarget::LessonDate {
                date: date(2024, 1, 2),
                index: 0,
            },
        )
        .unwrap_err();

    assert!(matches!(err, DragError::TargetMismatch));
    assert!(!drag.is_dragging());
    assert_eq!(store.unit(algebra.id).unwrap().order, 0);
}

#[test]
fn dragging_a_deleted_lesson_is_ignored() {
    let (mut store, unit) = store_with_unit();
    let lesson = add(&mut store, &unit, "Intro", date(2024, 1, 2));
    let mut drag = DragReorder::new();

    drag.begin_lesson_drag(lesson.id, date(2024, 1, 2)).unwrap();
    store.delete_lesson(lesson.id).unwrap();
    let outcome = drag
        .commit_lesson_move(&mut store, date(2024, 1, 3), 0)
        .unwrap();

    assert_eq!(outcome, DropOutcome::Ignored);
    assert!(store.lessons().is_empty());
}
