use chrono::NaiveDate;
use lesson_planner_core::{
    export_snapshot, import_snapshot, DirectoryFileExchange, ExchangeService, ExchangeServiceError,
    FileExchange, ImportError, LessonDraft, LessonPatch, MemoryFileExchange, MemoryKeyValueStore,
    PlannerRepository, PlannerSnapshot, PlannerStore,
};
use serde_json::json;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn empty_store() -> PlannerStore<MemoryKeyValueStore> {
    PlannerStore::open(PlannerRepository::new(MemoryKeyValueStore::new())).unwrap()
}

fn populated_store() -> PlannerStore<MemoryKeyValueStore> {
    let mut store = empty_store();
    let algebra = store
        .add_unit("Algebra I", Some(date(2024, 1, 1)), Some(date(2024, 1, 5)))
        .unwrap();
    store.add_unit("Geometry", None, None).unwrap();
    store
        .add_lesson(algebra.id, LessonDraft::new("Intro", date(2024, 1, 2)))
        .unwrap();
    let quiz = store
        .add_lesson(algebra.id, LessonDraft::new("Quiz", date(2024, 1, 2)).graded(true))
        .unwrap();
    store
        .update_lesson(
            quiz.id,
            LessonPatch {
                google_slides_link: Some("https://slides.example/quiz".to_string()),
                additional_links: Some("https://example.org/a".to_string()),
                ..LessonPatch::default()
            },
        )
        .unwrap();
    store
}

const ALGEBRA_ID: &str = "5d1b7f5e-8c1a-4f3e-9a57-1d2f4f6c9b10";
const GEOMETRY_ID: &str = "6e2c8a6f-9d2b-4a4f-8b68-2e3a5a7d0c21";
const INTRO_ID: &str = "0b9f0c4e-2d43-4c7f-8f0b-6a7e3b2d1c55";
const QUIZ_ID: &str = "1ca01d5f-3e54-4d80-9a1c-7b8f4c3e2d66";

fn unit_json(id: &str, name: &str, order: usize) -> serde_json::Value {
    json!({"id": id, "name": name, "startDate": null, "endDate": null, "order": order})
}

fn lesson_json(id: &str, unit_id: &str, day: &str, order: usize, title: &str) -> serde_json::Value {
    json!({"id": id, "unitId": unit_id, "date": day, "order": order, "title": title})
}

#[test]
fn export_then_import_reproduces_collections() {
    let store = populated_store();

    let snapshot = export_snapshot(store.units(), store.lessons());
    let json = snapshot.to_json().unwrap();
    let imported = import_snapshot(json.as_bytes()).unwrap();

    assert_eq!(imported, snapshot);
    assert_eq!(imported.units, store.units());
    assert_eq!(imported.lessons, store.lessons());
}

#[test]
fn export_document_uses_wire_field_names() {
    let store = populated_store();

    let json = export_snapshot(store.units(), store.lessons()).to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    let unit = &value["units"][0];
    assert_eq!(unit["name"], "Algebra I");
    assert_eq!(unit["startDate"], "2024-01-01");
    assert_eq!(unit["endDate"], "2024-01-05");
    assert_eq!(unit["order"], 0);
    assert!(value["units"][1]["startDate"].is_null());

    let quiz = &value["lessons"][1];
    assert_eq!(quiz["date"], "2024-01-02");
    assert_eq!(quiz["isGraded"], true);
    assert_eq!(quiz["googleSlidesLink"], "https://slides.example/quiz");
    assert_eq!(quiz["unitId"], unit["id"]);
    assert_eq!(quiz["activityAssignment"], "");
}

#[test]
fn lessons_without_optional_fields_decode_with_defaults() {
    let doc = json!({
        "units": [{
            "id": "5d1b7f5e-8c1a-4f3e-9a57-1d2f4f6c9b10",
            "name": "Algebra I",
            "startDate": null,
            "endDate": null,
            "order": 0
        }],
        "lessons": [{
            "id": "0b9f0c4e-2d43-4c7f-8f0b-6a7e3b2d1c55",
            "unitId": "5d1b7f5e-8c1a-4f3e-9a57-1d2f4f6c9b10",
            "date": "2024-01-02",
            "order": 0,
            "title": "Intro"
        }]
    });

    let snapshot = import_snapshot(doc.to_string().as_bytes()).unwrap();

    let lesson = &snapshot.lessons[0];
    assert_eq!(lesson.readings, "");
    assert!(!lesson.is_graded);
    assert_eq!(lesson.date, date(2024, 1, 2));
}

#[test]
fn malformed_documents_are_rejected() {
    assert!(matches!(
        import_snapshot(b"{ not json"),
        Err(ImportError::InvalidJson(_))
    ));
    assert!(matches!(
        import_snapshot(json!({"lessons": []}).to_string().as_bytes()),
        Err(ImportError::MissingCollection("units"))
    ));
    assert!(matches!(
        import_snapshot(json!({"units": [], "lessons": "none"}).to_string().as_bytes()),
        Err(ImportError::NotAnArray("lessons"))
    ));
    assert!(matches!(
        import_snapshot(json!({"units": [{"name": "no id"}], "lessons": []}).to_string().as_bytes()),
        Err(ImportError::InvalidRecord { collection: "units", index: 0, .. })
    ));
    assert!(matches!(
        import_snapshot(
            json!({
                "units": [],
                "lessons": [{
                    "id": "0b9f0c4e-2d43-4c7f-8f0b-6a7e3b2d1c55",
                    "unitId": "5d1b7f5e-8c1a-4f3e-9a57-1d2f4f6c9b10",
                    "date": "2024-01-02",
                    "order": 0,
                    "title": "   "
                }]
            })
            .to_string()
            .as_bytes()
        ),
        Err(ImportError::InvalidRecord { collection: "lessons", index: 0, .. })
    ));
}

#[test]
fn import_replaces_state_and_selects_first_unit() {
    let source = populated_store();
    let mut exchange = ExchangeService::new(MemoryFileExchange::new());
    let file_name = exchange.export_to(&source, date(2024, 3, 9)).unwrap();
    assert_eq!(file_name, "lesson_planner_backup_2024-03-09.json");

    let mut target = empty_store();
    target.add_unit("Throwaway", None, None).unwrap();
    let snapshot = exchange.import_from(&mut target, &file_name).unwrap();

    assert_eq!(target.units(), snapshot.units.as_slice());
    assert_eq!(target.lessons(), source.lessons());
    assert_eq!(target.selected_unit_id(), Some(source.units()[0].id));

    let persisted = PlannerStore::open(PlannerRepository::new(
        target.repository().store().clone(),
    ))
    .unwrap();
    assert_eq!(persisted.lessons(), source.lessons());
}

#[test]
fn importing_empty_units_clears_selection() {
    let mut exchange = ExchangeService::new(MemoryFileExchange::new());
    exchange
        .exchange_mut()
        .insert("empty.json", r#"{"units": [], "lessons": []}"#);
    let mut store = populated_store();

    exchange.import_from(&mut store, "empty.json").unwrap();

    assert!(store.units().is_empty());
    assert!(store.lessons().is_empty());
    assert_eq!(store.selected_unit_id(), None);
}

#[test]
fn rejected_import_leaves_state_untouched() {
    let mut exchange = ExchangeService::new(MemoryFileExchange::new());
    exchange
        .exchange_mut()
        .insert("bad.json", r#"{"units": []}"#);
    exchange
        .exchange_mut()
        .insert("notes.txt", r#"{"units": [], "lessons": []}"#);
    let mut store = populated_store();
    let before: PlannerSnapshot = export_snapshot(store.units(), store.lessons());

    let err = exchange.import_from(&mut store, "bad.json").unwrap_err();
    assert!(matches!(
        err,
        ExchangeServiceError::Import(ImportError::MissingCollection("lessons"))
    ));

    let err = exchange.import_from(&mut store, "notes.txt").unwrap_err();
    assert!(matches!(err, ExchangeServiceError::UnsupportedFileName(_)));

    let err = exchange.import_from(&mut store, "missing.json").unwrap_err();
    assert!(matches!(err, ExchangeServiceError::Exchange(_)));

    assert_eq!(export_snapshot(store.units(), store.lessons()), before);
}

#[test]
fn uppercase_json_suffix_is_accepted() {
    let mut exchange = ExchangeService::new(MemoryFileExchange::new());
    exchange
        .exchange_mut()
        .insert("BACKUP.JSON", r#"{"units": [], "lessons": []}"#);
    let mut store = empty_store();

    assert!(exchange.import_from(&mut store, "BACKUP.JSON").is_ok());
}

#[test]
fn directory_exchange_writes_and_lists_backups() {
    let dir = tempfile::tempdir().unwrap();
    let store = populated_store();
    let mut exchange = ExchangeService::new(DirectoryFileExchange::new(dir.path().join("backups")));

    let older = exchange.export_to(&store, date(2024, 1, 10)).unwrap();
    let newer = exchange.export_to(&store, date(2024, 2, 1)).unwrap();
    std::fs::write(dir.path().join("backups").join("notes.txt"), "x").unwrap();

    let backups = exchange.exchange().list_backups().unwrap();
    let names: Vec<&str> = backups.iter().map(|b| b.file_name.as_str()).collect();
    assert_eq!(names, vec![newer.as_str(), older.as_str()]);
    assert_eq!(backups[0].date, date(2024, 2, 1));

    let bytes = exchange.exchange().import_bytes(&newer).unwrap();
    let snapshot = import_snapshot(&bytes).unwrap();
    assert_eq!(snapshot.lessons, store.lessons());
}

#[test]
fn listing_a_missing_directory_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let exchange = DirectoryFileExchange::new(dir.path().join("never-created"));

    assert!(exchange.list_backups().unwrap().is_empty());
}

#[test]
fn duplicate_ids_and_unknown_units_are_rejected() {
    let doc = json!({
        "units": [unit_json(ALGEBRA_ID, "Algebra I", 0), unit_json(ALGEBRA_ID, "Copy", 1)],
        "lessons": []
    });
    assert!(matches!(
        import_snapshot(doc.to_string().as_bytes()),
        Err(ImportError::DuplicateId { collection: "units", index: 1, ref id }) if id.to_string() == ALGEBRA_ID
    ));

    let doc = json!({
        "units": [unit_json(ALGEBRA_ID, "Algebra I", 0)],
        "lessons": [
            lesson_json(INTRO_ID, ALGEBRA_ID, "2024-01-02", 0, "Intro"),
            lesson_json(INTRO_ID, ALGEBRA_ID, "2024-01-03", 0, "Intro again"),
        ]
    });
    assert!(matches!(
        import_snapshot(doc.to_string().as_bytes()),
        Err(ImportError::DuplicateId { collection: "lessons", index: 1, .. })
    ));

    let doc = json!({
        "units": [unit_json(ALGEBRA_ID, "Algebra I", 0)],
        "lessons": [
            lesson_json(INTRO_ID, ALGEBRA_ID, "2024-01-02", 0, "Intro"),
            lesson_json(QUIZ_ID, GEOMETRY_ID, "2024-01-02", 0, "Orphan"),
        ]
    });
    assert!(matches!(
        import_snapshot(doc.to_string().as_bytes()),
        Err(ImportError::UnknownUnit { index: 1, ref unit_id }) if unit_id.to_string() == GEOMETRY_ID
    ));
}

#[test]
fn duplicate_lesson_ids_never_reach_the_store() {
    let doc = json!({
        "units": [unit_json(ALGEBRA_ID, "Algebra I", 0)],
        "lessons": [
            lesson_json(INTRO_ID, ALGEBRA_ID, "2024-01-02", 0, "Intro"),
            lesson_json(INTRO_ID, ALGEBRA_ID, "2024-01-02", 1, "Quiz"),
        ]
    });
    let mut exchange = ExchangeService::new(MemoryFileExchange::new());
    exchange.exchange_mut().insert("dupes.json", doc.to_string());
    let mut store = populated_store();
    let before = export_snapshot(store.units(), store.lessons());

    let err = exchange.import_from(&mut store, "dupes.json").unwrap_err();

    assert!(matches!(
        err,
        ExchangeServiceError::Import(ImportError::DuplicateId { collection: "lessons", .. })
    ));
    assert_eq!(export_snapshot(store.units(), store.lessons()), before);
}

#[test]
fn gapped_orders_are_compacted_on_import() {
    let doc = json!({
        "units": [unit_json(GEOMETRY_ID, "Geometry", 2), unit_json(ALGEBRA_ID, "Algebra I", 0)],
        "lessons": [
            lesson_json(QUIZ_ID, ALGEBRA_ID, "2024-01-02", 3, "Quiz"),
            lesson_json(INTRO_ID, ALGEBRA_ID, "2024-01-02", 0, "Intro"),
        ]
    });
    let mut exchange = ExchangeService::new(MemoryFileExchange::new());
    exchange.exchange_mut().insert("gaps.json", doc.to_string());
    let mut store = empty_store();

    let snapshot = exchange.import_from(&mut store, "gaps.json").unwrap();

    let unit_orders: Vec<usize> = store.units().iter().map(|unit| unit.order).collect();
    assert_eq!(unit_orders, vec![1, 0]);
    let lesson_orders: Vec<usize> = store.lessons().iter().map(|lesson| lesson.order).collect();
    assert_eq!(lesson_orders, vec![1, 0]);
    assert_eq!(snapshot.units, store.units());
    assert_eq!(snapshot.lessons, store.lessons());

    let history = store.add_unit("History", None, None).unwrap();
    assert_eq!(history.order, 2);
    let algebra = store.units()[1].id;
    let review = store
        .add_lesson(algebra, LessonDraft::new("Review", date(2024, 1, 2)))
        .unwrap();
    assert_eq!(review.order, 2);
}
