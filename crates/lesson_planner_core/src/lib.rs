//! Core of a local-first lesson planner.
//! Owns units, lessons and their ordering rules; UI layers consume plain data.

pub mod api;
pub mod dates;
pub mod db;
pub mod logging;
pub mod model;
pub mod projection;
pub mod repo;
pub mod service;

pub use api::{ActionResponse, Notice, NoticeKind, PlannerApi, NOTICE_DURATION};
pub use dates::{format_display, is_same_day, parse_date_key, to_date_key, weekdays_in_range};
pub use logging::{default_log_level, init_logging, logging_status, LogLevel, LoggingError};
pub use model::lesson::{Lesson, LessonDraft, LessonId, LessonPatch};
pub use model::unit::{Unit, UnitId};
pub use model::ModelValidationError;
pub use projection::calendar::{
    lessons_by_date, lessons_in_month, month_grid, week_label, weeks_from, MonthCell,
};
pub use repo::file_exchange::{DirectoryFileExchange, ExchangeError, FileExchange, MemoryFileExchange};
pub use repo::kv_store::{
    KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore, StoreError, StoreResult,
};
pub use repo::planner_repo::{PlannerRepository, StorageKeys};
pub use service::drag_service::{DragError, DragReorder, DragState, DropOutcome, DropTarget};
pub use service::exchange_service::{
    export_file_name, export_snapshot, import_snapshot, ExchangeService, ExchangeServiceError,
    ImportError, PlannerSnapshot,
};
pub use service::planner_store::{PlannerError, PlannerResult, PlannerStore};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
