//! Backup export/import of planner state.
//!
//! # Responsibility
//! - Encode the two collections as one portable JSON document.
//! - Decode and check imported documents before they reach the store.
//! - Drive the file exchange for both directions.
//!
//! # Invariants
//! - A rejected import never touches the store.
//! - An accepted import replaces both collections in one mutation.

use crate::dates::to_date_key;
use crate::model::lesson::Lesson;
use crate::model::unit::{Unit, UnitId};
use crate::repo::file_exchange::{ExchangeError, FileExchange, BACKUP_FILE_PREFIX};
use crate::repo::kv_store::KeyValueStore;
use crate::service::planner_store::PlannerStore;
use chrono::NaiveDate;
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const UNITS_FIELD: &str = "units";
const LESSONS_FIELD: &str = "lessons";

/// Portable document holding both collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerSnapshot {
    pub units: Vec<Unit>,
    pub lessons: Vec<Lesson>,
}

impl PlannerSnapshot {
    /// Pretty-printed JSON form used for backup files.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Reasons an import document is rejected.
#[derive(Debug)]
pub enum ImportError {
    /// Bytes are not a JSON document.
    InvalidJson(String),
    /// Top-level field is absent, or the document is not an object.
    MissingCollection(&'static str),
    /// Top-level field is present but not an array.
    NotAnArray(&'static str),
    /// One record inside a collection failed to decode or validate.
    InvalidRecord {
        collection: &'static str,
        index: usize,
        message: String,
    },
    /// Two records in one collection share an id.
    DuplicateId {
        collection: &'static str,
        index: usize,
        id: Uuid,
    },
    /// A lesson references a unit the document does not contain.
    UnknownUnit { index: usize, unit_id: UnitId },
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidJson(message) => write!(f, "document is not valid JSON: {message}"),
            Self::MissingCollection(field) => write!(f, "document has no `{field}` field"),
            Self::NotAnArray(field) => write!(f, "`{field}` must be an array"),
            Self::InvalidRecord {
                collection,
                index,
                message,
            } => write!(f, "invalid record {collection}[{index}]: {message}"),
            Self::DuplicateId {
                collection,
                index,
                id,
            } => write!(f, "duplicate id in {collection}[{index}]: {id}"),
            Self::UnknownUnit { index, unit_id } => {
                write!(f, "lessons[{index}] references unknown unit {unit_id}")
            }
        }
    }
}

impl Error for ImportError {}

/// Errors from the file-driven export/import flow.
#[derive(Debug)]
pub enum ExchangeServiceError {
    Import(ImportError),
    Exchange(ExchangeError),
    /// Snapshot could not be encoded.
    Encode(String),
    /// Import was asked to read a file without a `.json` suffix.
    UnsupportedFileName(String),
}

impl Display for ExchangeServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Import(err) => write!(f, "{err}"),
            Self::Exchange(err) => write!(f, "{err}"),
            Self::Encode(message) => write!(f, "snapshot encode failed: {message}"),
            Self::UnsupportedFileName(name) => {
                write!(f, "only .json files can be imported: `{name}`")
            }
        }
    }
}

impl Error for ExchangeServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Import(err) => Some(err),
            Self::Exchange(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ImportError> for ExchangeServiceError {
    fn from(value: ImportError) -> Self {
        Self::Import(value)
    }
}

impl From<ExchangeError> for ExchangeServiceError {
    fn from(value: ExchangeError) -> Self {
        Self::Exchange(value)
    }
}

/// Copies both collections into an export document.
pub fn export_snapshot(units: &[Unit], lessons: &[Lesson]) -> PlannerSnapshot {
    PlannerSnapshot {
        units: units.to_vec(),
        lessons: lessons.to_vec(),
    }
}

/// Backup file name for an export made on `today`.
pub fn export_file_name(today: NaiveDate) -> String {
    format!("{BACKUP_FILE_PREFIX}{}.json", to_date_key(today))
}

/// Decodes an import document.
///
/// Shape checks run first (`units` and `lessons` present and array-shaped),
/// then every record is decoded and validated, then the collections are
/// checked as a whole (unique ids, every lesson owned by an imported unit).
/// Any failure rejects the whole document.
pub fn import_snapshot(bytes: &[u8]) -> Result<PlannerSnapshot, ImportError> {
    let document: Value =
        serde_json::from_slice(bytes).map_err(|err| ImportError::InvalidJson(err.to_string()))?;

    let units_raw = collection_field(&document, UNITS_FIELD)?;
    let lessons_raw = collection_field(&document, LESSONS_FIELD)?;

    let units: Vec<Unit> = decode_records(UNITS_FIELD, units_raw, Unit::validate)?;
    let lessons: Vec<Lesson> = decode_records(LESSONS_FIELD, lessons_raw, Lesson::validate)?;

    let unit_ids = unique_ids(UNITS_FIELD, units.iter().map(|unit| unit.id))?;
    unique_ids(LESSONS_FIELD, lessons.iter().map(|lesson| lesson.id))?;
    if let Some((index, lesson)) = lessons
        .iter()
        .enumerate()
        .find(|(_, lesson)| !unit_ids.contains(&lesson.unit_id))
    {
        return Err(ImportError::UnknownUnit {
            index,
            unit_id: lesson.unit_id,
        });
    }

    Ok(PlannerSnapshot { units, lessons })
}

fn unique_ids(
    collection: &'static str,
    ids: impl Iterator<Item = Uuid>,
) -> Result<HashSet<Uuid>, ImportError> {
    let mut seen = HashSet::new();
    for (index, id) in ids.enumerate() {
        if !seen.insert(id) {
            return Err(ImportError::DuplicateId {
                collection,
                index,
                id,
            });
        }
    }
    Ok(seen)
}

fn collection_field<'a>(document: &'a Value, field: &'static str) -> Result<&'a [Value], ImportError> {
    let value = document
        .get(field)
        .ok_or(ImportError::MissingCollection(field))?;
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or(ImportError::NotAnArray(field))
}

fn decode_records<T, E, F>(
    collection: &'static str,
    raw: &[Value],
    validate: F,
) -> Result<Vec<T>, ImportError>
where
    T: DeserializeOwned,
    E: Display,
    F: Fn(&T) -> Result<(), E>,
{
    raw.iter()
        .enumerate()
        .map(|(index, value)| -> Result<T, ImportError> {
            let invalid = |message: String| ImportError::InvalidRecord {
                collection,
                index,
                message,
            };
            let record = T::deserialize(value).map_err(|err| invalid(err.to_string()))?;
            validate(&record).map_err(|err| invalid(err.to_string()))?;
            Ok(record)
        })
        .collect()
}

fn has_json_suffix(file_name: &str) -> bool {
    file_name.to_ascii_lowercase().ends_with(".json")
}

/// Export/import flow over one file exchange backend.
pub struct ExchangeService<E: FileExchange> {
    exchange: E,
}

impl<E: FileExchange> ExchangeService<E> {
    pub fn new(exchange: E) -> Self {
        Self { exchange }
    }

    pub fn exchange(&self) -> &E {
        &self.exchange
    }

    pub fn exchange_mut(&mut self) -> &mut E {
        &mut self.exchange
    }

    /// Writes the store's collections to a dated backup file.
    ///
    /// Returns the written file name.
    pub fn export_to<S: KeyValueStore>(
        &mut self,
        store: &PlannerStore<S>,
        today: NaiveDate,
    ) -> Result<String, ExchangeServiceError> {
        let snapshot = export_snapshot(store.units(), store.lessons());
        let json = snapshot
            .to_json()
            .map_err(|err| ExchangeServiceError::Encode(err.to_string()))?;
        let file_name = export_file_name(today);
        self.exchange.export_bytes(&file_name, json.as_bytes())?;

        info!(
            "event=snapshot_export module=exchange_service status=ok units={} lessons={}",
            snapshot.units.len(),
            snapshot.lessons.len()
        );
        Ok(file_name)
    }

    /// Reads `file_name` and, when it decodes, replaces the store's
    /// collections with its content.
    ///
    /// Returns the collections as stored, after order normalization.
    pub fn import_from<S: KeyValueStore>(
        &self,
        store: &mut PlannerStore<S>,
        file_name: &str,
    ) -> Result<PlannerSnapshot, ExchangeServiceError> {
        if !has_json_suffix(file_name) {
            warn!("event=snapshot_import module=exchange_service status=rejected reason=file_suffix");
            return Err(ExchangeServiceError::UnsupportedFileName(
                file_name.to_string(),
            ));
        }

        let bytes = self.exchange.import_bytes(file_name)?;
        let snapshot = import_snapshot(&bytes).map_err(|err| {
            warn!("event=snapshot_import module=exchange_service status=rejected reason={err}");
            err
        })?;

        store.replace_all(snapshot.units, snapshot.lessons);
        info!(
            "event=snapshot_import module=exchange_service status=ok units={} lessons={}",
            store.units().len(),
            store.lessons().len()
        );
        Ok(export_snapshot(store.units(), store.lessons()))
    }
}

#[cfg(test)]
mod tests {
    use super::{export_file_name, has_json_suffix, import_snapshot, ImportError};
    use chrono::NaiveDate;

    #[test]
    fn file_name_embeds_export_date() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 9).expect("valid date");
        assert_eq!(
            export_file_name(today),
            "lesson_planner_backup_2024-03-09.json"
        );
    }

    #[test]
    fn json_suffix_check_ignores_case() {
        assert!(has_json_suffix("backup.JSON"));
        assert!(has_json_suffix("backup.json"));
        assert!(!has_json_suffix("backup.json.txt"));
        assert!(!has_json_suffix("backup"));
    }

    #[test]
    fn shape_checks_run_before_record_decoding() {
        let err = import_snapshot(br#"{"units": [{"bogus": true}]}"#).expect_err("no lessons");
        assert!(matches!(err, ImportError::MissingCollection("lessons")));

        let err = import_snapshot(br#"{"units": {}, "lessons": []}"#).expect_err("units object");
        assert!(matches!(err, ImportError::NotAnArray("units")));

        let err = import_snapshot(br#"[1, 2]"#).expect_err("top-level array");
        assert!(matches!(err, ImportError::MissingCollection("units")));
    }

    #[test]
    fn empty_collections_are_accepted() {
        let snapshot = import_snapshot(br#"{"units": [], "lessons": []}"#).expect("empty import");
        assert!(snapshot.units.is_empty());
        assert!(snapshot.lessons.is_empty());
    }
}
