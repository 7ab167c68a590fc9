//! Persisted planner state layout over a key-value store.
//!
//! # Responsibility
//! - Map the unit collection, lesson collection and session identifier to
//!   three independent string keys.
//! - Encode/decode collections as JSON arrays.
//!
//! # Invariants
//! - A missing collection key reads as an empty collection.
//! - Both collections are always written together through `set_many`.
//! - The session identifier is generated once and never rewritten.

use super::kv_store::{KeyValueStore, StoreError, StoreResult};
use crate::model::lesson::Lesson;
use crate::model::unit::Unit;
use log::info;
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Key names for the three persisted values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub units: String,
    pub lessons: String,
    pub session_id: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            units: "lessonPlannerUnits".to_string(),
            lessons: "lessonPlannerLessons".to_string(),
            session_id: "lessonPlannerUserId".to_string(),
        }
    }
}

/// Typed access to persisted planner state.
pub struct PlannerRepository<S: KeyValueStore> {
    store: S,
    keys: StorageKeys,
}

impl<S: KeyValueStore> PlannerRepository<S> {
    /// Creates a repository using the default key names.
    pub fn new(store: S) -> Self {
        Self::with_keys(store, StorageKeys::default())
    }

    /// Creates a repository using custom key names.
    pub fn with_keys(store: S, keys: StorageKeys) -> Self {
        Self { store, keys }
    }

    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    /// Borrows the backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutably borrows the backing store.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Loads the unit collection in stored list order.
    pub fn load_units(&self) -> StoreResult<Vec<Unit>> {
        self.load_collection(&self.keys.units)
    }

    /// Loads the lesson collection in stored list order.
    pub fn load_lessons(&self) -> StoreResult<Vec<Lesson>> {
        self.load_collection(&self.keys.lessons)
    }

    /// Returns the stored session identifier, generating and writing one
    /// when absent.
    pub fn load_or_create_session_id(&mut self) -> StoreResult<String> {
        if let Some(existing) = self.store.get(&self.keys.session_id)? {
            if !existing.trim().is_empty() {
                return Ok(existing);
            }
        }

        let session_id = Uuid::new_v4().to_string();
        self.store.set(&self.keys.session_id, &session_id)?;
        info!("event=session_id_created module=repo status=ok");
        Ok(session_id)
    }

    /// Writes both collections as one unit.
    pub fn save_collections(&mut self, units: &[Unit], lessons: &[Lesson]) -> StoreResult<()> {
        let units_json =
            serde_json::to_string(units).map_err(|err| StoreError::Encode(err.to_string()))?;
        let lessons_json =
            serde_json::to_string(lessons).map_err(|err| StoreError::Encode(err.to_string()))?;

        self.store.set_many(&[
            (self.keys.units.as_str(), units_json.as_str()),
            (self.keys.lessons.as_str(), lessons_json.as_str()),
        ])
    }

    fn load_collection<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Vec<T>> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(Vec::new());
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&raw).map_err(|err| StoreError::Corrupt {
            key: key.to_string(),
            message: err.to_string(),
        })
    }
}
