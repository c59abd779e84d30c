use async_trait::async_trait;
use kindstore_types::{Cursor, Entity, Key};
use serde::{Deserialize, Serialize};

use crate::error::BackendResult;

/// Write mode for a save call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveMethod {
    /// Create or overwrite. Last writer wins.
    #[default]
    Upsert,
    /// Create only; existing keys fail with `AlreadyExists`.
    Insert,
    /// Overwrite only; absent keys fail with `NotFound`.
    Update,
}

/// Commit report for a save or delete call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MutationReport {
    /// One entry per mutation the backend committed.
    pub mutation_results: Vec<Key>,
    /// Index entries the backend touched while committing.
    pub index_updates: u64,
}

/// Whether a query page was cut short by its limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MoreResults {
    MoreResultsAfterLimit,
    NoMoreResults,
}

impl MoreResults {
    pub fn has_more(self) -> bool {
        matches!(self, Self::MoreResultsAfterLimit)
    }
}

/// One query row: a full entity or only its key.
#[derive(Clone, Debug, PartialEq)]
pub enum Row {
    Entity(Entity),
    KeyOnly(Key),
}

impl Row {
    pub fn key(&self) -> &Key {
        match self {
            Row::Entity(entity) => &entity.key,
            Row::KeyOnly(key) => key,
        }
    }

    pub fn entity(&self) -> Option<&Entity> {
        match self {
            Row::Entity(entity) => Some(entity),
            Row::KeyOnly(_) => None,
        }
    }
}

/// A validated scan handed to a backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanRequest {
    pub kind: String,
    pub namespace: Option<String>,
    pub keys_only: bool,
    pub limit: Option<usize>,
    /// Resume strictly after this key.
    pub start_after: Option<Key>,
}

impl ScanRequest {
    pub fn matches(&self, key: &Key) -> bool {
        key.is_in(&self.kind, self.namespace.as_deref())
    }
}

/// Rows a backend returned for one scan.
#[derive(Clone, Debug, PartialEq)]
pub struct ScanPage {
    pub rows: Vec<Row>,
    pub more: MoreResults,
}

/// A query page as returned to callers.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    /// Resumes after the last row, if any row was returned.
    pub cursor: Option<Cursor>,
    pub more: MoreResults,
}

impl QueryResult {
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.rows.iter().map(Row::key)
    }
}

/// Storage backend behind an [`EntityStore`](crate::EntityStore).
///
/// This is the surface of a managed document-store SDK: batched get, save,
/// and delete by key, single-entity insert, and kind scans. Implementations
/// must be thread-safe and must not retry internally; every failure is
/// returned to the caller as-is.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Fetch entities for `keys`. The result is aligned with `keys`; absent
    /// keys yield `None`.
    async fn get(&self, keys: &[Key]) -> BackendResult<Vec<Option<Entity>>>;

    /// Write `entities` using `method`.
    async fn save(&self, entities: &[Entity], method: SaveMethod) -> BackendResult<MutationReport>;

    /// Delete `keys`. Absent keys are not an error and produce no mutation.
    async fn delete(&self, keys: &[Key]) -> BackendResult<MutationReport>;

    /// Create a single entity, failing with `AlreadyExists` if present.
    ///
    /// Default implementation delegates to `save` with [`SaveMethod::Insert`].
    async fn insert(&self, entity: &Entity) -> BackendResult<MutationReport> {
        self.save(std::slice::from_ref(entity), SaveMethod::Insert)
            .await
    }

    /// Scan one kind within one namespace.
    async fn run_query(&self, request: &ScanRequest) -> BackendResult<ScanPage>;
}
