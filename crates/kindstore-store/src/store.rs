use std::collections::BTreeMap;
use std::sync::Arc;

use kindstore_types::{Cursor, Entity, EntityData, Key, KeyCodec, NativeKey};
use serde::Serialize;
use tracing::{debug, warn};

use crate::backend::{Backend, MutationReport, QueryResult, SaveMethod, ScanRequest};
use crate::config::{MissingKeyPolicy, StoreConfig};
use crate::context::CallContext;
use crate::error::{BackendError, StoreError, StoreResult};
use crate::format::ResultFormatter;

/// What to delete: a bare key, an entity carrying its key, or a native key
/// that still has to be decoded.
#[derive(Clone, Debug, PartialEq)]
pub enum DeleteTarget {
    ByKey(Key),
    ByEntity(Entity),
    ByNative(NativeKey),
}

impl DeleteTarget {
    /// Resolve the key to delete.
    pub fn resolve(self) -> StoreResult<Key> {
        match self {
            DeleteTarget::ByKey(key) => Ok(key),
            DeleteTarget::ByEntity(entity) => Ok(entity.key),
            DeleteTarget::ByNative(native) => Ok(KeyCodec::decode(&native)?),
        }
    }
}

impl From<Key> for DeleteTarget {
    fn from(key: Key) -> Self {
        DeleteTarget::ByKey(key)
    }
}

impl From<Entity> for DeleteTarget {
    fn from(entity: Entity) -> Self {
        DeleteTarget::ByEntity(entity)
    }
}

impl From<NativeKey> for DeleteTarget {
    fn from(native: NativeKey) -> Self {
        DeleteTarget::ByNative(native)
    }
}

/// Result of a lenient read.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Lookup {
    pub found: BTreeMap<Key, Entity>,
    /// Absent keys, in request order, without duplicates.
    pub missing: Vec<Key>,
}

/// Partition produced by [`EntityStore::insert_if_absent`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct InsertOutcome {
    pub inserted: Vec<String>,
    pub existed: Vec<String>,
}

/// Name-keyed formatted read. A `None` value marks an absent key under
/// [`MissingKeyPolicy::NullFill`]. Rows are formatted in request order, so
/// when two requested keys share a name the later one wins.
pub type ReadMap = BTreeMap<String, Option<EntityData>>;

/// A kind query as submitted by callers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryRequest {
    pub kind: String,
    pub namespace: Option<String>,
    pub keys_only: bool,
    pub limit: Option<usize>,
    pub start: Option<Cursor>,
}

/// Handle over a [`Backend`] with read policy and call context.
///
/// Cloning is cheap and shares the backend. Batch operations are not
/// transactional: when a call fails partway, mutations the backend already
/// committed stay committed.
#[derive(Clone)]
pub struct EntityStore {
    backend: Arc<dyn Backend>,
    config: Arc<StoreConfig>,
    context: CallContext,
}

impl EntityStore {
    pub fn new(backend: Arc<dyn Backend>, config: StoreConfig) -> Self {
        let context = CallContext::new(config.call_timeout());
        Self {
            backend,
            config: Arc::new(config),
            context,
        }
    }

    /// A handle sharing this store's backend but running calls under `context`.
    pub fn with_context(&self, context: CallContext) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            config: Arc::clone(&self.config),
            context,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn context(&self) -> &CallContext {
        &self.context
    }

    // ---- Reads ----

    /// Fetch `keys`, lenient about absence.
    pub async fn lookup(&self, keys: &[Key]) -> StoreResult<Lookup> {
        if keys.is_empty() {
            return Ok(Lookup::default());
        }
        self.context
            .run("lookup", async {
                let fetched = self.backend.get(keys).await?;
                let mut lookup = Lookup::default();
                for (key, entity) in keys.iter().zip(fetched) {
                    match entity {
                        Some(entity) => {
                            lookup.found.insert(key.clone(), entity);
                        }
                        None if !lookup.missing.contains(key) => lookup.missing.push(key.clone()),
                        None => {}
                    }
                }
                debug!(
                    requested = keys.len(),
                    found = lookup.found.len(),
                    missing = lookup.missing.len(),
                    "lookup"
                );
                Ok(lookup)
            })
            .await
    }

    /// Fetch `keys` under the configured [`MissingKeyPolicy`].
    ///
    /// With `Fail`, any absent key fails the whole read with `NotFound`.
    /// Otherwise absent keys are left out of the map.
    pub async fn get(&self, keys: &[Key]) -> StoreResult<BTreeMap<Key, Entity>> {
        Ok(self.checked_lookup(keys).await?.found)
    }

    /// Fetch `keys` and format them as name to data.
    pub async fn read(&self, keys: &[Key]) -> StoreResult<ReadMap> {
        let lookup = self.checked_lookup(keys).await?;
        let in_request_order = keys.iter().filter_map(|key| lookup.found.get(key));
        let formatted = ResultFormatter::entities(in_request_order);
        let mut items: ReadMap = formatted
            .items
            .into_iter()
            .map(|(name, data)| (name, Some(data)))
            .collect();
        if self.config.on_missing == MissingKeyPolicy::NullFill {
            for key in &lookup.missing {
                items.entry(key.name().to_owned()).or_insert(None);
            }
        }
        Ok(items)
    }

    async fn checked_lookup(&self, keys: &[Key]) -> StoreResult<Lookup> {
        if keys.is_empty() {
            return Err(StoreError::InvalidArgument("no keys to read".into()));
        }
        let lookup = self.lookup(keys).await?;
        if self.config.on_missing == MissingKeyPolicy::Fail && !lookup.missing.is_empty() {
            return Err(StoreError::NotFound {
                keys: lookup.missing,
            });
        }
        Ok(lookup)
    }

    // ---- Writes ----

    /// Upsert `entities`. Last writer wins.
    pub async fn put(&self, entities: &[Entity]) -> StoreResult<MutationReport> {
        self.save(entities, SaveMethod::Upsert).await
    }

    /// Write `entities` using `method` in one backend call.
    pub async fn save(&self, entities: &[Entity], method: SaveMethod) -> StoreResult<MutationReport> {
        if entities.is_empty() {
            return Err(StoreError::InvalidArgument("no entity to write".into()));
        }
        self.context
            .run("save", async {
                let report = self.backend.save(entities, method).await?;
                let committed = report.mutation_results.len();
                if committed != entities.len() {
                    warn!(expected = entities.len(), committed, "save not fully committed");
                    return Err(StoreError::WriteConflict {
                        expected: entities.len(),
                        committed,
                    });
                }
                debug!(count = committed, ?method, "save committed");
                Ok(report)
            })
            .await
    }

    /// Insert each entity one at a time, recording keys that already exist
    /// instead of failing.
    ///
    /// Any other backend failure aborts at that entity. Entities inserted
    /// before the failure remain committed.
    pub async fn insert_if_absent(&self, entities: &[Entity]) -> StoreResult<InsertOutcome> {
        self.context
            .run("insert_if_absent", async {
                let mut outcome = InsertOutcome::default();
                for entity in entities {
                    match self.backend.insert(entity).await {
                        Ok(_) => outcome.inserted.push(entity.name().to_owned()),
                        Err(BackendError::AlreadyExists(_)) => {
                            outcome.existed.push(entity.name().to_owned())
                        }
                        Err(err) => {
                            warn!(
                                key = %entity.key,
                                inserted = outcome.inserted.len(),
                                error = %err,
                                "insert aborted"
                            );
                            return Err(err.into());
                        }
                    }
                }
                debug!(
                    inserted = outcome.inserted.len(),
                    existed = outcome.existed.len(),
                    "insert_if_absent"
                );
                Ok(outcome)
            })
            .await
    }

    // ---- Deletes ----

    /// Delete one key or entity.
    pub async fn delete(&self, target: impl Into<DeleteTarget>) -> StoreResult<MutationReport> {
        let key = target.into().resolve()?;
        self.delete_keys(std::slice::from_ref(&key)).await
    }

    /// Delete several targets in one backend call. Every target is resolved
    /// before anything is deleted.
    pub async fn delete_many<I>(&self, targets: I) -> StoreResult<MutationReport>
    where
        I: IntoIterator,
        I::Item: Into<DeleteTarget>,
    {
        let keys = targets
            .into_iter()
            .map(|target| target.into().resolve())
            .collect::<StoreResult<Vec<Key>>>()?;
        self.delete_keys(&keys).await
    }

    pub async fn delete_keys(&self, keys: &[Key]) -> StoreResult<MutationReport> {
        if keys.is_empty() {
            return Err(StoreError::InvalidArgument("no keys to delete".into()));
        }
        self.context
            .run("delete", async {
                let report = self.backend.delete(keys).await?;
                debug!(
                    requested = keys.len(),
                    index_updates = report.index_updates,
                    "delete committed"
                );
                Ok(report)
            })
            .await
    }

    // ---- Queries ----

    /// Run one page of a kind query.
    pub async fn run_query(&self, request: &QueryRequest) -> StoreResult<QueryResult> {
        if request.kind.is_empty() {
            return Err(StoreError::InvalidArgument("query requires a kind".into()));
        }
        let start_after = match &request.start {
            Some(cursor) => {
                let key = cursor.position()?;
                if !key.is_in(&request.kind, request.namespace.as_deref()) {
                    return Err(StoreError::InvalidArgument(format!(
                        "cursor for {key} does not belong to this query"
                    )));
                }
                Some(key)
            }
            None => None,
        };
        let limit = request.limit.or(self.config.default_query_limit);
        if limit == Some(0) {
            return Err(StoreError::InvalidArgument("query limit must be positive".into()));
        }
        let scan = ScanRequest {
            kind: request.kind.clone(),
            namespace: request.namespace.clone(),
            keys_only: request.keys_only,
            limit,
            start_after,
        };

        self.context
            .run("run_query", async {
                let page = self.backend.run_query(&scan).await?;
                let cursor = match page.rows.last() {
                    Some(row) => Some(Cursor::after(row.key())?),
                    None => request.start.clone(),
                };
                debug!(
                    kind = %scan.kind,
                    namespace = ?scan.namespace,
                    keys_only = scan.keys_only,
                    rows = page.rows.len(),
                    more = ?page.more,
                    "query page"
                );
                Ok(QueryResult {
                    rows: page.rows,
                    cursor,
                    more: page.more,
                })
            })
            .await
    }
}

impl std::fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("config", &self.config)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
