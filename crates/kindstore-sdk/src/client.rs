use std::sync::Arc;

use kindstore_query::{FormattedKeyQuery, FormattedQuery, QueryBuilder, QueryEngine};
use kindstore_store::{
    Backend, DeleteTarget, EntityStore, InMemoryBackend, InsertOutcome, MutationReport, ReadMap,
};
use kindstore_types::{Entity, EntityData, Key};
use tracing::info;

use crate::batch::{BatchCoordinator, BatchDelete, BatchGet, BatchMeta};
use crate::config::ClientConfig;
use crate::error::{SdkError, SdkResult};

/// Connection handle for a kindstore project.
///
/// A handle built with [`Datastore::new`] is not connected: every operation
/// on it fails with [`SdkError::NotInitialized`]. Build one with
/// [`Datastore::connect`] (or [`Datastore::connect_with`] to supply a
/// backend) and pass it to whatever needs storage. Clones share the backend.
#[derive(Clone, Debug, Default)]
pub struct Datastore {
    inner: Option<Connected>,
}

#[derive(Clone, Debug)]
struct Connected {
    config: Arc<ClientConfig>,
    store: EntityStore,
    queries: QueryEngine,
    batch: BatchCoordinator,
}

impl Datastore {
    /// An unconnected handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect to an in-memory backend.
    pub fn connect(config: ClientConfig) -> SdkResult<Self> {
        Self::connect_with(config, Arc::new(InMemoryBackend::new()))
    }

    pub fn connect_with(config: ClientConfig, backend: Arc<dyn Backend>) -> SdkResult<Self> {
        config.validate()?;
        let store = EntityStore::new(backend, config.store.clone());
        info!(
            project_id = %config.project_id,
            namespace = ?config.namespace,
            on_missing = ?config.store.on_missing,
            "datastore connected"
        );
        Ok(Self {
            inner: Some(Connected {
                config: Arc::new(config),
                queries: QueryEngine::new(store.clone()),
                batch: BatchCoordinator::new(store.clone()),
                store,
            }),
        })
    }

    pub fn is_connected(&self) -> bool {
        self.inner.is_some()
    }

    fn connected(&self) -> SdkResult<&Connected> {
        self.inner.as_ref().ok_or(SdkError::NotInitialized)
    }

    pub fn project_id(&self) -> SdkResult<&str> {
        Ok(&self.connected()?.config.project_id)
    }

    /// Namespace applied by [`key`](Self::key), [`entity`](Self::entity),
    /// [`query`](Self::query) and the batch helpers.
    pub fn namespace(&self) -> SdkResult<Option<&str>> {
        Ok(self.connected()?.config.namespace.as_deref())
    }

    pub fn config(&self) -> SdkResult<&ClientConfig> {
        Ok(&self.connected()?.config)
    }

    pub fn store(&self) -> SdkResult<&EntityStore> {
        Ok(&self.connected()?.store)
    }

    pub fn queries(&self) -> SdkResult<&QueryEngine> {
        Ok(&self.connected()?.queries)
    }

    pub fn batch(&self) -> SdkResult<&BatchCoordinator> {
        Ok(&self.connected()?.batch)
    }

    // ---- Builders in the default namespace ----

    pub fn key(&self, kind: impl Into<String>, name: impl Into<String>) -> SdkResult<Key> {
        Ok(Key::new(kind, name, self.namespace()?)?)
    }

    pub fn entity(
        &self,
        kind: impl Into<String>,
        name: impl Into<String>,
        data: EntityData,
    ) -> SdkResult<Entity> {
        Ok(Entity::named(kind, name, data, self.namespace()?)?)
    }

    pub fn query(&self, kind: impl Into<String>) -> SdkResult<QueryBuilder> {
        Ok(QueryBuilder::new(kind, self.namespace()?)?)
    }

    // ---- Store operations ----

    pub async fn read(&self, keys: &[Key]) -> SdkResult<ReadMap> {
        Ok(self.store()?.read(keys).await?)
    }

    pub async fn write(&self, entities: &[Entity]) -> SdkResult<MutationReport> {
        Ok(self.store()?.put(entities).await?)
    }

    pub async fn insert(&self, entities: &[Entity]) -> SdkResult<InsertOutcome> {
        Ok(self.store()?.insert_if_absent(entities).await?)
    }

    pub async fn delete(&self, target: impl Into<DeleteTarget>) -> SdkResult<MutationReport> {
        Ok(self.store()?.delete(target).await?)
    }

    // ---- Queries ----

    pub async fn run_query(&self, query: &QueryBuilder) -> SdkResult<FormattedQuery> {
        Ok(self.queries()?.run_formatted(query).await?)
    }

    pub async fn run_query_keys_only(&self, query: &QueryBuilder) -> SdkResult<FormattedKeyQuery> {
        Ok(self.queries()?.run_keys_only_formatted(query).await?)
    }

    // ---- Batches in the default namespace ----

    pub async fn batch_get<I, K, N>(&self, pairs: I) -> SdkResult<BatchGet>
    where
        I: IntoIterator<Item = (K, N)>,
        K: Into<String>,
        N: Into<String>,
    {
        let connected = self.connected()?;
        connected
            .batch
            .batch_get(connected.config.namespace.as_deref(), pairs)
            .await
    }

    pub async fn batch_set<I, K, N>(&self, triples: I, meta: &BatchMeta) -> SdkResult<MutationReport>
    where
        I: IntoIterator<Item = (K, N, EntityData)>,
        K: Into<String>,
        N: Into<String>,
    {
        let connected = self.connected()?;
        connected
            .batch
            .batch_set(connected.config.namespace.as_deref(), triples, meta)
            .await
    }

    pub async fn batch_delete<I, K, N>(&self, pairs: I) -> SdkResult<BatchDelete>
    where
        I: IntoIterator<Item = (K, N)>,
        K: Into<String>,
        N: Into<String>,
    {
        let connected = self.connected()?;
        connected
            .batch
            .batch_delete(connected.config.namespace.as_deref(), pairs)
            .await
    }
}
