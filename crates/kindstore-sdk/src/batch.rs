use std::collections::{BTreeMap, BTreeSet};

use kindstore_store::{EntityStore, MutationReport, ResultFormatter, SaveMethod};
use kindstore_types::{Entity, EntityData, Key};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SdkResult;

/// Metadata shared by every entity of a [`BatchCoordinator::batch_set`] call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchMeta {
    pub exclude_from_indexes: Vec<String>,
    pub method: SaveMethod,
}

/// Outcome of [`BatchCoordinator::batch_get`].
///
/// Results are keyed by name only. When a batch spans several kinds and a
/// name is present under one kind but absent under another, that name is
/// listed in both `found` and `missing`, and `items` keeps one payload per
/// name (the last found in request order).
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BatchGet {
    pub items: BTreeMap<String, EntityData>,
    /// Names present in the store, sorted.
    pub found: Vec<String>,
    /// Names absent from the store, sorted.
    pub missing: Vec<String>,
}

/// Outcome of [`BatchCoordinator::batch_delete`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchDelete {
    /// Index updates reported by the backend.
    pub count: u64,
}

/// Builds keys for `(kind, name)` batches within one namespace and issues
/// a single store call per batch.
#[derive(Clone, Debug)]
pub struct BatchCoordinator {
    store: EntityStore,
}

impl BatchCoordinator {
    pub fn new(store: EntityStore) -> Self {
        Self { store }
    }

    fn keys<I, K, N>(namespace: Option<&str>, pairs: I) -> SdkResult<Vec<Key>>
    where
        I: IntoIterator<Item = (K, N)>,
        K: Into<String>,
        N: Into<String>,
    {
        pairs
            .into_iter()
            .map(|(kind, name)| Key::new(kind, name, namespace).map_err(Into::into))
            .collect()
    }

    /// Fetch every `(kind, name)` pair and split the names into found and
    /// missing.
    pub async fn batch_get<I, K, N>(&self, namespace: Option<&str>, pairs: I) -> SdkResult<BatchGet>
    where
        I: IntoIterator<Item = (K, N)>,
        K: Into<String>,
        N: Into<String>,
    {
        let keys = Self::keys(namespace, pairs)?;
        let lookup = self.store.lookup(&keys).await?;

        let found: BTreeSet<String> = lookup.found.keys().map(|k| k.name().to_owned()).collect();
        let missing: BTreeSet<String> = lookup.missing.iter().map(|k| k.name().to_owned()).collect();
        let in_request_order = keys.iter().filter_map(|key| lookup.found.get(key));
        let items = ResultFormatter::entities(in_request_order).items;

        debug!(
            namespace = ?namespace,
            found = found.len(),
            missing = missing.len(),
            "batch get"
        );
        Ok(BatchGet {
            items,
            found: found.into_iter().collect(),
            missing: missing.into_iter().collect(),
        })
    }

    /// Build entities from `(kind, name, data)` triples sharing `meta` and
    /// write them in one call.
    pub async fn batch_set<I, K, N>(
        &self,
        namespace: Option<&str>,
        triples: I,
        meta: &BatchMeta,
    ) -> SdkResult<MutationReport>
    where
        I: IntoIterator<Item = (K, N, EntityData)>,
        K: Into<String>,
        N: Into<String>,
    {
        let entities = triples
            .into_iter()
            .map(|(kind, name, data)| {
                Entity::named(kind, name, data, namespace)
                    .map(|e| e.with_excluded(meta.exclude_from_indexes.iter().cloned()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let report = self.store.save(&entities, meta.method).await?;
        debug!(namespace = ?namespace, count = entities.len(), method = ?meta.method, "batch set");
        Ok(report)
    }

    /// Delete every `(kind, name)` pair in one call.
    ///
    /// The count is passed through from the backend; absent keys typically
    /// contribute nothing to it.
    pub async fn batch_delete<I, K, N>(
        &self,
        namespace: Option<&str>,
        pairs: I,
    ) -> SdkResult<BatchDelete>
    where
        I: IntoIterator<Item = (K, N)>,
        K: Into<String>,
        N: Into<String>,
    {
        let keys = Self::keys(namespace, pairs)?;
        let report = self.store.delete_keys(&keys).await?;
        debug!(namespace = ?namespace, requested = keys.len(), count = report.index_updates, "batch delete");
        Ok(BatchDelete {
            count: report.index_updates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use kindstore_store::{InMemoryBackend, StoreConfig, StoreError};
    use serde_json::json;

    use crate::error::SdkError;

    const NS: Option<&str> = Some("namespace1");

    fn data(value: serde_json::Value) -> EntityData {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("test data must be an object"),
        }
    }

    fn coordinator() -> BatchCoordinator {
        BatchCoordinator::new(EntityStore::new(
            Arc::new(InMemoryBackend::new()),
            StoreConfig::default(),
        ))
    }

    fn meta() -> BatchMeta {
        BatchMeta {
            exclude_from_indexes: vec!["hash".into(), "title".into()],
            method: SaveMethod::Insert,
        }
    }

    async fn seed(batch: &BatchCoordinator) {
        batch
            .batch_set(
                NS,
                vec![
                    ("test_kind", "bg1", data(json!({"hash": "1", "title": "one"}))),
                    ("test_kind", "bg2", data(json!({"hash": "2", "title": "two"}))),
                    ("test_kind", "bg3", data(json!({"hash": "3", "title": "thr"}))),
                ],
                &meta(),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn batch_get_partitions_found_and_missing() {
        let batch = coordinator();
        seed(&batch).await;

        let result = batch
            .batch_get(
                NS,
                [
                    ("test_kind", "bg4"),
                    ("test_kind", "bg2"),
                    ("test_kind", "bg1"),
                    ("test_kind", "bg3"),
                ],
            )
            .await
            .unwrap();

        assert_eq!(result.found, vec!["bg1", "bg2", "bg3"]);
        assert_eq!(result.missing, vec!["bg4"]);
        assert_eq!(result.items.len(), 3);
        assert_eq!(result.items["bg1"], data(json!({"hash": "1", "title": "one"})));
        assert_eq!(result.items["bg3"]["title"], "thr");
    }

    #[tokio::test]
    async fn batch_get_of_absent_keys() {
        let batch = coordinator();
        seed(&batch).await;

        let result = batch
            .batch_get(NS, [("test_kind", "bg5"), ("test_kind", "bg6")])
            .await
            .unwrap();
        assert!(result.items.is_empty());
        assert!(result.found.is_empty());
        assert_eq!(result.missing, vec!["bg5", "bg6"]);
    }

    #[tokio::test]
    async fn batch_get_respects_namespace() {
        let batch = coordinator();
        seed(&batch).await;
        let result = batch.batch_get(None, [("test_kind", "bg1")]).await.unwrap();
        assert_eq!(result.missing, vec!["bg1"]);
    }

    #[tokio::test]
    async fn batch_get_across_kinds_keys_by_name() {
        let batch = coordinator();
        batch
            .batch_set(NS, vec![("k1", "x", data(json!({"kind": "k1"})))], &BatchMeta::default())
            .await
            .unwrap();

        let result = batch.batch_get(NS, [("k1", "x"), ("k2", "x")]).await.unwrap();
        assert_eq!(result.found, vec!["x"]);
        assert_eq!(result.missing, vec!["x"]);
        assert_eq!(result.items["x"]["kind"], "k1");
    }

    #[tokio::test]
    async fn batch_set_applies_shared_meta() {
        let batch = coordinator();
        seed(&batch).await;

        let key = Key::new("test_kind", "bg1", NS).unwrap();
        let lookup = batch.store.lookup(&[key.clone()]).await.unwrap();
        let stored = &lookup.found[&key];
        assert!(stored.exclude_from_indexes.contains("hash"));
        assert!(stored.exclude_from_indexes.contains("title"));
        assert_eq!(stored.indexed_fields().count(), 0);
    }

    #[tokio::test]
    async fn batch_set_insert_rejects_existing() {
        let batch = coordinator();
        seed(&batch).await;
        let err = batch
            .batch_set(NS, vec![("test_kind", "bg1", EntityData::new())], &meta())
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::Store(StoreError::Backend(_))));
    }

    #[tokio::test]
    async fn batch_set_rejects_bad_key_before_writing() {
        let batch = coordinator();
        let err = batch
            .batch_set(
                NS,
                vec![("test_kind", "ok", EntityData::new()), ("test_kind", "", EntityData::new())],
                &BatchMeta::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::InvalidArgument(_)));

        let result = batch.batch_get(NS, [("test_kind", "ok")]).await.unwrap();
        assert_eq!(result.missing, vec!["ok"]);
    }

    #[tokio::test]
    async fn batch_delete_counts_present_keys() {
        let batch = coordinator();
        seed(&batch).await;

        let result = batch
            .batch_delete(
                NS,
                [
                    ("test_kind", "bg1"),
                    ("test_kind", "bg2"),
                    ("test_kind", "bg3"),
                    ("test_kind", "bg4"),
                ],
            )
            .await
            .unwrap();
        assert_eq!(result, BatchDelete { count: 3 });

        let after = batch
            .batch_get(NS, [("test_kind", "bg1"), ("test_kind", "bg2")])
            .await
            .unwrap();
        assert!(after.found.is_empty());
    }

    #[test]
    fn meta_deserializes_with_defaults() {
        let meta: BatchMeta = serde_json::from_value(json!({
            "exclude_from_indexes": ["hash"]
        }))
        .unwrap();
        assert_eq!(meta.method, SaveMethod::Upsert);
        assert_eq!(meta.exclude_from_indexes, vec!["hash"]);
    }
}
