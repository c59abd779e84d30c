use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use kindstore_types::{Entity, Key};
use tracing::debug;

use crate::backend::{Backend, MoreResults, MutationReport, Row, SaveMethod, ScanPage, ScanRequest};
use crate::error::{BackendError, BackendResult};

/// In-memory, `BTreeMap`-based backend.
///
/// Intended for tests and embedding. Entities are held behind a single
/// `RwLock` and cloned on read and write. Because keys order by namespace,
/// kind, then name, a kind scan is a contiguous range of the map, and scan
/// results come back ordered by name.
///
/// Each committed entity write or removal counts as one index update.
pub struct InMemoryBackend {
    entities: RwLock<BTreeMap<Key, Entity>>,
}

impl InMemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(BTreeMap::new()),
        }
    }

    fn read_map(&self) -> BackendResult<RwLockReadGuard<'_, BTreeMap<Key, Entity>>> {
        self.entities
            .read()
            .map_err(|e| BackendError::Internal(format!("lock poisoned: {e}")))
    }

    fn write_map(&self) -> BackendResult<RwLockWriteGuard<'_, BTreeMap<Key, Entity>>> {
        self.entities
            .write()
            .map_err(|e| BackendError::Internal(format!("lock poisoned: {e}")))
    }

    /// Number of entities currently stored.
    pub fn len(&self) -> BackendResult<usize> {
        Ok(self.read_map()?.len())
    }

    /// Returns `true` if the backend holds no entities.
    pub fn is_empty(&self) -> BackendResult<bool> {
        Ok(self.read_map()?.is_empty())
    }

    /// Remove every entity.
    pub fn clear(&self) -> BackendResult<()> {
        self.write_map()?.clear();
        Ok(())
    }

    /// All stored keys in store order.
    pub fn all_keys(&self) -> BackendResult<Vec<Key>> {
        Ok(self.read_map()?.keys().cloned().collect())
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn get(&self, keys: &[Key]) -> BackendResult<Vec<Option<Entity>>> {
        let map = self.read_map()?;
        Ok(keys.iter().map(|key| map.get(key).cloned()).collect())
    }

    async fn save(&self, entities: &[Entity], method: SaveMethod) -> BackendResult<MutationReport> {
        let mut map = self.write_map()?;

        // Check every precondition before the first write so a rejected
        // call leaves the map untouched.
        for entity in entities {
            match method {
                SaveMethod::Insert if map.contains_key(&entity.key) => {
                    return Err(BackendError::AlreadyExists(entity.key.clone()));
                }
                SaveMethod::Update if !map.contains_key(&entity.key) => {
                    return Err(BackendError::NotFound(entity.key.clone()));
                }
                _ => {}
            }
        }

        let mut report = MutationReport::default();
        for entity in entities {
            map.insert(entity.key.clone(), entity.clone());
            report.mutation_results.push(entity.key.clone());
            report.index_updates += 1;
        }
        debug!(count = entities.len(), ?method, "saved entities");
        Ok(report)
    }

    async fn delete(&self, keys: &[Key]) -> BackendResult<MutationReport> {
        let mut map = self.write_map()?;
        let mut report = MutationReport::default();
        for key in keys {
            if map.remove(key).is_some() {
                report.mutation_results.push(key.clone());
                report.index_updates += 1;
            }
        }
        debug!(requested = keys.len(), removed = report.index_updates, "deleted entities");
        Ok(report)
    }

    async fn run_query(&self, request: &ScanRequest) -> BackendResult<ScanPage> {
        let map = self.read_map()?;
        let matching: Box<dyn Iterator<Item = (&Key, &Entity)>> = match &request.start_after {
            Some(after) => Box::new(
                map.range((Bound::Excluded(after), Bound::Unbounded))
                    .take_while(|(key, _)| request.matches(key)),
            ),
            None => Box::new(
                map.iter()
                    .skip_while(|(key, _)| !request.matches(key))
                    .take_while(|(key, _)| request.matches(key)),
            ),
        };

        let limit = request.limit.unwrap_or(usize::MAX);
        let mut rows = Vec::new();
        let mut more = MoreResults::NoMoreResults;
        for (key, entity) in matching {
            if rows.len() == limit {
                more = MoreResults::MoreResultsAfterLimit;
                break;
            }
            rows.push(if request.keys_only {
                Row::KeyOnly(key.clone())
            } else {
                Row::Entity(entity.clone())
            });
        }
        Ok(ScanPage { rows, more })
    }
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("entity_count", &self.len().ok())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(kind: &str, name: &str, namespace: Option<&str>) -> Entity {
        let data = match json!({ "name": name }) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        Entity::named(kind, name, data, namespace).unwrap()
    }

    fn scan(kind: &str, namespace: Option<&str>) -> ScanRequest {
        ScanRequest {
            kind: kind.into(),
            namespace: namespace.map(str::to_owned),
            keys_only: false,
            limit: None,
            start_after: None,
        }
    }

    // -----------------------------------------------------------------------
    // Core CRUD
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn save_and_get() {
        let backend = InMemoryBackend::new();
        let e = entity("testKind", "testEntity1", None);
        let report = backend.save(&[e.clone()], SaveMethod::Upsert).await.unwrap();
        assert_eq!(report.mutation_results, vec![e.key.clone()]);
        assert_eq!(report.index_updates, 1);

        let got = backend.get(&[e.key.clone()]).await.unwrap();
        assert_eq!(got, vec![Some(e)]);
    }

    #[tokio::test]
    async fn get_is_aligned_with_request() {
        let backend = InMemoryBackend::new();
        let present = entity("k", "present", None);
        backend.save(&[present.clone()], SaveMethod::Upsert).await.unwrap();
        let absent = Key::in_default("k", "absent").unwrap();

        let got = backend.get(&[absent, present.key.clone()]).await.unwrap();
        assert!(got[0].is_none());
        assert_eq!(got[1].as_ref(), Some(&present));
    }

    #[tokio::test]
    async fn upsert_overwrites() {
        let backend = InMemoryBackend::new();
        let mut e = entity("k", "n", None);
        backend.save(&[e.clone()], SaveMethod::Upsert).await.unwrap();
        e.data.insert("extra".into(), json!(true));
        backend.save(&[e.clone()], SaveMethod::Upsert).await.unwrap();

        assert_eq!(backend.len().unwrap(), 1);
        let got = backend.get(&[e.key.clone()]).await.unwrap();
        assert_eq!(got[0].as_ref().unwrap().data["extra"], json!(true));
    }

    #[tokio::test]
    async fn insert_rejects_existing_without_partial_write() {
        let backend = InMemoryBackend::new();
        let existing = entity("k", "a", None);
        backend.insert(&existing).await.unwrap();

        let fresh = entity("k", "b", None);
        let err = backend
            .save(&[fresh.clone(), existing.clone()], SaveMethod::Insert)
            .await
            .unwrap_err();
        assert_eq!(err, BackendError::AlreadyExists(existing.key));
        assert!(backend.get(&[fresh.key]).await.unwrap()[0].is_none());
    }

    #[tokio::test]
    async fn update_requires_existing() {
        let backend = InMemoryBackend::new();
        let e = entity("k", "n", None);
        let err = backend.save(&[e.clone()], SaveMethod::Update).await.unwrap_err();
        assert_eq!(err, BackendError::NotFound(e.key.clone()));

        backend.insert(&e).await.unwrap();
        assert!(backend.save(&[e], SaveMethod::Update).await.is_ok());
    }

    #[tokio::test]
    async fn delete_counts_only_removed() {
        let backend = InMemoryBackend::new();
        let a = entity("k", "a", None);
        let b = entity("k", "b", None);
        backend.save(&[a.clone(), b.clone()], SaveMethod::Upsert).await.unwrap();

        let missing = Key::in_default("k", "never").unwrap();
        let report = backend
            .delete(&[a.key.clone(), b.key.clone(), missing])
            .await
            .unwrap();
        assert_eq!(report.index_updates, 2);
        assert!(backend.is_empty().unwrap());
    }

    // -----------------------------------------------------------------------
    // Scans
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn scan_filters_kind_and_namespace() {
        let backend = InMemoryBackend::new();
        backend
            .save(
                &[
                    entity("testKind", "a", None),
                    entity("testKind", "b", None),
                    entity("testKind2", "a", None),
                    entity("testKind", "c", Some("ns")),
                ],
                SaveMethod::Upsert,
            )
            .await
            .unwrap();

        let page = backend.run_query(&scan("testKind", None)).await.unwrap();
        let names: Vec<&str> = page.rows.iter().map(|r| r.key().name()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(page.more, MoreResults::NoMoreResults);

        let page = backend.run_query(&scan("testKind", Some("ns"))).await.unwrap();
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.rows[0].key().name(), "c");
    }

    #[tokio::test]
    async fn scan_limit_and_resume() {
        let backend = InMemoryBackend::new();
        let all: Vec<Entity> = ["a", "b", "c"].iter().map(|n| entity("k", n, None)).collect();
        backend.save(&all, SaveMethod::Upsert).await.unwrap();

        let mut request = scan("k", None);
        request.limit = Some(2);
        let first = backend.run_query(&request).await.unwrap();
        assert_eq!(first.rows.len(), 2);
        assert_eq!(first.more, MoreResults::MoreResultsAfterLimit);

        request.start_after = Some(first.rows[1].key().clone());
        let second = backend.run_query(&request).await.unwrap();
        assert_eq!(second.rows.len(), 1);
        assert_eq!(second.rows[0].key().name(), "c");
        assert_eq!(second.more, MoreResults::NoMoreResults);
    }

    #[tokio::test]
    async fn keys_only_scan_carries_no_data() {
        let backend = InMemoryBackend::new();
        backend.save(&[entity("k", "a", None)], SaveMethod::Upsert).await.unwrap();

        let mut request = scan("k", None);
        request.keys_only = true;
        let page = backend.run_query(&request).await.unwrap();
        assert!(matches!(page.rows[0], Row::KeyOnly(_)));
    }

    #[tokio::test]
    async fn scan_of_unknown_kind_is_empty() {
        let backend = InMemoryBackend::new();
        backend.save(&[entity("k", "a", None)], SaveMethod::Upsert).await.unwrap();
        let page = backend.run_query(&scan("nope", None)).await.unwrap();
        assert!(page.rows.is_empty());
    }

    // -----------------------------------------------------------------------
    // Utility methods
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn clear_and_all_keys() {
        let backend = InMemoryBackend::default();
        backend
            .save(&[entity("k", "b", None), entity("k", "a", None)], SaveMethod::Upsert)
            .await
            .unwrap();
        let names: Vec<String> = backend
            .all_keys()
            .unwrap()
            .iter()
            .map(|k| k.name().to_owned())
            .collect();
        assert_eq!(names, vec!["a", "b"]);

        backend.clear().unwrap();
        assert!(backend.is_empty().unwrap());
    }

    #[test]
    fn poisoned_lock_is_reported() {
        let backend = std::sync::Arc::new(InMemoryBackend::new());
        let holder = std::sync::Arc::clone(&backend);
        let _ = std::thread::spawn(move || {
            let _guard = holder.entities.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();

        assert!(matches!(backend.len(), Err(BackendError::Internal(_))));
        assert!(matches!(backend.is_empty(), Err(BackendError::Internal(_))));
        assert!(backend.all_keys().is_err());
        assert!(format!("{backend:?}").contains("entity_count: None"));
    }

    #[test]
    fn debug_format() {
        let debug = format!("{:?}", InMemoryBackend::new());
        assert!(debug.contains("InMemoryBackend"));
        assert!(debug.contains("entity_count"));
    }
}
