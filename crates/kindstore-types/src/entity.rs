use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::KeyResult;
use crate::key::Key;

/// Opaque entity payload: field name to JSON value.
pub type EntityData = Map<String, Value>;

/// A key plus its data payload and indexing hints.
///
/// The store never interprets `data`. `exclude_from_indexes` names the
/// top-level fields the backend should leave out of its property indexes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub key: Key,
    pub data: EntityData,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub exclude_from_indexes: BTreeSet<String>,
}

impl Entity {
    pub fn new(key: Key, data: EntityData) -> Self {
        Self {
            key,
            data,
            exclude_from_indexes: BTreeSet::new(),
        }
    }

    /// Build the key and wrap `data` in one step.
    pub fn named(
        kind: impl Into<String>,
        name: impl Into<String>,
        data: EntityData,
        namespace: Option<&str>,
    ) -> KeyResult<Self> {
        Ok(Self::new(Key::new(kind, name, namespace)?, data))
    }

    /// Attach fields to exclude from indexing.
    pub fn with_excluded<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_from_indexes
            .extend(fields.into_iter().map(Into::into));
        self
    }

    /// Top-level fields that remain indexed.
    pub fn indexed_fields(&self) -> impl Iterator<Item = &str> {
        self.data
            .keys()
            .map(String::as_str)
            .filter(|field| !self.exclude_from_indexes.contains(*field))
    }

    pub fn name(&self) -> &str {
        self.key.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> EntityData {
        match value {
            Value::Object(map) => map,
            _ => panic!("test data must be an object"),
        }
    }

    #[test]
    fn named_builds_key() {
        let entity = Entity::named(
            "testKind",
            "testEntity1",
            data(json!({"description": "no where now here when ew"})),
            None,
        )
        .unwrap();
        assert_eq!(entity.key, Key::in_default("testKind", "testEntity1").unwrap());
        assert_eq!(entity.name(), "testEntity1");
        assert_eq!(entity.data["description"], "no where now here when ew");
    }

    #[test]
    fn named_rejects_empty_kind() {
        assert!(Entity::named("", "n", EntityData::new(), None).is_err());
    }

    #[test]
    fn excluded_fields_are_not_indexed() {
        let entity = Entity::named(
            "test_kind",
            "bg1",
            data(json!({"hash": "1", "title": "one", "rank": 3})),
            Some("namespace1"),
        )
        .unwrap()
        .with_excluded(["hash", "title"]);

        let indexed: Vec<&str> = entity.indexed_fields().collect();
        assert_eq!(indexed, vec!["rank"]);
    }

    #[test]
    fn serde_omits_empty_exclusions() {
        let entity = Entity::named("k", "n", EntityData::new(), None).unwrap();
        let json = serde_json::to_value(&entity).unwrap();
        assert!(json.get("exclude_from_indexes").is_none());
        let parsed: Entity = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, entity);
    }
}
