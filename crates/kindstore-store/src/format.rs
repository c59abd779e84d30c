//! Reshape raw key/entity rows into name-keyed maps.
//!
//! Rows are keyed by the `name` component of their key. Names are only
//! unique within one kind and namespace, so formatting rows from several
//! kinds can collide; when two rows share a name the later row wins and the
//! earlier one is dropped without an error.

use std::collections::BTreeMap;

use kindstore_types::{Entity, EntityData, Key};
use serde::Serialize;

/// Name-keyed data payloads with the key metadata split out.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FormattedEntities {
    pub items: BTreeMap<String, EntityData>,
    /// Keys of the formatted rows, in input order.
    pub keys: Vec<Key>,
}

pub struct ResultFormatter;

impl ResultFormatter {
    /// Map each entity's name to its data payload.
    pub fn entities<'a, I>(rows: I) -> FormattedEntities
    where
        I: IntoIterator<Item = &'a Entity>,
    {
        let mut formatted = FormattedEntities::default();
        for entity in rows {
            formatted
                .items
                .insert(entity.key.name().to_owned(), entity.data.clone());
            formatted.keys.push(entity.key.clone());
        }
        formatted
    }

    /// Map each key's name to the key itself.
    pub fn keys_only<'a, I>(keys: I) -> BTreeMap<String, Key>
    where
        I: IntoIterator<Item = &'a Key>,
    {
        keys.into_iter()
            .map(|key| (key.name().to_owned(), key.clone()))
            .collect()
    }
}
