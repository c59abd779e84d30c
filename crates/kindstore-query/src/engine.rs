use std::collections::BTreeMap;

use kindstore_store::{EntityStore, MoreResults, QueryResult, ResultFormatter, Row};
use kindstore_types::{Cursor, EntityData, Key};
use serde::Serialize;
use tracing::debug;

use crate::builder::QueryBuilder;
use crate::error::QueryError;

/// Where a query page ended and whether more rows follow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QueryEnd {
    pub cursor: Option<Cursor>,
    pub more: MoreResults,
}

impl QueryEnd {
    fn of(result: &QueryResult) -> Self {
        Self {
            cursor: result.cursor.clone(),
            more: result.more,
        }
    }
}

/// A full-entity page formatted as name to data.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FormattedQuery {
    pub items: BTreeMap<String, EntityData>,
    pub keys: Vec<Key>,
    pub end: QueryEnd,
}

/// A key-only page formatted as name to key.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FormattedKeyQuery {
    pub items: BTreeMap<String, Key>,
    pub keys: Vec<Key>,
    pub end: QueryEnd,
}

/// Runs [`QueryBuilder`]s against an [`EntityStore`].
///
/// Rows come back in the store's order. The in-memory backend orders by
/// key name; other backends give no ordering guarantee.
#[derive(Clone, Debug)]
pub struct QueryEngine {
    store: EntityStore,
}

impl QueryEngine {
    pub fn new(store: EntityStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Run one page returning full entities.
    pub async fn run(&self, query: &QueryBuilder) -> Result<QueryResult, QueryError> {
        let request = query.to_request(false)?;
        Ok(self.store.run_query(&request).await?)
    }

    /// Run one page returning keys only.
    pub async fn run_keys_only(&self, query: &QueryBuilder) -> Result<QueryResult, QueryError> {
        let request = query.to_request(true)?;
        let result = self.store.run_query(&request).await?;
        // Projection is enforced here as well, whatever the backend returned.
        let rows = result
            .rows
            .into_iter()
            .map(|row| match row {
                Row::Entity(entity) => Row::KeyOnly(entity.key),
                key_only => key_only,
            })
            .collect();
        Ok(QueryResult { rows, ..result })
    }

    pub async fn run_formatted(&self, query: &QueryBuilder) -> Result<FormattedQuery, QueryError> {
        let result = self.run(query).await?;
        let entities = result.rows.iter().filter_map(Row::entity);
        let formatted = ResultFormatter::entities(entities);
        Ok(FormattedQuery {
            items: formatted.items,
            keys: formatted.keys,
            end: QueryEnd::of(&result),
        })
    }

    pub async fn run_keys_only_formatted(
        &self,
        query: &QueryBuilder,
    ) -> Result<FormattedKeyQuery, QueryError> {
        let result = self.run_keys_only(query).await?;
        let keys: Vec<Key> = result.keys().cloned().collect();
        Ok(FormattedKeyQuery {
            items: ResultFormatter::keys_only(&keys),
            keys,
            end: QueryEnd::of(&result),
        })
    }

    /// Follow cursors from `query`'s start until the store reports no more
    /// rows, collecting every page.
    pub async fn run_all(&self, query: &QueryBuilder, keys_only: bool) -> Result<Vec<Row>, QueryError> {
        let mut page_query = query.clone();
        let mut rows = Vec::new();
        let mut pages = 0usize;
        loop {
            let page = if keys_only {
                self.run_keys_only(&page_query).await?
            } else {
                self.run(&page_query).await?
            };
            pages += 1;
            let empty = page.rows.is_empty();
            rows.extend(page.rows);
            match (page.more, page.cursor) {
                (MoreResults::MoreResultsAfterLimit, Some(cursor)) if !empty => {
                    page_query = page_query.start(cursor);
                }
                _ => break,
            }
        }
        debug!(kind = query.kind(), pages, rows = rows.len(), "query drained");
        Ok(rows)
    }
}
