use kindstore_store::QueryRequest;
use kindstore_types::Cursor;

use crate::error::QueryError;

/// A kind query under construction.
///
/// Only the kind is required. The builder is a plain value: running it does
/// not consume it, so the same builder can be re-run or re-started from a
/// cursor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryBuilder {
    kind: String,
    namespace: Option<String>,
    limit: Option<usize>,
    start: Option<Cursor>,
}

impl QueryBuilder {
    /// Start a query over `kind`, optionally scoped to `namespace`.
    pub fn new(kind: impl Into<String>, namespace: Option<&str>) -> Result<Self, QueryError> {
        let kind = kind.into();
        if kind.is_empty() {
            return Err(QueryError::InvalidArgument("a query needs a kind".into()));
        }
        Ok(Self {
            kind,
            namespace: namespace.map(str::to_owned),
            limit: None,
            start: None,
        })
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Cap the page size. A limit of zero is rejected when the query runs.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Resume after the row a previous page ended on.
    pub fn start(mut self, cursor: Cursor) -> Self {
        self.start = Some(cursor);
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn namespace_scope(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn page_limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn start_cursor(&self) -> Option<&Cursor> {
        self.start.as_ref()
    }

    pub(crate) fn to_request(&self, keys_only: bool) -> Result<QueryRequest, QueryError> {
        if self.limit == Some(0) {
            return Err(QueryError::InvalidArgument("query limit must be positive".into()));
        }
        Ok(QueryRequest {
            kind: self.kind.clone(),
            namespace: self.namespace.clone(),
            keys_only,
            limit: self.limit,
            start: self.start.clone(),
        })
    }
}
