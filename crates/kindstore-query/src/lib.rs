//! Kind queries for kindstore.
//!
//! A [`QueryBuilder`] names a kind (and optionally a namespace, page limit,
//! and start cursor). A [`QueryEngine`] runs it against an
//! [`EntityStore`](kindstore_store::EntityStore), returning either full
//! entities or keys only. Both paths apply the same filter; the key-only
//! path never carries data.

pub mod builder;
pub mod engine;
pub mod error;

pub use builder::QueryBuilder;
pub use engine::{FormattedKeyQuery, FormattedQuery, QueryEnd, QueryEngine};
pub use error::QueryError;
