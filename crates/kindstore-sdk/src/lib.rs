//! High-level client for kindstore.
//!
//! [`Datastore`] is the entry point for applications: it is built from a
//! [`ClientConfig`], owns the [`EntityStore`], and exposes kind queries and
//! `(kind, name)` batch helpers scoped to the configured namespace.

pub mod batch;
pub mod client;
pub mod config;
pub mod error;

pub use batch::{BatchCoordinator, BatchDelete, BatchGet, BatchMeta};
pub use client::Datastore;
pub use config::ClientConfig;
pub use error::{SdkError, SdkResult};

// Re-export key types
pub use kindstore_query::{FormattedKeyQuery, FormattedQuery, QueryBuilder, QueryEnd, QueryEngine};
pub use kindstore_store::{
    Backend, CallContext, DeleteTarget, EntityStore, InMemoryBackend, InsertOutcome,
    MissingKeyPolicy, MutationReport, ReadMap, SaveMethod, StoreConfig,
};
pub use kindstore_types::{Cursor, Entity, EntityData, Key, KeyCodec, NativeKey, PathElement};
