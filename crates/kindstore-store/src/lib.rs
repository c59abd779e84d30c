//! Entity storage for kindstore.
//!
//! This crate maps [`Key`](kindstore_types::Key)s to
//! [`Entity`](kindstore_types::Entity)s through a pluggable [`Backend`].
//! [`EntityStore`] is the handle callers hold; it applies the read policy,
//! checks commit reports, and runs every call under a [`CallContext`].
//!
//! # Storage Backends
//!
//! All backends implement the [`Backend`] trait:
//!
//! - [`InMemoryBackend`] -- `BTreeMap`-based backend for tests and embedding
//!
//! # Design Rules
//!
//! 1. The store never interprets entity data.
//! 2. Saves are upserts unless a [`SaveMethod`] says otherwise; there is no
//!    optimistic concurrency check.
//! 3. Batch calls are not transactional. A failure partway through leaves
//!    earlier mutations committed.
//! 4. Backend failures are propagated verbatim and never retried.

pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod format;
pub mod memory;
pub mod store;

// Re-export primary types at crate root for ergonomic imports.
pub use backend::{
    Backend, MoreResults, MutationReport, QueryResult, Row, SaveMethod, ScanPage, ScanRequest,
};
pub use config::{MissingKeyPolicy, StoreConfig};
pub use context::CallContext;
pub use error::{BackendError, BackendResult, StoreError, StoreResult};
pub use format::{FormattedEntities, ResultFormatter};
pub use memory::InMemoryBackend;
pub use store::{DeleteTarget, EntityStore, InsertOutcome, Lookup, QueryRequest, ReadMap};
