//! Foundation types for kindstore.
//!
//! This crate provides the identifier and payload types shared by every other
//! kindstore crate.
//!
//! # Key Types
//!
//! - [`Key`] -- Validated `(namespace, kind, name)` identifier
//! - [`Entity`] -- A key plus an opaque JSON data payload and indexing hints
//! - [`NativeKey`] -- Backend-native path representation of a key
//! - [`KeyCodec`] -- Pure conversion between [`Key`] and [`NativeKey`]
//! - [`Cursor`] -- Opaque continuation token for paged queries

pub mod codec;
pub mod cursor;
pub mod entity;
pub mod error;
pub mod key;

pub use codec::{KeyCodec, NativeKey, PathElement};
pub use cursor::Cursor;
pub use entity::{Entity, EntityData};
pub use error::{KeyError, KeyResult};
pub use key::Key;
