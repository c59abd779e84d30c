use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{KeyError, KeyResult};

/// Composite identifier addressing exactly one entity.
///
/// A `Key` is the `(namespace, kind, name)` triple. Kind and name are always
/// non-empty; the only way to obtain a `Key` is through [`Key::new`] (or
/// decoding, which applies the same checks). Keys order by namespace, then
/// kind, then name, so every entity of one kind in one namespace is a
/// contiguous range.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawKey")]
pub struct Key {
    namespace: Option<String>,
    kind: String,
    name: String,
}

impl Key {
    /// Build a key, rejecting an empty kind or name.
    pub fn new(
        kind: impl Into<String>,
        name: impl Into<String>,
        namespace: Option<&str>,
    ) -> KeyResult<Self> {
        let kind = kind.into();
        let name = name.into();
        if kind.is_empty() || name.is_empty() {
            return Err(KeyError::InvalidArgument(format!(
                "key requires a non-empty kind and name (kind: {kind:?}, name: {name:?})"
            )));
        }
        Ok(Self {
            namespace: namespace.map(str::to_owned),
            kind,
            name,
        })
    }

    /// Build a key in the default (absent) namespace.
    pub fn in_default(kind: impl Into<String>, name: impl Into<String>) -> KeyResult<Self> {
        Self::new(kind, name, None)
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if this key belongs to `kind` within `namespace`.
    pub fn is_in(&self, kind: &str, namespace: Option<&str>) -> bool {
        self.kind == kind && self.namespace.as_deref() == namespace
    }
}

/// Unvalidated wire shape; deserialization goes through [`Key::new`].
#[derive(Deserialize)]
struct RawKey {
    namespace: Option<String>,
    kind: String,
    name: String,
}

impl TryFrom<RawKey> for Key {
    type Error = KeyError;

    fn try_from(raw: RawKey) -> KeyResult<Self> {
        Key::new(raw.kind, raw.name, raw.namespace.as_deref())
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({self})")
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{ns}:{}/{}", self.kind, self.name),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}
