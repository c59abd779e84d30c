use serde::{Deserialize, Serialize};

use crate::error::{KeyError, KeyResult};
use crate::key::Key;

/// One `{kind, name}` step of a native key path.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathElement {
    pub kind: String,
    pub name: String,
}

/// Backend-native key representation.
///
/// The backend addresses entities by a namespace plus a path of
/// `{kind, name}` elements. Keys in kindstore have no ancestors, so a valid
/// native key always carries a single-element path. Native keys are not
/// validated on construction; [`KeyCodec::decode`] is the checkpoint.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NativeKey {
    pub namespace: Option<String>,
    pub path: Vec<PathElement>,
}

/// Pure conversion between [`Key`] and [`NativeKey`].
pub struct KeyCodec;

impl KeyCodec {
    /// Encode a key into its native path form.
    pub fn encode(key: &Key) -> NativeKey {
        NativeKey {
            namespace: key.namespace().map(str::to_owned),
            path: vec![PathElement {
                kind: key.kind().to_owned(),
                name: key.name().to_owned(),
            }],
        }
    }

    /// Decode a native key, applying the same checks as [`Key::new`].
    pub fn decode(native: &NativeKey) -> KeyResult<Key> {
        match native.path.as_slice() {
            [element] => Key::new(
                element.kind.clone(),
                element.name.clone(),
                native.namespace.as_deref(),
            ),
            [] => Err(KeyError::InvalidArgument("native key has an empty path".into())),
            path => Err(KeyError::InvalidArgument(format!(
                "native key path has {} elements; ancestor paths are not supported",
                path.len()
            ))),
        }
    }

    /// Serialize a native key to bytes (bincode).
    pub fn to_bytes(native: &NativeKey) -> KeyResult<Vec<u8>> {
        bincode::serialize(native).map_err(|e| KeyError::InvalidArgument(e.to_string()))
    }

    /// Deserialize a native key from bytes produced by [`KeyCodec::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> KeyResult<NativeKey> {
        bincode::deserialize(bytes).map_err(|e| KeyError::InvalidArgument(e.to_string()))
    }
}

impl From<&Key> for NativeKey {
    fn from(key: &Key) -> Self {
        KeyCodec::encode(key)
    }
}

impl TryFrom<&NativeKey> for Key {
    type Error = KeyError;

    fn try_from(native: &NativeKey) -> KeyResult<Self> {
        KeyCodec::decode(native)
    }
}
