use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codec::KeyCodec;
use crate::error::{KeyError, KeyResult};
use crate::key::Key;

/// Opaque continuation token for a paged query.
///
/// The token is the hex encoding of the last returned row's native key.
/// Callers should treat it as an opaque string and hand it back unchanged.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Build a cursor positioned just after `key`.
    pub fn after(key: &Key) -> KeyResult<Self> {
        let bytes = KeyCodec::to_bytes(&KeyCodec::encode(key))?;
        Ok(Self(hex::encode(bytes)))
    }

    /// Wrap a token received from a caller. The token is checked lazily by
    /// [`Cursor::position`].
    pub fn from_token(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Decode the key this cursor resumes after.
    pub fn position(&self) -> KeyResult<Key> {
        let bytes = hex::decode(&self.0).map_err(|e| KeyError::InvalidCursor(e.to_string()))?;
        let native =
            KeyCodec::from_bytes(&bytes).map_err(|e| KeyError::InvalidCursor(e.to_string()))?;
        KeyCodec::decode(&native).map_err(|e| KeyError::InvalidCursor(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short: String = self.0.chars().take(12).collect();
        write!(f, "Cursor({short}..)")
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
