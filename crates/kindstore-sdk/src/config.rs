use std::path::Path;

use kindstore_store::StoreConfig;
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

/// Client configuration, loadable from TOML.
///
/// ```toml
/// project_id = "my-project"
/// namespace = "namespace1"
///
/// [store]
/// on_missing = "omit"
/// call_timeout_ms = 5000
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub project_id: String,
    /// Namespace used by the client's key and query helpers.
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub store: StoreConfig,
}

impl ClientConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            namespace: None,
            store: StoreConfig::default(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    pub fn from_toml_str(raw: &str) -> SdkResult<Self> {
        toml::from_str(raw).map_err(|e| SdkError::Config(e.to_string()))
    }

    /// Read and parse a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub(crate) fn validate(&self) -> SdkResult<()> {
        if self.project_id.trim().is_empty() {
            return Err(SdkError::InvalidArgument("project_id must not be empty".into()));
        }
        if matches!(self.namespace.as_deref(), Some("")) {
            return Err(SdkError::InvalidArgument(
                "namespace must be omitted rather than empty".into(),
            ));
        }
        self.store
            .validate()
            .map_err(|e| SdkError::Config(e.to_string()))
    }
}
