//! Local file access

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use tokio::fs;

use crate::errors::ProvisionError;

/// A local file the provisioner reads its inputs from
#[derive(Debug, Clone)]
pub struct File {
    path: PathBuf,
}

impl File {
    /// Create a new file reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read file contents as bytes
    pub async fn read_bytes(&self) -> Result<Vec<u8>, ProvisionError> {
        fs::read(&self.path).await.map_err(|e| {
            ProvisionError::ConfigError(format!("Unable to read {}: {}", self.path.display(), e))
        })
    }

    /// Read file contents as string
    pub async fn read_string(&self) -> Result<String, ProvisionError> {
        let bytes = self.read_bytes().await?;
        String::from_utf8(bytes).map_err(|_| {
            ProvisionError::ConfigError(format!("{} is not valid UTF-8", self.path.display()))
        })
    }

    /// Read file as JSON
    pub async fn read_json<T: DeserializeOwned>(&self) -> Result<T, ProvisionError> {
        let contents = self.read_string().await?;
        let value = serde_json::from_str(&contents)?;
        Ok(value)
    }
}
