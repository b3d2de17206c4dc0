use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::Client;
use crate::config::ConfigError;
use crate::errors::VaultError;
use crate::secrets::{join, normalize_mount};

#[derive(Debug, Clone, Default, Deserialize)]
struct Keys {
    #[serde(default)]
    keys: Vec<String>,
}

/// Unversioned key/value engine. Also fronts `cubbyhole`, which speaks the
/// same API.
#[derive(Debug, Clone)]
pub struct KeyValueV1 {
    client: Client,
    mount: String,
}

impl KeyValueV1 {
    pub fn new(client: Client, mount: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            client,
            mount: normalize_mount(mount)?,
        })
    }

    pub fn cubbyhole(client: Client) -> Self {
        Self {
            client,
            mount: "cubbyhole".to_string(),
        }
    }

    pub fn mount(&self) -> &str {
        &self.mount
    }

    pub async fn read<T: DeserializeOwned>(&self, path: &str) -> Result<T, VaultError> {
        self.client.read(&join(&self.mount, path)).await?.data_as()
    }

    /// Keys under `path`; folders end with `/`. A missing folder lists as
    /// empty.
    pub async fn list(&self, path: &str) -> Result<Vec<String>, VaultError> {
        match self.client.list(&join(&self.mount, path)).await {
            Ok(response) => Ok(response.data_as::<Option<Keys>>()?.unwrap_or_default().keys),
            Err(err) if err.status() == Some(404) => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }

    pub async fn create_or_update<T: Serialize>(&self, path: &str, data: &T) -> Result<(), VaultError> {
        let body: Value = serde_json::to_value(data)?;
        self.client.write(&join(&self.mount, path), body).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str) -> Result<(), VaultError> {
        self.client.delete(&join(&self.mount, path)).await?;
        Ok(())
    }
}
