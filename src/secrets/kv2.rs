use std::collections::{BTreeMap, HashMap};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::Client;
use crate::config::ConfigError;
use crate::errors::VaultError;
use crate::secrets::{join, normalize_mount};

/// Metadata Vault returns for a single version of a secret.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionMetadata {
    #[serde(default)]
    pub created_time: String,
    #[serde(default)]
    pub custom_metadata: Option<HashMap<String, String>>,
    /// Empty unless the version was soft-deleted.
    #[serde(default)]
    pub deletion_time: String,
    #[serde(default)]
    pub destroyed: bool,
    #[serde(default)]
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SecretVersion<T> {
    pub data: T,
    pub metadata: VersionMetadata,
}

/// Secret-wide metadata as returned by `metadata/:path`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SecretMetadata {
    #[serde(default)]
    pub created_time: String,
    #[serde(default)]
    pub updated_time: String,
    #[serde(default)]
    pub current_version: u64,
    #[serde(default)]
    pub oldest_version: u64,
    #[serde(default)]
    pub max_versions: u64,
    #[serde(default)]
    pub cas_required: bool,
    #[serde(default)]
    pub delete_version_after: String,
    #[serde(default)]
    pub custom_metadata: Option<HashMap<String, String>>,
    #[serde(default)]
    pub versions: BTreeMap<String, VersionMetadata>,
}

impl SecretMetadata {
    /// Every version number Vault still knows about, ascending.
    pub fn version_numbers(&self) -> Vec<u64> {
        let mut versions: Vec<u64> = self.versions.keys().filter_map(|v| v.parse().ok()).collect();
        versions.sort_unstable();
        versions
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WriteOptions {
    /// Check-and-set: `0` only allows the write if the key doesn't exist,
    /// any other value must match the current version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cas: Option<u64>,
}

/// Engine-wide settings, also accepted per secret by
/// [`KeyValueV2::write_metadata`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub cas_required: bool,
    #[serde(default = "default_delete_version_after")]
    pub delete_version_after: String,
    #[serde(default)]
    pub max_versions: u64,
}

fn default_delete_version_after() -> String {
    "0s".to_string()
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            cas_required: false,
            delete_version_after: default_delete_version_after(),
            max_versions: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Keys {
    #[serde(default)]
    keys: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Subkeys {
    #[serde(default)]
    subkeys: Value,
}

/// Versioned key/value engine.
#[derive(Debug, Clone)]
pub struct KeyValueV2 {
    client: Client,
    mount: String,
}

impl KeyValueV2 {
    pub fn new(client: Client, mount: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            client,
            mount: normalize_mount(mount)?,
        })
    }

    pub fn mount(&self) -> &str {
        &self.mount
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn path(&self, section: &str, path: &str) -> String {
        join(&self.mount, &format!("{}/{}", section, path.trim_start_matches('/')))
    }

    pub async fn configure(&self, config: &Configuration) -> Result<(), VaultError> {
        self.client
            .write(&join(&self.mount, "config"), serde_json::to_value(config)?)
            .await?;
        Ok(())
    }

    pub async fn read_configuration(&self) -> Result<Configuration, VaultError> {
        self.client.read(&join(&self.mount, "config")).await?.data_as()
    }

    /// Reads `version` of the secret, or the latest one.
    pub async fn read<T: DeserializeOwned>(&self, path: &str, version: Option<u64>) -> Result<SecretVersion<T>, VaultError> {
        let mut target = self.path("data", path);
        if let Some(version) = version {
            target = format!("{}?version={}", target, version);
        }
        self.client.read(&target).await?.data_as()
    }

    pub async fn create_or_update<T: Serialize>(
        &self,
        path: &str,
        data: &T,
        options: Option<WriteOptions>,
    ) -> Result<VersionMetadata, VaultError> {
        let body = payload(data, options)?;
        self.client.write(&self.path("data", path), body).await?.data_as()
    }

    /// Merges `data` into the latest version, creating a new version.
    pub async fn patch<T: Serialize>(
        &self,
        path: &str,
        data: &T,
        options: Option<WriteOptions>,
    ) -> Result<VersionMetadata, VaultError> {
        let body = payload(data, options)?;
        self.client.patch(&self.path("data", path), body).await?.data_as()
    }

    /// The key structure of a secret with values replaced by `null`. A `depth`
    /// of 0 means no limit.
    pub async fn read_subkeys(&self, path: &str, version: Option<u64>, depth: u32) -> Result<Value, VaultError> {
        let target = format!("{}?version={}&depth={}", self.path("subkeys", path), version.unwrap_or(0), depth);
        let subkeys: Subkeys = self.client.read(&target).await?.data_as()?;
        Ok(subkeys.subkeys)
    }

    pub async fn delete_latest(&self, path: &str) -> Result<(), VaultError> {
        self.client.delete(&self.path("data", path)).await?;
        Ok(())
    }

    pub async fn delete_versions(&self, path: &str, versions: &[u64]) -> Result<(), VaultError> {
        self.client
            .write(&self.path("delete", path), json!({ "versions": versions }))
            .await?;
        Ok(())
    }

    pub async fn undelete_versions(&self, path: &str, versions: &[u64]) -> Result<(), VaultError> {
        self.client
            .write(&self.path("undelete", path), json!({ "versions": versions }))
            .await?;
        Ok(())
    }

    /// Permanently removes the data of `versions`; metadata is kept.
    pub async fn destroy_versions(&self, path: &str, versions: &[u64]) -> Result<(), VaultError> {
        self.client
            .put(&self.path("destroy", path), json!({ "versions": versions }))
            .await?;
        Ok(())
    }

    pub async fn list(&self, path: &str) -> Result<Vec<String>, VaultError> {
        match self.client.list(&self.path("metadata", path)).await {
            Ok(response) => Ok(response.data_as::<Option<Keys>>()?.unwrap_or_default().keys),
            Err(err) if err.status() == Some(404) => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }

    pub async fn read_metadata(&self, path: &str) -> Result<SecretMetadata, VaultError> {
        self.client.read(&self.path("metadata", path)).await?.data_as()
    }

    pub async fn write_metadata(
        &self,
        path: &str,
        config: &Configuration,
        custom_metadata: Option<HashMap<String, String>>,
    ) -> Result<(), VaultError> {
        let mut body = serde_json::to_value(config)?;
        if let (Some(custom), Some(object)) = (custom_metadata, body.as_object_mut()) {
            object.insert("custom_metadata".to_string(), serde_json::to_value(custom)?);
        }
        self.client.write(&self.path("metadata", path), body).await?;
        Ok(())
    }

    /// Removes the secret with every version and its metadata.
    pub async fn delete_metadata(&self, path: &str) -> Result<(), VaultError> {
        self.client.delete(&self.path("metadata", path)).await?;
        Ok(())
    }
}

fn payload<T: Serialize>(data: &T, options: Option<WriteOptions>) -> Result<Value, VaultError> {
    let mut body = json!({ "data": serde_json::to_value(data)? });
    if let Some(options) = options {
        body["options"] = serde_json::to_value(options)?;
    }
    Ok(body)
}
