use crate::auth::method::AuthMethod;
use crate::cache::FileTokenCache;
use crate::client::Client;
use crate::config::{ConfigError, VaultConfig};
use crate::errors::VaultError;
use crate::http::ReqwestTransport;
use crate::secrets::kv2::{KeyValueV2, VersionMetadata};
use crate::session::SessionManager;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HealthCheckData {
    pub(crate) data: String,
}

/// KV v2 backed secret store for application code: one mount, whole-secret
/// reads and writes, an authenticated session underneath.
#[derive(Debug, Clone)]
pub struct VaultService {
    kv: KeyValueV2,
    healthcheck_file_path: String,
}

impl VaultService {
    pub async fn from_env() -> Result<Self, VaultError> {
        let (config, auth_method) = VaultConfig::load_env()?;
        Self::new(config, auth_method).await
    }

    /// Builds the session from `config` and logs in.
    pub async fn new(config: VaultConfig, auth_method: Arc<dyn AuthMethod>) -> Result<Self, VaultError> {
        let transport = ReqwestTransport::new(&config.address, config.client_timeout)?;

        let mut session = SessionManager::new(Arc::new(transport)).with_auth_method(auth_method);
        if let Some(path) = &config.token_cache_file {
            log::debug!("Caching Vault token in {}", path);
            session = session.with_cache(Arc::new(FileTokenCache::new(path)));
        }

        let service = Self::with_session(Arc::new(session), &config.mount_path, config.healthcheck_file_path)?;
        if !service.session().authenticate().await? {
            return Err(VaultError::Authentication("the auth method declined to log in".to_string()));
        }

        log::info!("Connected to Vault at {} (mount {})", config.address, service.kv.mount());
        Ok(service)
    }

    /// Wraps an existing session without logging in; the first request that
    /// needs a token has to find one in the session.
    pub fn with_session(
        session: Arc<SessionManager>,
        mount_path: &str,
        healthcheck_file_path: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            kv: KeyValueV2::new(Client::from_session(session), mount_path)?,
            healthcheck_file_path: healthcheck_file_path.into(),
        })
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        self.kv.client().session()
    }

    pub fn kv(&self) -> &KeyValueV2 {
        &self.kv
    }

    pub async fn insert<T: Serialize>(&self, key: &str, data: T) -> Result<VersionMetadata, VaultError> {
        self.kv.create_or_update(key, &data, None).await
    }

    pub async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<T, VaultError> {
        Ok(self.kv.read::<T>(key, None).await?.data)
    }

    async fn versions(&self, key: &str) -> Result<Vec<u64>, VaultError> {
        Ok(self.kv.read_metadata(key).await?.version_numbers())
    }

    /// Soft-deletes every version of `key`.
    pub async fn delete(&self, key: &str) -> Result<(), VaultError> {
        let versions = self.versions(key).await?;
        log::debug!("Deleting versions {:?} of {}", versions, key);
        self.kv.delete_versions(key, &versions).await
    }

    /// Destroys the data of every version of `key`.
    pub async fn delete_permanent(&self, key: &str) -> Result<(), VaultError> {
        let versions = self.versions(key).await?;
        log::debug!("Destroying versions {:?} of {}", versions, key);
        self.kv.destroy_versions(key, &versions).await
    }

    pub async fn healthcheck(&self) -> Result<(), VaultError> {
        self.read::<HealthCheckData>(self.healthcheck_file_path.as_str()).await?;
        Ok(())
    }

    pub async fn clear_healthcheck_file(&self) -> Result<(), VaultError> {
        let path = self.healthcheck_file_path.as_str();
        self.delete(path).await?;
        self.delete_permanent(path).await
    }

    pub async fn setup_healthcheck_file(&self) -> Result<(), VaultError> {
        let data = HealthCheckData {
            data: "health check file".to_string(),
        };
        self.insert(self.healthcheck_file_path.as_str(), data).await?;
        Ok(())
    }
}
