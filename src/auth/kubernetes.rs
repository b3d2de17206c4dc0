use crate::auth::method::{login, AuthMethod, AuthResult};
use crate::config::ConfigError;
use crate::errors::VaultError;
use crate::http::Transport;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{fmt, fs};

pub const DEFAULT_SA_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

#[derive(Serialize, Deserialize)]
struct NameUUID {
    name: String,
    #[serde(rename = "uid")]
    uuid: String,
}

#[derive(Serialize, Deserialize)]
struct KubernetesIO {
    serviceaccount: NameUUID,
}

#[derive(Serialize, Deserialize)]
struct K8infos {
    #[serde(rename = "kubernetes.io")]
    kubernetes_io: KubernetesIO,
}

/// Logs in with the pod's service account JWT. Unless told otherwise the
/// Vault role is the service account name found in the JWT claims.
pub struct KubernetesAuth {
    mount: String,
    role: String,
    token: String,
}

impl fmt::Debug for KubernetesAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubernetesAuth")
            .field("mount", &self.mount)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl KubernetesAuth {
    pub fn new(
        mount: Option<String>,
        sa_token_path: Option<String>,
        role: Option<String>,
    ) -> Result<Self, ConfigError> {
        let path = sa_token_path.unwrap_or_else(|| DEFAULT_SA_TOKEN_PATH.to_string());
        let token = fs::read_to_string(&path)
            .map_err(|err| ConfigError::KubernetesAuth(format!("cannot read {}: {}", path, err)))?;

        Self::from_jwt(mount, token, role)
    }

    pub fn from_jwt(mount: Option<String>, jwt: String, role: Option<String>) -> Result<Self, ConfigError> {
        let token = jwt.trim().to_string();
        let role = match role {
            Some(role) => role,
            None => service_account_name(&token)?,
        };

        Ok(Self {
            mount: mount.unwrap_or_else(|| "kubernetes".to_string()),
            token,
            role,
        })
    }

    pub fn role(&self) -> &str {
        &self.role
    }
}

fn service_account_name(jwt: &str) -> Result<String, ConfigError> {
    let encoded_k8_infos = jwt
        .split('.')
        .nth(1)
        .ok_or_else(|| ConfigError::KubernetesAuth("service account token is not a JWT".to_string()))?;

    let mut decoded_k8_infos: Vec<u8> = Vec::new();
    base64::engine::GeneralPurpose::new(&base64::alphabet::URL_SAFE, base64::engine::general_purpose::NO_PAD)
        .decode_vec(encoded_k8_infos.as_bytes(), &mut decoded_k8_infos)
        .map_err(|err| ConfigError::KubernetesAuth(err.to_string()))?;

    let k8infos = serde_json::from_slice::<K8infos>(&decoded_k8_infos)
        .map_err(|err| ConfigError::KubernetesAuth(err.to_string()))?;

    Ok(k8infos.kubernetes_io.serviceaccount.name)
}

#[async_trait]
impl AuthMethod for KubernetesAuth {
    async fn authenticate(&self, transport: &dyn Transport) -> Result<Option<AuthResult>, VaultError> {
        login(
            transport,
            &format!("auth/{}/login", self.mount),
            json!({
                "role": self.role,
                "jwt": self.token,
            }),
        )
        .await
    }
}
