use crate::auth::approle::AppRoleAuth;
use crate::auth::kubernetes::KubernetesAuth;
use crate::auth::method::AuthMethod;
use crate::auth::token::TokenAuth;
use crate::auth::userpass::UserPassAuth;

use duration_string::DurationString;
use std::{env, sync::Arc, time::Duration};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("VAULT_TOKEN must be set for token authentication")]
    MissingToken,

    #[error("{0} must be set for the selected auth method")]
    MissingVariable(&'static str),

    #[error("Auth method {0} is not valid. Possible values: Token, UserPass, Ldap, Okta, Radius, AppRole, Kubernetes")]
    UnknownAuthMethod(String),

    #[error("Error parsing VAULT_CLIENT_TIMEOUT `{0}': {1}")]
    InvalidTimeoutDuration(String, String),

    #[error("Unable to initialize Kubernetes authentication: {0}")]
    KubernetesAuth(String),

    #[error("mount path must not be empty")]
    EmptyMountPath,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VaultConfig {
    pub address: String,
    pub mount_path: String,
    pub client_timeout: Duration,
    pub healthcheck_file_path: String,
    /// When set, the session token is persisted here between runs.
    pub token_cache_file: Option<String>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            address: String::from("http://localhost:8200"),
            mount_path: String::from("secret"),
            client_timeout: Duration::from_secs(5),
            healthcheck_file_path: String::from("healthcheck_file"),
            token_cache_file: None,
        }
    }
}

impl VaultConfig {
    /// Reads the configuration and auth method from `VAULT_*` environment
    /// variables.
    pub fn load_env() -> Result<(Self, Arc<dyn AuthMethod>), ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`VaultConfig::load_env`] with variables resolved by `var`.
    pub fn from_lookup<F>(var: F) -> Result<(Self, Arc<dyn AuthMethod>), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let auth_method = Self::auth_method(&var)?;

        let defaults = Self::default();
        let address = var("VAULT_ADDR").unwrap_or(defaults.address);
        let mount_path = var("VAULT_MOUNT_PATH").unwrap_or(defaults.mount_path);
        if mount_path.trim().trim_matches('/').is_empty() {
            return Err(ConfigError::EmptyMountPath);
        }
        let client_timeout = Self::client_timeout(var("VAULT_CLIENT_TIMEOUT"))?;
        let healthcheck_file_path = var("VAULT_HEALTH_CHECK_FILE").unwrap_or(defaults.healthcheck_file_path);
        let token_cache_file = var("VAULT_TOKEN_CACHE_FILE").filter(|path| !path.is_empty());

        Ok((
            VaultConfig {
                address,
                mount_path,
                client_timeout,
                healthcheck_file_path,
                token_cache_file,
            },
            auth_method,
        ))
    }

    fn auth_method<F>(var: &F) -> Result<Arc<dyn AuthMethod>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| var(key).ok_or(ConfigError::MissingVariable(key));
        let mount = var("VAULT_AUTH_MOUNT_PATH").filter(|m| !m.trim().is_empty());

        let method = var("VAULT_AUTH_METHOD").unwrap_or_else(|| String::from("Token"));
        let auth_method: Arc<dyn AuthMethod> = match method.as_str() {
            "Token" => match var("VAULT_TOKEN") {
                Some(token) => Arc::new(TokenAuth::new(token)),
                None => return Err(ConfigError::MissingToken),
            },
            "UserPass" | "Ldap" | "Okta" | "Radius" => {
                let username = required("VAULT_USERNAME")?;
                let password = required("VAULT_PASSWORD")?;
                let auth = match method.as_str() {
                    "UserPass" => UserPassAuth::userpass(username, password),
                    "Ldap" => UserPassAuth::ldap(username, password),
                    "Okta" => UserPassAuth::okta(username, password),
                    _ => UserPassAuth::radius(username, password),
                };
                match mount {
                    Some(mount) => Arc::new(auth.with_mount(mount)),
                    None => Arc::new(auth),
                }
            }
            "AppRole" => {
                let auth = AppRoleAuth::new(required("VAULT_ROLE_ID")?, required("VAULT_SECRET_ID")?);
                match mount {
                    Some(mount) => Arc::new(auth.with_mount(mount)),
                    None => Arc::new(auth),
                }
            }
            "Kubernetes" => {
                let sa_token_path = var("VAULT_KUBERNETES_TOKEN_PATH");
                let role = var("VAULT_KUBERNETES_ROLE_NAME");
                Arc::new(KubernetesAuth::new(mount, sa_token_path, role)?)
            }
            method => return Err(ConfigError::UnknownAuthMethod(method.to_string())),
        };

        Ok(auth_method)
    }

    fn client_timeout(value: Option<String>) -> Result<Duration, ConfigError> {
        let client_timeout_str = value.unwrap_or_else(|| String::from("5s"));

        match DurationString::from_string(client_timeout_str.clone()) {
            Ok(timeout) => Ok(Duration::from(timeout)),
            Err(err) => Err(ConfigError::InvalidTimeoutDuration(client_timeout_str, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<(VaultConfig, Arc<dyn AuthMethod>), ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        VaultConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_with_token_auth() {
        let (config, auth) = load(&[("VAULT_TOKEN", "s.root")]).unwrap();
        assert_eq!(config, VaultConfig::default());
        assert!(format!("{:?}", auth).starts_with("TokenAuth"));
    }

    #[test]
    fn token_auth_requires_a_token() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingToken)));
    }

    #[test]
    fn reads_overrides() {
        let (config, _) = load(&[
            ("VAULT_TOKEN", "s.root"),
            ("VAULT_ADDR", "https://vault.internal:8200"),
            ("VAULT_MOUNT_PATH", "kv"),
            ("VAULT_CLIENT_TIMEOUT", "1m"),
            ("VAULT_HEALTH_CHECK_FILE", "status_file"),
            ("VAULT_TOKEN_CACHE_FILE", "/tmp/vault-token.json"),
        ])
        .unwrap();

        assert_eq!(config.address, "https://vault.internal:8200");
        assert_eq!(config.mount_path, "kv");
        assert_eq!(config.client_timeout, Duration::from_secs(60));
        assert_eq!(config.healthcheck_file_path, "status_file");
        assert_eq!(config.token_cache_file.as_deref(), Some("/tmp/vault-token.json"));
    }

    #[test]
    fn rejects_bad_values() {
        let err = load(&[("VAULT_TOKEN", "t"), ("VAULT_CLIENT_TIMEOUT", "soon")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTimeoutDuration(value, _) if value == "soon"));

        let err = load(&[("VAULT_TOKEN", "t"), ("VAULT_MOUNT_PATH", "/")]).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyMountPath));

        let err = load(&[("VAULT_AUTH_METHOD", "Github")]).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownAuthMethod(method) if method == "Github"));
    }

    #[test]
    fn path_based_methods_need_credentials() {
        let err = load(&[("VAULT_AUTH_METHOD", "Ldap"), ("VAULT_USERNAME", "alice")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVariable("VAULT_PASSWORD")));

        let (_, auth) = load(&[
            ("VAULT_AUTH_METHOD", "Okta"),
            ("VAULT_USERNAME", "alice"),
            ("VAULT_PASSWORD", "secret"),
            ("VAULT_AUTH_MOUNT_PATH", "okta-eu"),
        ])
        .unwrap();
        assert!(format!("{:?}", auth).contains("okta-eu"));

        let err = load(&[("VAULT_AUTH_METHOD", "AppRole"), ("VAULT_ROLE_ID", "r")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVariable("VAULT_SECRET_ID")));
    }

    #[test]
    fn kubernetes_needs_a_readable_token() {
        let err = load(&[
            ("VAULT_AUTH_METHOD", "Kubernetes"),
            ("VAULT_KUBERNETES_TOKEN_PATH", "/nonexistent/token"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::KubernetesAuth(_)));
    }
}
