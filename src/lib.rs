//! This library provides a Vault client that keeps an authenticated session
//! alive. It logs in with a pluggable auth method, validates the token with a
//! self-lookup, optionally caches it, and transparently re-authenticates once
//! when a request is refused because the token expired.
//!
//! ## Installation
//! Add the following to your `Cargo.toml` file:
//! ```toml
//! [dependencies]
//! vault-session = "0.3.0"
//! ```
//!
//! ## Usage
//! You should define following environment variables to configure Vault.
//!```yaml
//! VAULT_ADDR: "http://localhost:8200"
//! VAULT_MOUNT_PATH: secret
//! VAULT_CLIENT_TIMEOUT: 5s
//! VAULT_HEALTH_CHECK_FILE: healthcheck_file
//! VAULT_TOKEN_CACHE_FILE: /var/cache/app/vault-token.json # optional
//! ```
//!
//! For Token Configuration:
//! ```yaml
//! VAULT_AUTH_METHOD: Token
//! VAULT_TOKEN: token
//! ```
//!
//! For UserPass, Ldap, Okta or Radius Configuration:
//! ```yaml
//! VAULT_AUTH_METHOD: Ldap
//! VAULT_USERNAME: alice
//! VAULT_PASSWORD: password
//! VAULT_AUTH_MOUNT_PATH: ldap # optional
//! ```
//!
//! For AppRole Configuration:
//! ```yaml
//! VAULT_AUTH_METHOD: AppRole
//! VAULT_ROLE_ID: role-id
//! VAULT_SECRET_ID: secret-id
//! ```
//!
//! For Kubernetes Configuration:
//! ```yaml
//! VAULT_AUTH_METHOD: Kubernetes
//! VAULT_KUBERNETES_ROLE_NAME: client
//! VAULT_KUBERNETES_TOKEN_PATH: /var/run/secrets/kubernetes.io/serviceaccount/token
//! ```
//! Given values are default values of the variables. Make sure to replace the variable with your own variables for Vault configuration.
//!
//! ```rust,no_run
//! use serde::{Deserialize, Serialize};
//! use vault_session::VaultService;
//!
//! #[derive(Serialize, Deserialize)]
//! struct TestData {
//!     name: String,
//! }
//!
//! # async fn run() -> Result<(), vault_session::VaultError> {
//! // Initialize the Vault service
//! let vault_service = VaultService::from_env().await?;
//!
//! // Write a secret to Vault
//! let secret_value = TestData { name: "data".to_string() };
//! vault_service.insert("my-new-secret-key", secret_value).await?;
//!
//! // Read a secret from Vault
//! let value = vault_service.read::<TestData>("my-new-secret-key").await?;
//! # Ok(())
//! # }
//! ```
//!
//! Lower level access goes through [`Client`] and the secrets engines:
//!
//! ```rust,no_run
//! use std::{sync::Arc, time::Duration};
//! use vault_session::auth::AppRoleAuth;
//! use vault_session::secrets::KeyValueV2;
//! use vault_session::{Client, MemoryTokenCache, ReqwestTransport, SessionManager};
//!
//! # async fn run() -> Result<(), vault_session::VaultError> {
//! let transport = ReqwestTransport::new("http://localhost:8200", Duration::from_secs(5))?;
//! let session = SessionManager::new(Arc::new(transport))
//!     .with_auth_method(Arc::new(AppRoleAuth::new("role-id", "secret-id")))
//!     .with_cache(Arc::new(MemoryTokenCache::new()));
//!
//! let client = Client::new(session);
//! client.authenticate().await?;
//!
//! let kv = KeyValueV2::new(client, "secret")?;
//! let keys = kv.list("apps").await?;
//! # Ok(())
//! # }
//! ```
pub mod auth;
pub mod cache;
pub mod client;
pub mod clock;
pub mod config;
pub mod errors;
pub mod executor;
pub mod http;
pub mod models;
pub mod secrets;
pub mod service;
pub mod session;

mod test;
mod testing;

pub use cache::{CacheError, FileTokenCache, MemoryTokenCache, TokenCache};
pub use client::Client;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, VaultConfig};
pub use errors::{RequestError, VaultError};
pub use executor::RequestExecutor;
pub use http::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport, TransportError};
pub use models::{TokenRecord, VaultResponse};
pub use service::{HealthCheckData, VaultService};
pub use session::SessionManager;
