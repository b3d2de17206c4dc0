use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;

use crate::errors::VaultError;
use crate::http::{api_path, HttpRequest, Method, Transport, CONTENT_TYPE_HEADER, JSON_CONTENT_TYPE};
use crate::models::VaultResponse;

/// Outcome of a login handshake. Mirrors the `auth` block of a Vault login
/// response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResult {
    pub client_token: String,
    #[serde(default)]
    pub lease_duration: u64,
    #[serde(default)]
    pub renewable: bool,
}

impl AuthResult {
    pub fn new(client_token: impl Into<String>, lease_duration: u64, renewable: bool) -> Self {
        Self {
            client_token: client_token.into(),
            lease_duration,
            renewable,
        }
    }

    /// A bare token with no lease information.
    pub fn token(client_token: impl Into<String>) -> Self {
        Self::new(client_token, 0, false)
    }
}

/// A way of exchanging credentials for a Vault token.
///
/// `Ok(None)` means the login was declined; the session reports that as a
/// soft failure instead of an error.
#[async_trait]
pub trait AuthMethod: Debug + Send + Sync {
    async fn authenticate(&self, transport: &dyn Transport) -> Result<Option<AuthResult>, VaultError>;
}

/// POSTs `body` to a login endpoint and extracts the `auth` block.
pub(crate) async fn login(
    transport: &dyn Transport,
    path: &str,
    body: Value,
) -> Result<Option<AuthResult>, VaultError> {
    let path = api_path(path);
    debug!("Logging in to Vault via {}", path);

    let request = HttpRequest::new(Method::Post, path)
        .with_header(CONTENT_TYPE_HEADER, JSON_CONTENT_TYPE)
        .with_body(body);
    let response = transport.send(request).await?.error_for_status()?;

    Ok(VaultResponse::from_body(&response.body)?.auth)
}
