use thiserror::Error;

use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::http::TransportError;

/// Every failure surfaced by the session, the request executor and the
/// secrets engines built on top of them.
#[derive(Debug, Error)]
pub enum VaultError {
    /// An operation needs a collaborator that was never configured.
    #[error("missing dependency: {0}")]
    Dependency(String),

    /// Re-authentication after an expired-token 403 failed.
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("could not decode Vault response: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl VaultError {
    /// HTTP status of the failed request, if the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request(err) => err.status(),
            _ => None,
        }
    }
}

/// An HTTP-level failure: either Vault answered with a status >= 400, or the
/// transport never got an answer (no status in that case).
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RequestError {
    status: Option<u16>,
    body: Option<String>,
    message: String,
}

impl RequestError {
    pub fn from_response(status: u16, body: String) -> Self {
        let message = if body.is_empty() {
            format!("Something went wrong when calling Vault ({})", status)
        } else {
            format!("Something went wrong when calling Vault ({}):\n{}", status, body)
        };

        Self {
            status: Some(status),
            body: Some(body),
            message,
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

impl From<TransportError> for RequestError {
    fn from(err: TransportError) -> Self {
        Self {
            status: None,
            body: None,
            message: format!("Something went wrong when calling Vault ({})", err),
        }
    }
}

impl From<TransportError> for VaultError {
    fn from(err: TransportError) -> Self {
        Self::Request(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_exposed_for_response_errors_only() {
        let err: VaultError = RequestError::from_response(404, "{\"errors\":[]}".to_string()).into();
        assert_eq!(err.status(), Some(404));

        let err: VaultError = TransportError::new("connection refused").into();
        assert_eq!(err.status(), None);
        assert!(err.to_string().contains("connection refused"));

        assert_eq!(VaultError::Dependency("strategy".into()).status(), None);
    }
}
