use std::sync::Arc;

use serde_json::Value;

use crate::errors::VaultError;
use crate::executor::RequestExecutor;
use crate::http::{api_path, HttpRequest, HttpResponse, Method, CONTENT_TYPE_HEADER};
use crate::models::{TokenRecord, VaultResponse};
use crate::session::SessionManager;

const MERGE_PATCH_CONTENT_TYPE: &str = "application/merge-patch+json";

/// Cheaply cloneable handle for raw Vault API calls. Every call goes through
/// the same session, so clones share the token.
#[derive(Debug, Clone)]
pub struct Client {
    executor: Arc<RequestExecutor>,
}

impl Client {
    pub fn new(session: SessionManager) -> Self {
        Self::from_session(Arc::new(session))
    }

    pub fn from_session(session: Arc<SessionManager>) -> Self {
        Self {
            executor: Arc::new(RequestExecutor::new(session)),
        }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        self.executor.session()
    }

    pub async fn authenticate(&self) -> Result<bool, VaultError> {
        self.session().authenticate().await
    }

    pub async fn token(&self) -> Option<TokenRecord> {
        self.session().token().await
    }

    pub async fn read(&self, path: &str) -> Result<VaultResponse, VaultError> {
        self.executor.send(Method::Get, path, None).await
    }

    pub async fn write(&self, path: &str, body: Value) -> Result<VaultResponse, VaultError> {
        self.executor.send(Method::Post, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> Result<VaultResponse, VaultError> {
        self.executor.send(Method::Put, path, Some(body)).await
    }

    /// JSON merge-patch, as used by KV v2 `PATCH` endpoints.
    pub async fn patch(&self, path: &str, body: Value) -> Result<VaultResponse, VaultError> {
        let request = HttpRequest::new(Method::Patch, api_path(path))
            .with_header(CONTENT_TYPE_HEADER, MERGE_PATCH_CONTENT_TYPE)
            .with_body(body);
        let response = self.executor.execute(request).await?;
        Ok(VaultResponse::from_body(&response.body)?)
    }

    pub async fn delete(&self, path: &str) -> Result<VaultResponse, VaultError> {
        self.executor.send(Method::Delete, path, None).await
    }

    pub async fn list(&self, path: &str) -> Result<VaultResponse, VaultError> {
        self.executor.send(Method::List, path, None).await
    }

    /// Escape hatch for requests the helpers above don't cover.
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, VaultError> {
        self.executor.execute(request).await
    }
}
