//! Sends authenticated requests and recovers from a token that expired
//! mid-session.
//!
//! A `403` only counts as token expiry when the request went out with a token
//! the session already considers expired. In that case the session logs in
//! again and the request is resent exactly once; whatever the retry returns
//! is final.

use std::sync::Arc;

use log::{debug, error, info, warn};
use serde_json::Value;

use crate::errors::VaultError;
use crate::http::{api_path, HttpRequest, HttpResponse, Method, CONTENT_TYPE_HEADER, JSON_CONTENT_TYPE, TOKEN_HEADER};
use crate::models::{TokenRecord, VaultResponse};
use crate::session::SessionManager;

const FORBIDDEN: u16 = 403;

#[derive(Debug)]
pub struct RequestExecutor {
    session: Arc<SessionManager>,
}

impl RequestExecutor {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Sends a JSON request to `path` (relative to `/v1`) and decodes the
    /// response envelope.
    pub async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<VaultResponse, VaultError> {
        let mut request = HttpRequest::new(method, api_path(path));
        if let Some(body) = body {
            request = request.with_body(body);
        }

        let response = self.execute(request).await?;
        Ok(VaultResponse::from_body(&response.body)?)
    }

    /// Sends `request` with the session token attached. Headers already on
    /// the request win over the JSON content type default.
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, VaultError> {
        let (sent_with, response) = self.dispatch(&request).await?;

        if response.status != FORBIDDEN {
            return Ok(response.error_for_status()?);
        }

        let stale = match sent_with {
            Some(record) if record.is_expired(self.session.now()) => record,
            _ => {
                debug!("{} {} was forbidden with a live token", request.method, request.path);
                return Ok(response.error_for_status()?);
            }
        };

        info!(
            "Vault token (accessor {}) expired, re-authenticating before retrying {} {}",
            stale.accessor, request.method, request.path
        );
        self.reauthenticate(&stale).await?;

        let (_, retried) = self.dispatch(&request).await?;
        Ok(retried.error_for_status()?)
    }

    /// Sends one attempt, returning the token record it carried.
    async fn dispatch(&self, request: &HttpRequest) -> Result<(Option<TokenRecord>, HttpResponse), VaultError> {
        let record = self.session.token().await;

        let mut outgoing = request.clone();
        if outgoing.header(CONTENT_TYPE_HEADER).is_none() {
            outgoing = outgoing.with_header(CONTENT_TYPE_HEADER, JSON_CONTENT_TYPE);
        }
        if let Some(token) = record.as_ref().and_then(TokenRecord::client_token) {
            outgoing = outgoing.with_header(TOKEN_HEADER, token);
        }

        debug!("{} {}", outgoing.method, outgoing.path);
        let response = match self.session.transport().send(outgoing).await {
            Ok(response) => response,
            Err(err) => {
                error!("{} {} failed: {}", request.method, request.path, err);
                return Err(err.into());
            }
        };
        debug!("{} {} -> {}", request.method, request.path, response.status);

        Ok((record, response))
    }

    async fn reauthenticate(&self, stale: &TokenRecord) -> Result<(), VaultError> {
        match self.session.reauthenticate(stale).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                warn!("Vault re-authentication was declined");
                Err(VaultError::Authentication(
                    "cannot re-authenticate: the auth method declined to log in".to_string(),
                ))
            }
            Err(err) => {
                warn!("Vault re-authentication failed: {}", err);
                Err(VaultError::Authentication(format!("cannot re-authenticate: {}", err)))
            }
        }
    }
}
