//! Test doubles shared by the unit tests.
#![cfg(test)]

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::auth::method::{AuthMethod, AuthResult};
use crate::cache::{CacheError, TokenCache};
use crate::errors::VaultError;
use crate::http::{HttpRequest, HttpResponse, Transport, TransportError};
use crate::models::TokenRecord;

type Handler = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync>;

/// A transport answering from a closure and recording every request.
pub struct MockTransport {
    handler: Handler,
    requests: Mutex<Vec<HttpRequest>>,
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTransport").field("calls", &self.calls()).finish()
    }
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request fails as if the server were down.
    pub fn unreachable() -> Self {
        Self::new(|_| Err(TransportError::new("connection refused")))
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.path == path)
            .count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        // Let concurrent callers interleave the way a real network would.
        tokio::task::yield_now().await;
        (self.handler)(&request)
    }
}

enum Outcome {
    Fixed(AuthResult),
    Numbered,
    Declined,
}

/// An auth method that counts its logins.
pub struct CountingAuth {
    outcome: Outcome,
    calls: AtomicUsize,
}

impl fmt::Debug for CountingAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountingAuth").field("calls", &self.calls()).finish()
    }
}

impl CountingAuth {
    fn with(outcome: Outcome) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn fixed(result: AuthResult) -> Self {
        Self::with(Outcome::Fixed(result))
    }

    /// Hands out `token-1`, `token-2`, ... on successive logins.
    pub fn numbered() -> Self {
        Self::with(Outcome::Numbered)
    }

    pub fn declining() -> Self {
        Self::with(Outcome::Declined)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthMethod for CountingAuth {
    async fn authenticate(&self, _transport: &dyn Transport) -> Result<Option<AuthResult>, VaultError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::task::yield_now().await;
        Ok(match &self.outcome {
            Outcome::Fixed(result) => Some(result.clone()),
            Outcome::Numbered => Some(AuthResult::new(format!("token-{}", n), 3600, true)),
            Outcome::Declined => None,
        })
    }
}

/// A cache whose backend is always broken.
#[derive(Debug)]
pub struct FailingCache;

#[async_trait]
impl TokenCache for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<TokenRecord>, CacheError> {
        Err(CacheError::Backend("cache is down".to_string()))
    }

    async fn set(&self, _key: &str, _record: &TokenRecord, _ttl: Option<Duration>) -> Result<(), CacheError> {
        Err(CacheError::Backend("cache is down".to_string()))
    }
}

/// A `lookup-self` response body.
pub fn lookup_body(id: &str, creation_ttl: u64) -> String {
    json!({
        "request_id": "7c0f2a1e",
        "lease_id": "",
        "renewable": false,
        "lease_duration": 0,
        "data": {
            "accessor": format!("acc-{}", id),
            "creation_time": 1_600_000_000,
            "creation_ttl": creation_ttl,
            "display_name": "token",
            "explicit_max_ttl": 0,
            "id": id,
            "meta": null,
            "num_uses": 0,
            "orphan": false,
            "path": "auth/token/create",
            "policies": ["default"],
            "ttl": creation_ttl
        }
    })
    .to_string()
}
