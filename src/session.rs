//! Owns the session token: decides when to log in, when a cached token can
//! be reused and when the held token is expired.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::{Mutex, RwLock};

use crate::auth::method::AuthMethod;
use crate::cache::{CacheError, TokenCache, TOKEN_CACHE_KEY};
use crate::clock::{Clock, SystemClock};
use crate::errors::VaultError;
use crate::http::{api_path, HttpRequest, Method, Transport, CONTENT_TYPE_HEADER, JSON_CONTENT_TYPE, TOKEN_HEADER};
use crate::models::{TokenLookup, TokenRecord, VaultResponse};

pub const LOOKUP_SELF_PATH: &str = "auth/token/lookup-self";

pub struct SessionManager {
    transport: Arc<dyn Transport>,
    auth_method: Option<Arc<dyn AuthMethod>>,
    cache: Option<Arc<dyn TokenCache>>,
    clock: Arc<dyn Clock>,
    token: RwLock<Option<TokenRecord>>,
    // Serialises login-and-swap so concurrent 403s cause a single login.
    login: Mutex<()>,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("transport", &self.transport)
            .field("auth_method", &self.auth_method)
            .field("cache", &self.cache)
            .finish()
    }
}

impl SessionManager {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            auth_method: None,
            cache: None,
            clock: Arc::new(SystemClock),
            token: RwLock::new(None),
            login: Mutex::new(()),
        }
    }

    pub fn with_auth_method(mut self, auth_method: Arc<dyn AuthMethod>) -> Self {
        self.auth_method = Some(auth_method);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn TokenCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// A snapshot of the current token record.
    pub async fn token(&self) -> Option<TokenRecord> {
        self.token.read().await.clone()
    }

    /// Installs `record` as the session token without logging in.
    pub async fn set_token(&self, record: TokenRecord) {
        *self.token.write().await = Some(record);
    }

    pub async fn holds_expired_token(&self) -> bool {
        let now = self.now();
        self.token
            .read()
            .await
            .as_ref()
            .map_or(false, |record| record.is_expired(now))
    }

    /// Makes sure the session holds a valid token.
    ///
    /// Returns `Ok(false)` when the auth method declined to log in. Either a
    /// fully validated record is installed or the previous one is kept.
    pub async fn authenticate(&self) -> Result<bool, VaultError> {
        let _guard = self.login.lock().await;
        self.authenticate_locked().await
    }

    /// Re-authenticates after a request sent with `stale` was refused.
    ///
    /// If another task already swapped in a live token while this one waited
    /// for the login lock, no second login happens.
    pub async fn reauthenticate(&self, stale: &TokenRecord) -> Result<bool, VaultError> {
        let _guard = self.login.lock().await;

        let now = self.now();
        let refreshed = self
            .token
            .read()
            .await
            .as_ref()
            .map_or(false, |current| current != stale && !current.is_expired(now));
        if refreshed {
            debug!("Vault token was already refreshed by a concurrent request");
            return Ok(true);
        }

        self.authenticate_locked().await
    }

    async fn authenticate_locked(&self) -> Result<bool, VaultError> {
        if let Some(record) = self.cached_token().await {
            info!("Using cached Vault token (accessor {})", record.accessor);
            *self.token.write().await = Some(record);
            return Ok(true);
        }

        let auth_method = self.auth_method.as_ref().ok_or_else(|| {
            VaultError::Dependency("specify an authentication method before calling authenticate".to_string())
        })?;

        let auth = match auth_method.authenticate(self.transport.as_ref()).await? {
            Some(auth) => auth,
            None => {
                warn!("Vault login was declined by {:?}", auth_method);
                return Ok(false);
            }
        };

        let lookup = self.lookup_self(&TokenRecord::provisional(auth.clone())).await?;
        let record = TokenRecord::from_lookup(auth, lookup, self.now());

        if let Err(err) = self.cache_token(&record).await {
            warn!("Could not cache Vault token: {}", err);
        }

        info!(
            "Authenticated with Vault (accessor {}, policies {:?})",
            record.accessor, record.policies
        );
        *self.token.write().await = Some(record);
        Ok(true)
    }

    async fn cached_token(&self) -> Option<TokenRecord> {
        let cache = self.cache.as_ref()?;
        match cache.get(TOKEN_CACHE_KEY).await {
            Ok(Some(record)) if record.client_token().is_some() && !record.is_expired(self.now()) => Some(record),
            Ok(Some(_)) => {
                debug!("Ignoring cached Vault token: expired or incomplete");
                None
            }
            Ok(None) => None,
            Err(err) => {
                warn!("Could not read Vault token from cache, logging in instead: {}", err);
                None
            }
        }
    }

    /// Writes `record` to the cache, keyed to expire with its lease.
    ///
    /// A record that is already expired is refused and the cache is left
    /// untouched. Without a cache this is a no-op.
    pub async fn cache_token(&self, record: &TokenRecord) -> Result<(), CacheError> {
        let cache = match &self.cache {
            Some(cache) => cache,
            None => return Ok(()),
        };

        if record.is_expired(self.now()) {
            return Err(CacheError::Expired {
                accessor: record.accessor.clone(),
                expired_at: record.expires_at().unwrap_or_default(),
            });
        }

        let ttl = record
            .auth
            .as_ref()
            .map(|auth| auth.lease_duration)
            .filter(|lease| *lease > 0)
            .map(Duration::from_secs);

        cache.set(TOKEN_CACHE_KEY, record, ttl).await
    }

    async fn lookup_self(&self, provisional: &TokenRecord) -> Result<TokenLookup, VaultError> {
        let mut request = HttpRequest::new(Method::Get, api_path(LOOKUP_SELF_PATH))
            .with_header(CONTENT_TYPE_HEADER, JSON_CONTENT_TYPE);
        if let Some(token) = provisional.client_token() {
            request = request.with_header(TOKEN_HEADER, token);
        }

        let response = self.transport.send(request).await?.error_for_status()?;
        VaultResponse::from_body(&response.body)?.data_as()
    }
}
