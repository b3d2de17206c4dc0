use std::collections::HashMap;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::auth::method::AuthResult;
use crate::errors::VaultError;

/// The envelope every Vault API response shares.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VaultResponse {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub lease_id: Option<String>,
    #[serde(default)]
    pub lease_duration: u64,
    #[serde(default)]
    pub renewable: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub auth: Option<AuthResult>,
    #[serde(default)]
    pub warnings: Option<Vec<String>>,
}

impl VaultResponse {
    /// Parses a response body. `204 No Content` and friends yield an empty
    /// response.
    pub fn from_body(body: &str) -> Result<Self, serde_json::Error> {
        if body.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(body)
    }

    /// Deserialises `data` into `T`; a missing `data` is treated as `null`.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, VaultError> {
        let data = self.data.clone().unwrap_or(Value::Null);
        Ok(serde_json::from_value(data)?)
    }
}

/// The `data` block of `auth/token/lookup-self`.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct TokenLookup {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub accessor: String,
    #[serde(default)]
    pub creation_ttl: u64,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub explicit_max_ttl: u64,
    #[serde(default)]
    pub meta: Option<HashMap<String, String>>,
    #[serde(default)]
    pub num_uses: u64,
    #[serde(default)]
    pub orphan: bool,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub policies: Option<Vec<String>>,
    #[serde(default)]
    pub ttl: u64,
}

/// The session's view of its token: the login result plus what Vault said
/// about the token on self-lookup.
///
/// `creation_time` is stamped with the local clock when the record is built;
/// the service's own `creation_time` is ignored so clock skew cannot make a
/// fresh token look expired.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub auth: Option<AuthResult>,
    pub id: String,
    pub accessor: String,
    pub creation_time: u64,
    /// 0 means the token never expires by TTL.
    pub creation_ttl: u64,
    pub policies: Vec<String>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub explicit_max_ttl: u64,
    #[serde(default)]
    pub meta: HashMap<String, String>,
    #[serde(default)]
    pub num_uses: u64,
    #[serde(default)]
    pub orphan: bool,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub ttl: u64,
}

impl TokenRecord {
    /// A record that only knows its login result, used for the self-lookup.
    pub fn provisional(auth: AuthResult) -> Self {
        Self {
            auth: Some(auth),
            ..Self::default()
        }
    }

    pub(crate) fn from_lookup(auth: AuthResult, lookup: TokenLookup, now: u64) -> Self {
        Self {
            auth: Some(auth),
            id: lookup.id,
            accessor: lookup.accessor,
            creation_time: now,
            creation_ttl: lookup.creation_ttl,
            policies: lookup.policies.unwrap_or_default(),
            display_name: lookup.display_name,
            explicit_max_ttl: lookup.explicit_max_ttl,
            meta: lookup.meta.unwrap_or_default(),
            num_uses: lookup.num_uses,
            orphan: lookup.orphan,
            path: lookup.path,
            ttl: lookup.ttl,
        }
    }

    pub fn client_token(&self) -> Option<&str> {
        self.auth
            .as_ref()
            .map(|auth| auth.client_token.as_str())
            .filter(|token| !token.is_empty())
    }

    /// Unix time after which the token counts as expired, if it has a TTL.
    pub fn expires_at(&self) -> Option<u64> {
        if self.creation_ttl == 0 {
            return None;
        }
        Some(self.creation_time.saturating_add(self.creation_ttl))
    }

    pub fn is_expired(&self, now: u64) -> bool {
        match self.expires_at() {
            Some(expires_at) => now > expires_at,
            None => false,
        }
    }
}
