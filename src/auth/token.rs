use async_trait::async_trait;
use std::fmt;

use crate::auth::method::{AuthMethod, AuthResult};
use crate::errors::VaultError;
use crate::http::Transport;

/// Uses a pre-issued token as is. No login request is made; the session's
/// self-lookup is what validates it.
pub struct TokenAuth {
    token: String,
}

impl fmt::Debug for TokenAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuth").finish_non_exhaustive()
    }
}

impl TokenAuth {
    pub fn new(token: String) -> Self {
        Self { token }
    }
}

#[async_trait]
impl AuthMethod for TokenAuth {
    async fn authenticate(&self, _: &dyn Transport) -> Result<Option<AuthResult>, VaultError> {
        if self.token.is_empty() {
            return Ok(None);
        }
        Ok(Some(AuthResult::token(self.token.clone())))
    }
}
