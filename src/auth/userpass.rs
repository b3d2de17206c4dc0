use async_trait::async_trait;
use serde_json::json;
use std::fmt;

use crate::auth::method::{login, AuthMethod, AuthResult};
use crate::errors::VaultError;
use crate::http::Transport;

/// Username/password login against `auth/{mount}/login/{username}`.
///
/// The userpass, LDAP, Okta and RADIUS backends share this wire contract and
/// differ only in their default mount.
pub struct UserPassAuth {
    mount: String,
    username: String,
    password: String,
}

impl fmt::Debug for UserPassAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserPassAuth")
            .field("mount", &self.mount)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl UserPassAuth {
    pub fn new(mount: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            mount: mount.into().trim().trim_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn userpass(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new("userpass", username, password)
    }

    pub fn ldap(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new("ldap", username, password)
    }

    pub fn okta(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new("okta", username, password)
    }

    pub fn radius(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new("radius", username, password)
    }

    pub fn with_mount(self, mount: impl Into<String>) -> Self {
        Self::new(mount, self.username, self.password)
    }

    pub fn mount(&self) -> &str {
        &self.mount
    }
}

#[async_trait]
impl AuthMethod for UserPassAuth {
    async fn authenticate(&self, transport: &dyn Transport) -> Result<Option<AuthResult>, VaultError> {
        if self.mount.is_empty() {
            return Err(VaultError::Dependency(
                "a login mount path must be set before authenticating".to_string(),
            ));
        }

        login(
            transport,
            &format!("auth/{}/login/{}", self.mount, self.username),
            json!({ "password": self.password }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ReqwestTransport;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn ldap_posts_password_to_its_mount() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/auth/ldap/login/alice"))
            .and(body_json(json!({"password": "hunter2"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "auth": {
                    "client_token": "s.ldap",
                    "accessor": "acc",
                    "policies": ["default"],
                    "lease_duration": 1800,
                    "renewable": true
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let auth = UserPassAuth::ldap("alice", "hunter2")
            .authenticate(&transport)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(auth, AuthResult::new("s.ldap", 1800, true));
    }

    #[tokio::test]
    async fn custom_mount_and_rejected_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/auth/corp-users/login/bob"))
            .respond_with(ResponseTemplate::new(400).set_body_string("{\"errors\":[\"invalid username or password\"]}"))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let auth = UserPassAuth::userpass("bob", "nope").with_mount("/corp-users/");
        assert_eq!(auth.mount(), "corp-users");

        let err = auth.authenticate(&transport).await.unwrap_err();
        assert_eq!(err.status(), Some(400));
    }

    #[tokio::test]
    async fn response_without_auth_block_is_a_declined_login() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/auth/okta/login/carol"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"auth": null, "data": null})))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let auth = UserPassAuth::okta("carol", "pw").authenticate(&transport).await.unwrap();
        assert!(auth.is_none());
    }

    #[tokio::test]
    async fn empty_mount_is_rejected_before_any_request() {
        let transport = ReqwestTransport::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        let err = UserPassAuth::new("  ", "dave", "pw")
            .authenticate(&transport)
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::Dependency(_)));
    }
}
