use async_trait::async_trait;
use serde_json::json;
use std::fmt;

use crate::auth::method::{login, AuthMethod, AuthResult};
use crate::errors::VaultError;
use crate::http::Transport;

pub struct AppRoleAuth {
    mount: String,
    role_id: String,
    secret_id: String,
}

impl fmt::Debug for AppRoleAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppRoleAuth")
            .field("mount", &self.mount)
            .field("role_id", &self.role_id)
            .finish_non_exhaustive()
    }
}

impl AppRoleAuth {
    pub fn new(role_id: impl Into<String>, secret_id: impl Into<String>) -> Self {
        Self {
            mount: "approle".to_string(),
            role_id: role_id.into(),
            secret_id: secret_id.into(),
        }
    }

    pub fn with_mount(mut self, mount: impl Into<String>) -> Self {
        self.mount = mount.into().trim().trim_matches('/').to_string();
        self
    }
}

#[async_trait]
impl AuthMethod for AppRoleAuth {
    async fn authenticate(&self, transport: &dyn Transport) -> Result<Option<AuthResult>, VaultError> {
        login(
            transport,
            &format!("auth/{}/login", self.mount),
            json!({
                "role_id": self.role_id,
                "secret_id": self.secret_id,
            }),
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
    async fn posts_role_and_secret_ids() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/auth/approle/login"))
            .and(body_json(json!({"role_id": "role", "secret_id": "secret"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "request_id": "7d6d7d0b",
                "lease_id": "",
                "renewable": false,
                "lease_duration": 0,
                "data": null,
                "auth": {
                    "client_token": "s.approle",
                    "lease_duration": 1200,
                    "renewable": true,
                    "metadata": {"role_name": "app"}
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let auth = AppRoleAuth::new("role", "secret")
            .authenticate(&transport)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(auth.client_token, "s.approle");
        assert_eq!(auth.lease_duration, 1200);
        assert!(auth.renewable);
    }
}
