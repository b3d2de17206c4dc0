#![cfg(test)]
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::auth::{AuthResult, TokenAuth, UserPassAuth};
use crate::clock::ManualClock;
use crate::errors::VaultError;
use crate::http::{ReqwestTransport, TOKEN_HEADER};
use crate::models::TokenRecord;
use crate::session::SessionManager;
use crate::testing::lookup_body;
use crate::{config::VaultConfig, service::VaultService};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
struct TestData {
    name: String,
}

fn config(server: &MockServer) -> VaultConfig {
    VaultConfig {
        address: server.uri(),
        ..VaultConfig::default()
    }
}

fn version_metadata(version: u64) -> Value {
    json!({
        "created_time": "2024-05-01T10:00:00.000000Z",
        "custom_metadata": null,
        "deletion_time": "",
        "destroyed": false,
        "version": version
    })
}

async fn mount_lookup(server: &MockServer, token: &str, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/v1/auth/token/lookup-self"))
        .and(header(TOKEN_HEADER, token))
        .respond_with(ResponseTemplate::new(200).set_body_string(lookup_body("tok-root", 3600)))
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Mounts write, read-once and metadata answers for `key`; reads after the
/// first one see a missing secret.
async fn mount_secret(server: &MockServer, key: &str, data: &TestData) {
    Mock::given(method("POST"))
        .and(path(format!("/v1/secret/data/{}", key)))
        .and(body_json(json!({ "data": data })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": version_metadata(1) })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/secret/data/{}", key)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "data": data, "metadata": version_metadata(1) }
        })))
        .up_to_n_times(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/secret/data/{}", key)))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "errors": [] })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/secret/metadata/{}", key)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "current_version": 1, "oldest_version": 0, "versions": { "1": version_metadata(1) } }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn write_delete_test() {
    let server = MockServer::start().await;
    mount_lookup(&server, "vault_token", 1).await;

    let inserted_data = TestData {
        name: "trial".to_string(),
    };
    mount_secret(&server, "test_1", &inserted_data).await;
    Mock::given(method("POST"))
        .and(path("/v1/secret/delete/test_1"))
        .and(body_json(json!({ "versions": [1] })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let service = VaultService::new(config(&server), Arc::new(TokenAuth::new("vault_token".to_string())))
        .await
        .unwrap();

    let metadata = service.insert("test_1", inserted_data.clone()).await.unwrap();
    assert_eq!(metadata.version, 1);
    assert_eq!(service.read::<TestData>("test_1").await.unwrap(), inserted_data);

    service.delete("test_1").await.unwrap();
    let err = service.read::<TestData>("test_1").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn write_destroy_test() {
    let server = MockServer::start().await;
    mount_lookup(&server, "vault_token", 1).await;

    let inserted_data = TestData {
        name: "trial".to_string(),
    };
    mount_secret(&server, "test_2", &inserted_data).await;
    Mock::given(method("PUT"))
        .and(path("/v1/secret/destroy/test_2"))
        .and(body_json(json!({ "versions": [1] })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let service = VaultService::new(config(&server), Arc::new(TokenAuth::new("vault_token".to_string())))
        .await
        .unwrap();

    service.insert("test_2", inserted_data.clone()).await.unwrap();
    assert_eq!(service.read::<TestData>("test_2").await.unwrap(), inserted_data);

    service.delete_permanent("test_2").await.unwrap();
    assert!(service.read::<TestData>("test_2").await.is_err());
}

#[tokio::test]
async fn healthcheck_file_lifecycle() {
    let server = MockServer::start().await;
    mount_lookup(&server, "vault_token", 1).await;

    Mock::given(method("POST"))
        .and(path("/v1/secret/data/healthcheck_file"))
        .and(body_json(json!({ "data": { "data": "health check file" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": version_metadata(1) })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/data/healthcheck_file"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "data": { "data": "health check file" }, "metadata": version_metadata(1) }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/metadata/healthcheck_file"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "versions": { "1": version_metadata(1) } }
        })))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/secret/delete/healthcheck_file"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/secret/destroy/healthcheck_file"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let service = VaultService::new(config(&server), Arc::new(TokenAuth::new("vault_token".to_string())))
        .await
        .unwrap();

    service.setup_healthcheck_file().await.unwrap();
    service.healthcheck().await.unwrap();
    service.clear_healthcheck_file().await.unwrap();
}

#[tokio::test]
async fn token_cache_file_is_shared_between_services() {
    let server = MockServer::start().await;
    mount_lookup(&server, "vault_token", 1).await;

    let dir = tempfile::tempdir().unwrap();
    let config = VaultConfig {
        token_cache_file: Some(dir.path().join("token.json").display().to_string()),
        ..config(&server)
    };

    let first = VaultService::new(config.clone(), Arc::new(TokenAuth::new("vault_token".to_string())))
        .await
        .unwrap();
    let second = VaultService::new(config, Arc::new(TokenAuth::new("vault_token".to_string())))
        .await
        .unwrap();

    assert_eq!(first.session().token().await, second.session().token().await);
}

#[tokio::test]
async fn declined_login_fails_service_creation() {
    let server = MockServer::start().await;

    let err = VaultService::new(config(&server), Arc::new(TokenAuth::new(String::new())))
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::Authentication(_)));
}

#[tokio::test]
async fn expired_session_is_renewed_transparently() {
    let now = 1_700_000_000;
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/auth/userpass/login/app"))
        .and(body_json(json!({ "password": "pw" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "auth": { "client_token": "s.fresh", "lease_duration": 3600, "renewable": true }
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_lookup(&server, "s.fresh", 1).await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/data/app"))
        .and(header(TOKEN_HEADER, "s.stale"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "errors": ["permission denied"] })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/data/app"))
        .and(header(TOKEN_HEADER, "s.fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "data": { "name": "app" }, "metadata": version_metadata(4) }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new(&server.uri(), Duration::from_secs(5)).unwrap();
    let session = SessionManager::new(Arc::new(transport))
        .with_clock(Arc::new(ManualClock::new(now)))
        .with_auth_method(Arc::new(UserPassAuth::userpass("app", "pw")));
    session
        .set_token(TokenRecord {
            auth: Some(AuthResult::new("s.stale", 300, true)),
            id: "tok-stale".to_string(),
            creation_time: now - 301,
            creation_ttl: 300,
            ..TokenRecord::default()
        })
        .await;

    let service = VaultService::with_session(Arc::new(session), "secret", "healthcheck_file").unwrap();
    let data = service.read::<TestData>("app").await.unwrap();

    assert_eq!(data.name, "app");
    let token = service.session().token().await.unwrap();
    assert_eq!(token.client_token(), Some("s.fresh"));
    assert_eq!(token.creation_time, now);
}
