use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::{
    select,
    signal::unix::{signal, SignalKind},
};
use vault_session::{auth::TokenAuth, config::VaultConfig, service::VaultService};

#[derive(Serialize, Deserialize, Clone)]
struct MySpecialToken {
    special_data: String,
}

/// Manually configure Vault service
async fn manual_config() -> VaultService {
    let config = VaultConfig {
        address: "http://localhost:8200".to_string(),
        mount_path: "secret".to_string(),
        client_timeout: std::time::Duration::from_secs(10),
        healthcheck_file_path: "/healthcheck".to_string(),
        token_cache_file: None,
    };
    VaultService::new(config, Arc::new(TokenAuth::new("some_token".to_string())))
        .await
        .unwrap()
}

/// Configure Vault service from environment variables
async fn env_config() -> VaultService {
    std::env::set_var("VAULT_ADDR", "http://127.0.0.1:8200");
    std::env::set_var("VAULT_TOKEN", "vault_token");
    std::env::set_var("VAULT_AUTH_METHOD", "Token");
    VaultService::from_env().await.unwrap()
}

#[tokio::main]
async fn main() {
    let vault_service = match std::env::args().nth(1).as_deref() {
        Some("--manual") => manual_config().await,
        _ => env_config().await,
    };

    if let Some(token) = vault_service.session().token().await {
        println!("logged in, token accessor {}", token.accessor);
    }

    // Do some stuff here. An expired token is replaced on the first 403.
    {
        let my_data = MySpecialToken {
            special_data: "incredibly secret data".to_string(),
        };

        vault_service.insert("MySuperToken", my_data.clone()).await.unwrap();

        let x: MySpecialToken = vault_service.read("MySuperToken").await.unwrap();

        if x.special_data != my_data.special_data {
            println!("inserted data does not match with the saved one");
        } else {
            println!("example scenario succeeded");
        }
    };

    let mut sigterm = signal(SignalKind::terminate()).unwrap();
    let mut sigint = signal(SignalKind::interrupt()).unwrap();

    select! {
        _ = sigterm.recv() => println!("Sigterm received"),
        _ = sigint.recv() => println!("Sigint received"),
    }

    vault_service.delete_permanent("MySuperToken").await.unwrap();
    println!("Vault example shut down gracefully");
}
