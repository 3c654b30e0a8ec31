mod app;
mod auth;
mod config;
mod firebase;
mod handlers;
mod models;
mod push_id;
mod sink;
mod state;

use relay_common::{bind_listener, init_tracing, shutdown_signal};
use std::{process::ExitCode, sync::Arc};

use crate::auth::{Credential, ServiceAccountKey, TokenSource};
use crate::config::{CredentialSource, FirebaseConfig, RelayConfig, SinkKind};
use crate::firebase::FirebaseSink;
use crate::sink::{DataSink, MemorySink, SinkError};
use crate::state::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    let _guards = init_tracing("relay-service");

    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let sink = match build_sink(&config) {
        Ok(sink) => sink,
        Err(err) => {
            tracing::error!(error = %err, "data sink init failed");
            return ExitCode::FAILURE;
        }
    };

    let app = app::build_router(AppState::new(sink));
    let listener = match bind_listener(config.port).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, port = config.port, "bind listener failed");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(port = config.port, "server running");

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %err, "server error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn build_sink(config: &RelayConfig) -> Result<Arc<dyn DataSink>, SinkError> {
    match config.sink {
        SinkKind::Memory => {
            tracing::warn!(
                capacity = config.memory_capacity,
                "using in-memory sink, records are lost on exit"
            );
            Ok(Arc::new(MemorySink::with_capacity(config.memory_capacity)))
        }
        SinkKind::Firebase => {
            let firebase = &config.firebase;
            let credential = build_credential(firebase)?;
            tracing::info!(
                database_url = %firebase.database_url,
                parent_path = %firebase.parent_path,
                "firebase sink configured"
            );
            Ok(Arc::new(FirebaseSink::new(
                &firebase.database_url,
                &firebase.parent_path,
                credential,
            )))
        }
    }
}

fn build_credential(firebase: &FirebaseConfig) -> Result<Credential, SinkError> {
    match &firebase.credential {
        CredentialSource::DatabaseSecret(secret) => Ok(Credential::DatabaseSecret(secret.clone())),
        CredentialSource::ServiceAccountFile(path) => {
            let key = ServiceAccountKey::from_file(path)?;
            tracing::info!(
                client_email = %key.client_email,
                project_id = key.project_id.as_deref().unwrap_or("unknown"),
                "loaded service account"
            );
            Ok(Credential::ServiceAccount(TokenSource::new(key)?))
        }
    }
}
