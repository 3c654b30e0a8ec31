use relay_common::env_or;
use std::{path::PathBuf, str::FromStr};
use thiserror::Error;

use crate::sink::DEFAULT_MEMORY_CAPACITY;

pub const DEFAULT_DATABASE_URL: &str = "https://mcm-dashboard-97482-default-rtdb.firebaseio.com";
pub const DEFAULT_PARENT_PATH: &str = "arduinoData";
pub const DEFAULT_SERVICE_ACCOUNT: &str = "./firebase-service-account.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown RELAY_SINK value {0:?}, expected \"firebase\" or \"memory\"")]
    UnknownSink(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinkKind {
    Firebase,
    Memory,
}

impl FromStr for SinkKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "firebase" => Ok(SinkKind::Firebase),
            "memory" => Ok(SinkKind::Memory),
            _ => Err(ConfigError::UnknownSink(value.to_string())),
        }
    }
}

#[derive(Clone, Debug)]
pub enum CredentialSource {
    ServiceAccountFile(PathBuf),
    DatabaseSecret(String),
}

#[derive(Clone, Debug)]
pub struct FirebaseConfig {
    pub database_url: String,
    pub parent_path: String,
    pub credential: CredentialSource,
}

#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub port: u16,
    pub sink: SinkKind,
    pub memory_capacity: usize,
    pub firebase: FirebaseConfig,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), env_or("PORT", 3000u16))
    }

    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        port: u16,
    ) -> Result<Self, ConfigError> {
        let sink = match lookup("RELAY_SINK") {
            Some(value) => value.parse()?,
            None => SinkKind::Firebase,
        };
        let memory_capacity = lookup("MEMORY_SINK_CAPACITY")
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MEMORY_CAPACITY);

        // A database secret wins over the key file when both are present.
        let credential = match lookup("FIREBASE_DATABASE_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => CredentialSource::DatabaseSecret(secret),
            None => CredentialSource::ServiceAccountFile(PathBuf::from(
                lookup("FIREBASE_SERVICE_ACCOUNT")
                    .unwrap_or_else(|| DEFAULT_SERVICE_ACCOUNT.to_string()),
            )),
        };

        Ok(Self {
            port,
            sink,
            memory_capacity,
            firebase: FirebaseConfig {
                database_url: lookup("FIREBASE_DATABASE_URL")
                    .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
                parent_path: lookup("FIREBASE_PARENT_PATH")
                    .unwrap_or_else(|| DEFAULT_PARENT_PATH.to_string()),
                credential,
            },
        })
    }
}
