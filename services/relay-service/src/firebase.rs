use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;

use crate::auth::Credential;
use crate::sink::{DataSink, SinkError};

/// Body Firebase answers a REST `POST` with: the generated child key.
#[derive(Deserialize)]
struct PushResponse {
    name: String,
}

/// Appends records under one parent path of a Firebase Realtime Database
/// through its REST API.
pub struct FirebaseSink {
    http: reqwest::Client,
    credential: Credential,
    push_url: String,
}

impl FirebaseSink {
    pub fn new(database_url: &str, parent_path: &str, credential: Credential) -> Self {
        Self {
            http: reqwest::Client::new(),
            credential,
            push_url: push_url(database_url, parent_path),
        }
    }
}

fn push_url(database_url: &str, parent_path: &str) -> String {
    format!(
        "{}/{}.json",
        database_url.trim_end_matches('/'),
        parent_path.trim_matches('/')
    )
}

#[async_trait]
impl DataSink for FirebaseSink {
    async fn push(&self, value: serde_json::Value) -> Result<String, SinkError> {
        let body = serde_json::to_vec(&value)?;
        let (param, token) = self.credential.query_param(&self.http).await?;

        let response = self
            .http
            .post(self.push_url.as_str())
            .query(&[(param, token.as_str())])
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Status { status, body });
        }

        let text = response.text().await?;
        let pushed: PushResponse = serde_json::from_str(&text)
            .map_err(|err| SinkError::InvalidResponse(format!("{err}: {text}")))?;
        if pushed.name.is_empty() {
            return Err(SinkError::InvalidResponse("empty key".to_string()));
        }
        Ok(pushed.name)
    }
}
