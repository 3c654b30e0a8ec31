use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::{
    path::Path,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};
use tokio::sync::Mutex;

use crate::sink::SinkError;

const DATABASE_SCOPES: &str =
    "https://www.googleapis.com/auth/firebase.database https://www.googleapis.com/auth/userinfo.email";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: u64 = 3600;
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Subset of a Google service account key file needed to mint access tokens.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self, SinkError> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            SinkError::Credential(format!("read {} failed: {err}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|err| {
            SinkError::Credential(format!("parse {} failed: {err}", path.display()))
        })
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    ASSERTION_LIFETIME_SECS
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// How requests to the database are authorized.
pub enum Credential {
    /// OAuth2 access token minted from a service account, sent as `access_token`.
    ServiceAccount(TokenSource),
    /// Legacy database secret or Firebase ID token, sent as `auth`.
    DatabaseSecret(String),
}

impl Credential {
    /// Query parameter carrying the credential for one request.
    pub async fn query_param(
        &self,
        http: &reqwest::Client,
    ) -> Result<(&'static str, String), SinkError> {
        match self {
            Credential::ServiceAccount(source) => {
                Ok(("access_token", source.access_token(http).await?))
            }
            Credential::DatabaseSecret(secret) => Ok(("auth", secret.clone())),
        }
    }
}

/// Caches the access token and refreshes it shortly before expiry.
pub struct TokenSource {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    pub fn new(key: ServiceAccountKey) -> Result<Self, SinkError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|err| SinkError::Credential(format!("invalid private key: {err}")))?;
        Ok(Self {
            key,
            encoding_key,
            cached: Mutex::new(None),
        })
    }

    pub async fn access_token(&self, http: &reqwest::Client) -> Result<String, SinkError> {
        // Holding the lock across the refresh keeps concurrent requests from
        // minting duplicate tokens.
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + REFRESH_MARGIN {
                return Ok(token.value.clone());
            }
        }

        let assertion = self.sign_assertion()?;
        let response = http
            .post(self.key.token_uri.as_str())
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Credential(format!(
                "token exchange failed with {status}: {body}"
            )));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|err| SinkError::Credential(format!("decode token response failed: {err}")))?;

        tracing::debug!(
            client_email = %self.key.client_email,
            expires_in = token.expires_in,
            "refreshed database access token"
        );
        let expires_at = Instant::now()
            .checked_add(Duration::from_secs(token.expires_in))
            .ok_or_else(|| {
                SinkError::Credential(format!("token lifetime out of range: {}", token.expires_in))
            })?;
        let value = token.access_token.clone();
        *cached = Some(CachedToken {
            value: token.access_token,
            expires_at,
        });
        Ok(value)
    }

    fn sign_assertion(&self) -> Result<String, SinkError> {
        let iat = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: DATABASE_SCOPES,
            aud: &self.key.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|err| SinkError::Credential(format!("sign assertion failed: {err}")))
    }
}
