//! Service account authentication for Google APIs using the OAuth2
//! JWT bearer grant.
//!
//! A signed assertion is exchanged at the key's `token_uri` for a
//! short-lived access token. Tokens are cached and reused until
//! shortly before they expire.

use std::fs;

use anyhow::{Context, Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Read/write access to calendars and events
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_TTL_SECS: i64 = 3600;
// Refresh this many seconds before the token actually expires
const EXPIRY_MARGIN_SECS: i64 = 60;

fn default_token_uri() -> String {
    String::from("https://oauth2.googleapis.com/token")
}

/// The subset of a Google service account JSON key file that is
/// needed to mint access tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    pub fn from_file(path: &str) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read service account credentials at {}", path))?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        let key: ServiceAccountKey =
            serde_json::from_str(json).context("Malformed service account credentials")?;
        Ok(key)
    }
}

/// Anything that can hand out a bearer token for API calls.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, Error>;
}

/// A pre-issued token, used as-is.
pub struct StaticToken(pub String);

#[async_trait]
impl AccessTokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String, Error> {
        Ok(self.0.clone())
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

struct CachedToken {
    access_token: String,
    expires_at: i64,
}

pub struct ServiceAccountAuth {
    client_email: String,
    key_id: Option<String>,
    encoding_key: EncodingKey,
    token_uri: String,
    scope: String,
    http: Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    /// Fails if the private key can't be parsed so that bad
    /// credentials are caught at startup rather than on the first
    /// request.
    pub fn new(key: ServiceAccountKey, scopes: &[&str]) -> Result<Self, Error> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .context("Invalid private key in service account credentials")?;

        Ok(Self {
            client_email: key.client_email,
            key_id: key.private_key_id,
            encoding_key,
            token_uri: key.token_uri,
            scope: scopes.join(" "),
            http: Client::new(),
            cached: Mutex::new(None),
        })
    }

    fn assertion(&self, now: i64) -> Result<String, Error> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key_id.clone();
        let claims = Claims {
            iss: &self.client_email,
            scope: &self.scope,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_TTL_SECS,
        };
        let token = jsonwebtoken::encode(&header, &claims, &self.encoding_key)?;
        Ok(token)
    }

    async fn fetch_token(&self, now: i64) -> Result<CachedToken, Error> {
        let assertion = self.assertion(now)?;
        let res = self
            .http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)])
            .send()
            .await?;
        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        if !status.is_success() {
            anyhow::bail!("Token exchange failed: {} ({})", status, text);
        }
        let token: TokenResponse = serde_json::from_str(&text)?;

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: now + token.expires_in,
        })
    }
}

#[async_trait]
impl AccessTokenProvider for ServiceAccountAuth {
    async fn access_token(&self) -> Result<String, Error> {
        let now = Utc::now().timestamp();
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref()
            && token.expires_at - EXPIRY_MARGIN_SECS > now
        {
            return Ok(token.access_token.clone());
        }

        tracing::debug!("Fetching access token for {}", self.client_email);
        let token = self.fetch_token(now).await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);

        Ok(access_token)
    }
}
