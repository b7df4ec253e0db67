// src/services/google_oauth.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::Mutex;

pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// The subset of a Google service account JSON key we need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    scope: String,
    aud: String,
    exp: i64,
    iat: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    // stale one minute before expiry
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::minutes(1) < self.expires_at
    }
}

/// Exchanges a signed service-account JWT for bearer tokens and caches the
/// result until shortly before it expires.
pub struct ServiceAccountAuth {
    key: ServiceAccountKey,
    scope: String,
    client: Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    pub fn new(key: ServiceAccountKey, scope: &str) -> Self {
        Self {
            key,
            scope: scope.to_string(),
            client: Client::new(),
            cached: Mutex::new(None),
        }
    }

    pub fn from_file(path: &Path, scope: &str) -> Result<Self> {
        let json_bytes = std::fs::read(path)
            .with_context(|| format!("reading service account key {}", path.display()))?;
        let key: ServiceAccountKey = serde_json::from_slice(&json_bytes)
            .with_context(|| format!("parsing service account key {}", path.display()))?;
        info!("Loaded service account {}", key.client_email);
        Ok(Self::new(key, scope))
    }

    pub async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.access_token.clone());
        }

        debug!("Requesting new access token for {}", self.key.client_email);
        let token = self.exchange(now).await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    async fn exchange(&self, now: DateTime<Utc>) -> Result<CachedToken> {
        let jwt = build_assertion(&self.key, &self.scope, now)?;

        #[derive(Debug, Serialize)]
        struct TokenRequest<'a> {
            grant_type: &'a str,
            assertion: &'a str,
        }

        #[derive(Debug, Deserialize)]
        struct TokenResponse {
            access_token: String,
            expires_in: i64,
        }

        let resp = self
            .client
            .post(&self.key.token_uri)
            .form(&TokenRequest {
                grant_type: "urn:ietf:params:oauth:grant-type:jwt-bearer",
                assertion: &jwt,
            })
            .send()
            .await
            .context("contacting token endpoint")?
            .error_for_status()
            .context("token endpoint rejected the assertion")?
            .json::<TokenResponse>()
            .await
            .context("decoding token response")?;

        Ok(CachedToken {
            access_token: resp.access_token,
            expires_at: now + Duration::seconds(resp.expires_in),
        })
    }
}

/// Signs the RS256 JWT that is traded for an access token.
fn build_assertion(key: &ServiceAccountKey, scope: &str, now: DateTime<Utc>) -> Result<String> {
    let claims = Claims {
        iss: key.client_email.clone(),
        scope: scope.to_string(),
        aud: key.token_uri.clone(),
        exp: (now + Duration::minutes(59)).timestamp(),
        iat: now.timestamp(),
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .context("service account private key is not a valid RSA PEM")?;
    Ok(encode(&header, &claims, &encoding_key)?)
}
