//! Google service-account OAuth: signed JWT assertion → bearer token.

use chrono::{DateTime, Utc};
use gapmatch_core::error::{GapMatchError, Result};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// The fields of a service-account key file that the token exchange needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.into()
}

/// Claims Google expects in a service-account assertion.
#[derive(Debug, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            GapMatchError::Config(format!("Cannot read credentials {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| GapMatchError::Config(format!("Invalid service-account key: {e}")))
    }

    /// RS256-signed assertion for the given scopes, valid for one hour from `now`.
    pub fn assertion(&self, scopes: &[&str], now: DateTime<Utc>) -> Result<String> {
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| GapMatchError::Config(format!("Invalid private key: {e}")))?;

        let iat = now.timestamp();
        let claims = AssertionClaims {
            iss: self.client_email.clone(),
            scope: scopes.join(" "),
            aud: self.token_uri.clone(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| GapMatchError::Config(format!("JWT signing failed: {e}")))
    }

    /// Exchange a fresh assertion for an access token.
    pub async fn access_token(
        &self,
        http: &reqwest::Client,
        scopes: &[&str],
        timeout: Duration,
    ) -> Result<String> {
        let assertion = self.assertion(scopes, Utc::now())?;
        let resp = http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| GapMatchError::SourceUnavailable(format!("Google token: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(GapMatchError::SourceUnavailable(format!(
                "Google token {status}: {body}"
            )));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| GapMatchError::SourceUnavailable(format!("Google token: {e}")))?;
        tracing::debug!("🔑 Google access token issued for {}", self.client_email);
        Ok(token.access_token)
    }
}
