//! Service-account authorization for the Sheets API
//!
//! Signs an RS256 assertion with the key file's private key and exchanges
//! it for a short-lived bearer token, cached until shortly before expiry.

use super::SheetsError;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;

const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the token actually expires
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Startup failures loading the service-account key file
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("credential file not found: {0}")]
    Missing(PathBuf),
    #[error("failed to read credential file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("credential file is not a valid service-account key: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid private key: {0}")]
    PrivateKey(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Clone, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: i64,
}

pub struct ServiceAccountAuth {
    http: Client,
    client_email: String,
    token_uri: String,
    algorithm: Algorithm,
    signing_key: EncodingKey,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    /// Load the key file. Absence or a malformed key is fatal at startup.
    pub fn from_file(path: &Path, http: Client) -> Result<Self, KeyError> {
        if !path.exists() {
            return Err(KeyError::Missing(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path).map_err(|source| KeyError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw, http)
    }

    fn from_json(raw: &str, http: Client) -> Result<Self, KeyError> {
        let key: ServiceAccountKey = serde_json::from_str(raw)?;
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
        Ok(Self {
            http,
            client_email: key.client_email,
            token_uri: key.token_uri,
            algorithm: Algorithm::RS256,
            signing_key,
            cached: Mutex::new(None),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    /// Mint a token eagerly so bad credentials surface at startup
    pub async fn authorize(&self) -> Result<(), SheetsError> {
        self.access_token().await.map(|_| ())
    }

    /// A valid bearer token, refreshed when close to expiry
    pub async fn access_token(&self) -> Result<String, SheetsError> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now().timestamp();

        if let Some(token) = cached.as_ref() {
            if token.expires_at - EXPIRY_MARGIN_SECS > now {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.exchange(now).await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    /// Drop the cached token so the next call mints a fresh one
    pub async fn invalidate(&self) {
        self.cached.lock().await.take();
    }

    fn sign_assertion(&self, now: i64) -> Result<String, SheetsError> {
        let claims = Claims {
            iss: &self.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&Header::new(self.algorithm), &claims, &self.signing_key)
            .map_err(|e| SheetsError::auth(format!("Failed to sign assertion: {e}")))
    }

    async fn exchange(&self, now: i64) -> Result<CachedToken, SheetsError> {
        let assertion = self.sign_assertion(now)?;

        let response = self
            .http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(SheetsError::from_transport)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SheetsError::network(format!("Failed to read token response: {e}")))?;

        if !status.is_success() {
            // The token endpoint reports bad keys as 400 invalid_grant
            return Err(match status.as_u16() {
                400 | 401 | 403 => SheetsError::auth(format!("Token exchange rejected: {body}")),
                _ => SheetsError::from_status(status, &body),
            });
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| SheetsError::unknown(format!("Failed to parse token response: {e}")))?;

        tracing::debug!(expires_in = token.expires_in, "Obtained Sheets access token");

        Ok(CachedToken {
            value: token.access_token,
            expires_at: now + token.expires_in,
        })
    }

    /// HMAC-signed stand-in; `token_uri` may point at a local server
    #[cfg(test)]
    pub fn for_tests(token_uri: &str) -> Self {
        Self {
            http: Client::builder().no_proxy().build().unwrap(),
            client_email: "bot@example.iam.gserviceaccount.com".to_string(),
            token_uri: token_uri.to_string(),
            algorithm: Algorithm::HS256,
            signing_key: EncodingKey::from_secret(b"test"),
            cached: Mutex::new(None),
        }
    }

    #[cfg(test)]
    pub async fn seed_token(&self, value: &str, expires_at: i64) {
        *self.cached.lock().await = Some(CachedToken {
            value: value.to_string(),
            expires_at,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_is_reported() {
        let err = ServiceAccountAuth::from_file(Path::new("/nonexistent/creds.json"), Client::new())
            .err()
            .unwrap();
        assert!(matches!(err, KeyError::Missing(_)));
    }

    #[test]
    fn test_malformed_file_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"client_email\": \"x\"}}").unwrap();

        let err = ServiceAccountAuth::from_file(file.path(), Client::new())
            .err()
            .unwrap();
        assert!(matches!(err, KeyError::Parse(_)));
    }

    #[test]
    fn test_bad_private_key_is_reported() {
        let raw = r#"{"client_email": "x@y", "private_key": "not a pem"}"#;
        let err = ServiceAccountAuth::from_json(raw, Client::new()).err().unwrap();
        assert!(matches!(err, KeyError::PrivateKey(_)));
    }

    #[tokio::test]
    async fn test_cached_token_is_reused() {
        let auth = ServiceAccountAuth::for_tests(DEFAULT_TOKEN_URI);
        auth.seed_token("cached-token", Utc::now().timestamp() + 3600)
            .await;

        assert_eq!(auth.access_token().await.unwrap(), "cached-token");
        assert_eq!(auth.client_email(), "bot@example.iam.gserviceaccount.com");
    }

    #[tokio::test]
    async fn test_invalidate_clears_cached_token() {
        let auth = ServiceAccountAuth::for_tests(DEFAULT_TOKEN_URI);
        auth.seed_token("cached-token", Utc::now().timestamp() + 3600)
            .await;

        auth.invalidate().await;
        assert!(auth.cached.lock().await.is_none());
    }
}
