//! OAuth token handling for GBDX.
//!
//! Tokens come from the password grant at [`TOKEN_PATH`], authenticated with
//! the client id/secret pair. A [`TokenCache`] keeps the last good token on
//! disk so repeated runs do not have to log in again until it expires.

use crate::{Error, Result, client::endpoint};
use chrono::{DateTime, TimeDelta, Utc};
use core::fmt;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Path of the OAuth token endpoint, relative to the API base URL.
pub const TOKEN_PATH: &str = "/auth/v1/oauth/token/";

/// Tokens this close to expiry are treated as already expired.
const EXPIRY_LEEWAY_SECS: i64 = 60;

/// Everything the password grant needs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    /// Builds credentials from optionally configured parts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCredentials`] naming the first absent field.
    pub fn from_parts(
        username: Option<String>,
        password: Option<String>,
        client_id: Option<String>,
        client_secret: Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            username: required(username, "username")?,
            password: required(password, "password")?,
            client_id: required(client_id, "client_id")?,
            client_secret: required(client_secret, "client_secret")?,
        })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(Error::MissingCredentials { field })
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// An OAuth access token as stored in the cache.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default = "bearer")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

fn bearer() -> String {
    "Bearer".to_string()
}

impl Token {
    /// Whether the token is expired (or about to be) at `now`. Tokens without
    /// an expiry never expire.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry
            .is_some_and(|expiry| expiry - TimeDelta::seconds(EXPIRY_LEEWAY_SECS) <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "bearer")]
    token_type: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Requests a fresh token with the OAuth password grant.
///
/// # Errors
///
/// Returns [`Error::Http`] on transport failures and [`Error::Api`] if the
/// token endpoint rejects the credentials.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(user = %credentials.username)))]
pub async fn fetch_token(
    http: &reqwest::Client,
    base_url: &str,
    credentials: &Credentials,
) -> Result<Token> {
    let response = http
        .post(endpoint(base_url, TOKEN_PATH))
        .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
        .form(&[
            ("grant_type", "password"),
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
        ])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(Error::Api {
            status: status.as_u16(),
            message: message.trim().to_string(),
        });
    }

    let body: TokenResponse = response.json().await?;
    #[cfg(feature = "tracing")]
    tracing::debug!("Obtained new access token");

    Ok(Token {
        access_token: body.access_token,
        token_type: body.token_type,
        refresh_token: body.refresh_token,
        expiry: body
            .expires_in
            .map(|secs| Utc::now() + TimeDelta::seconds(secs)),
    })
}

/// On-disk cache holding a single [`Token`] as JSON.
#[derive(Clone, Debug)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the cached token. A missing cache file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TokenCache`] if the file exists but cannot be read and
    /// [`Error::Json`] if it does not hold a token.
    pub async fn load(&self) -> Result<Option<Token>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(self.io_error(source)),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Writes `token` to the cache, creating parent directories as needed.
    ///
    /// On unix the file is only readable by its owner.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TokenCache`] if the file cannot be written.
    pub async fn store(&self, token: &Token) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let bytes = serde_json::to_vec_pretty(token)?;
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|e| self.io_error(e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| self.io_error(e))?;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("Cached access token at {}", self.path.display());
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> Error {
        Error::TokenCache {
            path: self.path.clone(),
            source,
        }
    }
}

/// Returns a usable token, preferring an unexpired cached one.
///
/// `credentials` is only consulted when the cache is empty or stale, so a
/// valid cached token lets a run proceed without any configured credentials.
///
/// # Errors
///
/// Propagates cache read failures, missing credentials, and token endpoint
/// failures.
pub async fn authenticate<F>(
    http: &reqwest::Client,
    base_url: &str,
    cache: &TokenCache,
    credentials: F,
) -> Result<Token>
where
    F: FnOnce() -> Result<Credentials>,
{
    if let Some(token) = cache.load().await? {
        if !token.is_expired() {
            #[cfg(feature = "tracing")]
            tracing::debug!("Using cached access token from {}", cache.path().display());
            return Ok(token);
        }
        #[cfg(feature = "tracing")]
        tracing::info!("Cached access token expired, requesting a new one");
    }

    fetch_token(http, base_url, &credentials()?).await
}
