//! OAuth authentication module for Twitter/X API integration.
//!
//! This module implements OAuth 1.0a User Context request signing (HMAC-SHA1),
//! the one-legged scheme Twitter accepts for user-specific write operations such
//! as liking a tweet. Signing performs no network I/O.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use log::debug;
use sha1::Sha1;
use thiserror::Error;
use url::Url;

use crate::config::Credentials;

type HmacSha1 = Hmac<Sha1>;

/// The length of the random nonce in bytes (128 bits, hex-encoded on the wire)
const NONCE_LENGTH: usize = 16;

/// Errors produced while building an OAuth 1.0a Authorization header.
#[derive(Debug, Error)]
pub enum OAuthError {
    /// The HTTP method or URL was empty or otherwise unusable
    #[error("invalid request for signing: {0}")]
    InvalidRequest(String),

    /// The target URL could not be parsed
    #[error("invalid URL for signing: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The operating system could not provide randomness for the nonce
    #[error("failed to generate OAuth nonce: {0}")]
    Nonce(String),

    /// The HMAC key could not be initialised
    #[error("failed to compute OAuth signature: {0}")]
    Signature(String),
}

/// OAuth 1.0a signer for Twitter API requests.
///
/// Holds the complete, validated credential set. Every call to
/// [`OAuthSigner::authorization_header`] uses a fresh timestamp and nonce, so the
/// server never sees the same signature twice.
#[derive(Debug, Clone)]
pub struct OAuthSigner {
    credentials: Credentials,
}

impl OAuthSigner {
    /// Creates a signer from a validated credential set.
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    /// Builds the Authorization header value for one request.
    ///
    /// # Parameters
    ///
    /// - `method`: HTTP method (`GET`, `POST`, ...)
    /// - `url`: Full target URL; any query parameters are included in the signature
    /// - `params`: Additional form parameters to sign (JSON bodies are never signed)
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: A header value of the form `OAuth oauth_consumer_key="...", ...`
    /// - `Err(OAuthError)`: If the request is malformed or randomness is unavailable
    pub fn authorization_header(
        &self,
        method: &str,
        url: &str,
        params: &[(String, String)],
    ) -> Result<String, OAuthError> {
        let nonce = generate_nonce()?;
        let timestamp = Utc::now().timestamp().to_string();
        self.authorization_header_with(method, url, params, &nonce, &timestamp)
    }

    /// Builds the Authorization header with an explicit nonce and timestamp.
    ///
    /// Deterministic for fixed inputs. Production code goes through
    /// [`OAuthSigner::authorization_header`].
    pub fn authorization_header_with(
        &self,
        method: &str,
        url: &str,
        params: &[(String, String)],
        nonce: &str,
        timestamp: &str,
    ) -> Result<String, OAuthError> {
        if method.trim().is_empty() {
            return Err(OAuthError::InvalidRequest("HTTP method is empty".into()));
        }
        if url.trim().is_empty() {
            return Err(OAuthError::InvalidRequest("URL is empty".into()));
        }

        let parsed = Url::parse(url)?;
        let base_url = signature_base_url(&parsed);

        let mut oauth_params = vec![
            (
                "oauth_consumer_key".to_string(),
                self.credentials.consumer_key().to_string(),
            ),
            ("oauth_nonce".to_string(), nonce.to_string()),
            (
                "oauth_signature_method".to_string(),
                "HMAC-SHA1".to_string(),
            ),
            ("oauth_timestamp".to_string(), timestamp.to_string()),
            (
                "oauth_token".to_string(),
                self.credentials.access_token().to_string(),
            ),
            ("oauth_version".to_string(), "1.0".to_string()),
        ];

        // Signed parameters: oauth_* plus query string plus form parameters
        let mut signed: Vec<(String, String)> = oauth_params
            .iter()
            .cloned()
            .chain(
                parsed
                    .query_pairs()
                    .map(|(k, v)| (k.into_owned(), v.into_owned())),
            )
            .chain(params.iter().cloned())
            .map(|(k, v)| (percent_encode(&k), percent_encode(&v)))
            .collect();
        signed.sort();

        let param_string = signed
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let base_string = format!(
            "{}&{}&{}",
            method.to_uppercase(),
            percent_encode(&base_url),
            percent_encode(&param_string)
        );
        debug!("OAuth signature base string length: {}", base_string.len());

        let signing_key = format!(
            "{}&{}",
            percent_encode(self.credentials.consumer_secret()),
            percent_encode(self.credentials.access_token_secret())
        );

        let signature = hmac_sha1(&signing_key, &base_string)?;
        oauth_params.push(("oauth_signature".to_string(), signature));
        oauth_params.sort();

        let header = oauth_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(format!("OAuth {}", header))
    }
}

/// Scheme, host, non-default port and path; no query or fragment.
fn signature_base_url(url: &Url) -> String {
    let mut base = url.clone();
    base.set_query(None);
    base.set_fragment(None);
    base.to_string()
}

/// Percent-encodes per RFC 3986 (only `A-Z a-z 0-9 - . _ ~` pass through).
fn percent_encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

fn generate_nonce() -> Result<String, OAuthError> {
    let mut bytes = [0u8; NONCE_LENGTH];
    getrandom::getrandom(&mut bytes).map_err(|e| OAuthError::Nonce(e.to_string()))?;
    Ok(hex::encode(bytes))
}

/// Computes HMAC-SHA1 and returns the base64-encoded digest.
fn hmac_sha1(key: &str, data: &str) -> Result<String, OAuthError> {
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| OAuthError::Signature(e.to_string()))?;
    mac.update(data.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}
