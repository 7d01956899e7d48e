//! Core Twitter API utilities.
//!
//! This module contains the transport seam used by the like executor, the raw
//! response type it classifies, rate-limit header parsing, and helpers for
//! logging API output safely.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use thiserror::Error;

use crate::oauth::OAuthError;

/// Sanitizes text for safe logging by truncating and escaping control characters.
///
/// This function:
/// - Truncates long text to prevent log flooding
/// - Replaces control characters that could manipulate log output
/// - Escapes newlines to prevent log injection
///
/// # Parameters
///
/// - `text`: The text to sanitize
/// - `max_len`: Maximum length (in characters) before truncation
///
/// # Returns
///
/// A sanitized string safe for logging
pub(crate) fn sanitize_for_logging(text: &str, max_len: usize) -> String {
    let sanitized: String = text
        .chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            c if c.is_control() => '?',
            c => c,
        })
        .collect();

    if sanitized.chars().count() > max_len {
        let truncated: String = sanitized.chars().take(max_len).collect();
        format!(
            "{}... [truncated, {} total bytes]",
            truncated,
            text.len()
        )
    } else {
        sanitized
    }
}

/// Rate limit state reported by the Twitter API in response headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Maximum number of requests allowed in the window (`x-rate-limit-limit`)
    pub limit: Option<u32>,
    /// Remaining requests in the current window (`x-rate-limit-remaining`)
    pub remaining: Option<u32>,
    /// Unix timestamp when the window resets (`x-rate-limit-reset`)
    pub reset: Option<i64>,
}

impl RateLimitInfo {
    /// Parses rate limit info from response headers. Missing or malformed
    /// headers leave the corresponding field as `None`.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        fn header<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
        }

        Self {
            limit: header(headers, "x-rate-limit-limit"),
            remaining: header(headers, "x-rate-limit-remaining"),
            reset: header(headers, "x-rate-limit-reset"),
        }
    }

    /// True when the server reports no requests left in the current window.
    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    /// Seconds until the window resets, measured from now.
    pub fn seconds_until_reset(&self) -> Option<i64> {
        self.seconds_until_reset_from(Utc::now().timestamp())
    }

    /// Seconds until the window resets, measured from `now` (Unix seconds).
    /// Never negative; `None` if the server sent no reset time.
    pub fn seconds_until_reset_from(&self, now: i64) -> Option<i64> {
        self.reset.map(|reset| (reset - now).max(0))
    }
}

/// A raw HTTP response from the Twitter API, as seen by the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Rate limit headers attached to the response
    pub rate_limit: RateLimitInfo,
    /// Response body text (may be empty)
    pub body: String,
}

#[derive(Debug, Deserialize)]
struct TwitterErrorResponse {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    errors: Option<Vec<TwitterErrorEntry>>,
}

#[derive(Debug, Deserialize)]
struct TwitterErrorEntry {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LikeResponse {
    data: LikeData,
}

#[derive(Debug, Deserialize)]
struct LikeData {
    liked: bool,
}

impl ApiResponse {
    /// Creates a response with no rate limit headers.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            rate_limit: RateLimitInfo::default(),
            body: body.into(),
        }
    }

    /// Attaches rate limit headers.
    pub fn with_rate_limit(mut self, rate_limit: RateLimitInfo) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Reads status, rate limit headers and body from a reqwest response.
    pub(crate) async fn read(response: reqwest::Response) -> Result<Self, TransportError> {
        let status = response.status().as_u16();
        let rate_limit = RateLimitInfo::from_headers(response.headers());
        let body = response.text().await?;
        Ok(Self {
            status,
            rate_limit,
            body,
        })
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The `data.liked` flag of a like response, if the body carries one.
    pub fn liked(&self) -> Option<bool> {
        serde_json::from_str::<LikeResponse>(&self.body)
            .ok()
            .map(|r| r.data.liked)
    }

    /// A short human-readable description of an error response.
    ///
    /// Prefers the API's `detail`, then `title`, then the first `errors[].message`,
    /// falling back to the HTTP status.
    pub fn error_detail(&self) -> String {
        let parsed: Option<TwitterErrorResponse> = serde_json::from_str(&self.body).ok();
        let message = parsed.and_then(|r| {
            r.detail.or(r.title).or_else(|| {
                r.errors
                    .and_then(|errors| errors.into_iter().find_map(|e| e.message))
            })
        });

        match message {
            Some(message) => format!(
                "HTTP {}: {}",
                self.status,
                sanitize_for_logging(&message, 200)
            ),
            None => format!("HTTP {}", self.status),
        }
    }
}

/// Transport-level failures: the request never produced an HTTP response.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request timed out
    #[error("request timed out: {0}")]
    Timeout(String),

    /// DNS failure, refused or reset connection, or a broken response stream
    #[error("connection failed: {0}")]
    Connection(String),

    /// The request could not be built or was rejected locally
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The request could not be signed
    #[error("OAuth signing failed: {0}")]
    Signing(#[from] OAuthError),
}

impl TransportError {
    /// True for network-level failures that may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Connection(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_builder() || e.is_redirect() || e.is_status() {
            Self::InvalidRequest(e.to_string())
        } else {
            Self::Connection(e.to_string())
        }
    }
}

/// The network seam of the like executor.
///
/// One call is one network attempt: implementations sign and send the like
/// request and return whatever HTTP response came back. Retry and
/// classification live in the executor.
#[async_trait]
pub trait LikeTransport: Send + Sync {
    /// Sends one like request for `tweet_id`.
    async fn send_like(&self, tweet_id: &str) -> Result<ApiResponse, TransportError>;
}
