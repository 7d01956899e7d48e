//! Configuration module for the tweet-liker tool.
//!
//! This module contains the credential and runtime configuration structures and
//! the environment variable handling that populates them. Configuration is loaded
//! once at startup and passed explicitly into the signer and the executor.

use log::{debug, error, info, warn};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::executor::RetryPolicy;

pub const CONSUMER_KEY_VAR: &str = "CONSUMER_KEY";
pub const CONSUMER_SECRET_VAR: &str = "CONSUMER_SECRET";
pub const ACCESS_TOKEN_VAR: &str = "ACCESS_TOKEN";
pub const ACCESS_TOKEN_SECRET_VAR: &str = "ACCESS_TOKEN_SECRET";

pub const API_BASE_URL_VAR: &str = "TWITTER_API_BASE_URL";
pub const CACHE_PATH_VAR: &str = "LIKED_TWEETS_CACHE";
pub const MAX_ATTEMPTS_VAR: &str = "LIKE_MAX_ATTEMPTS";
pub const BASE_DELAY_VAR: &str = "LIKE_BASE_DELAY_MS";
pub const MAX_DELAY_VAR: &str = "LIKE_MAX_DELAY_MS";
pub const TIMEOUT_VAR: &str = "LIKE_TIMEOUT_SECS";
pub const RETRY_SERVER_ERRORS_VAR: &str = "LIKE_RETRY_SERVER_ERRORS";

const DEFAULT_API_BASE_URL: &str = "https://api.x.com";
const DEFAULT_CACHE_PATH: &str = "liked_tweets.txt";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors raised while loading configuration. All of them are fatal and are
/// reported before any network request is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing {0} environment variable")]
    MissingVar(&'static str),

    #[error("{0} cannot be empty")]
    EmptyVar(&'static str),

    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

/// The four OAuth 1.0a User Context secrets.
///
/// Construction validates that every field is present and non-empty, so any
/// `Credentials` value handed to the signer is complete. The `Debug` impl
/// never prints the secrets.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    consumer_key: String,
    consumer_secret: String,
    access_token: String,
    access_token_secret: String,
}

impl Credentials {
    /// Creates a validated credential set.
    ///
    /// # Returns
    ///
    /// - `Ok(Credentials)`: If all four values are non-empty
    /// - `Err(ConfigError::EmptyVar)`: Naming the first empty value
    pub fn new(
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        access_token: impl Into<String>,
        access_token_secret: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let credentials = Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            access_token: access_token.into(),
            access_token_secret: access_token_secret.into(),
        };

        for (name, value) in [
            (CONSUMER_KEY_VAR, &credentials.consumer_key),
            (CONSUMER_SECRET_VAR, &credentials.consumer_secret),
            (ACCESS_TOKEN_VAR, &credentials.access_token),
            (ACCESS_TOKEN_SECRET_VAR, &credentials.access_token_secret),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyVar(name));
            }
        }

        Ok(credentials)
    }

    pub fn consumer_key(&self) -> &str {
        &self.consumer_key
    }

    pub fn consumer_secret(&self) -> &str {
        &self.consumer_secret
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn access_token_secret(&self) -> &str {
        &self.access_token_secret
    }

    /// The numeric user ID encoded in the access token (`<user_id>-<rest>`).
    ///
    /// Returns `None` when the token does not follow that layout.
    pub fn user_id_hint(&self) -> Option<&str> {
        let (prefix, _) = self.access_token.split_once('-')?;
        if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_digit()) {
            Some(prefix)
        } else {
            None
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &mask_secret(&self.consumer_key))
            .field("consumer_secret", &"[REDACTED]")
            .field("access_token", &mask_secret(&self.access_token))
            .field("access_token_secret", &"[REDACTED]")
            .finish()
    }
}

/// Loads variables from a `.env` file in the working directory or one of its parents.
///
/// Variables already present in the process environment keep their values.
/// Returns the path of the file that was loaded, if any.
pub fn load_dotenv() -> Option<PathBuf> {
    report_dotenv(dotenvy::dotenv())
}

/// Loads variables from the `.env` file at `path` without overriding the process environment.
pub fn load_dotenv_from(path: &Path) -> Option<PathBuf> {
    report_dotenv(dotenvy::from_path(path).map(|()| path.to_path_buf()))
}

fn report_dotenv(result: Result<PathBuf, dotenvy::Error>) -> Option<PathBuf> {
    match result {
        Ok(path) => {
            info!("Loaded environment from {}", path.display());
            Some(path)
        }
        Err(e) if e.not_found() => {
            debug!("No .env file found, using the process environment only");
            None
        }
        Err(e) => {
            warn!("Ignoring unreadable .env file: {}", e);
            None
        }
    }
}

/// Runtime configuration for one invocation of the tool.
#[derive(Debug, Clone)]
pub struct TwitterConfig {
    /// OAuth 1.0a User Context credentials
    pub credentials: Credentials,
    /// Base URL of the Twitter API v2 (default: https://api.x.com)
    pub api_base_url: Url,
    /// Location of the liked-tweets cache file
    pub cache_path: PathBuf,
    /// Retry and backoff schedule for the like request
    pub retry: RetryPolicy,
    /// Per-request timeout
    pub timeout: Duration,
    /// Whether 5xx responses are retried like network failures
    pub retry_server_errors: bool,
}

impl TwitterConfig {
    /// Creates a new `TwitterConfig` by loading values from the process environment.
    ///
    /// # Required Environment Variables
    ///
    /// - `CONSUMER_KEY`, `CONSUMER_SECRET`, `ACCESS_TOKEN`, `ACCESS_TOKEN_SECRET`
    ///
    /// # Optional Environment Variables
    ///
    /// - `TWITTER_API_BASE_URL`: API base URL (default `https://api.x.com`)
    /// - `LIKED_TWEETS_CACHE`: cache file path (default `liked_tweets.txt`)
    /// - `LIKE_MAX_ATTEMPTS`: total attempts per like (default 3)
    /// - `LIKE_BASE_DELAY_MS` / `LIKE_MAX_DELAY_MS`: backoff bounds (default 2000 / 10000)
    /// - `LIKE_TIMEOUT_SECS`: request timeout (default 30)
    /// - `LIKE_RETRY_SERVER_ERRORS`: retry 5xx responses (default false)
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use tweet_liker::TwitterConfig;
    ///
    /// let config = TwitterConfig::from_env().expect("credentials must be set");
    /// println!("Using cache at {}", config.cache_path.display());
    /// ```
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading Twitter configuration from environment variables");
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Creates a new `TwitterConfig` from an arbitrary variable lookup.
    ///
    /// `lookup` returns the raw value for a variable name, or `None` if unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = Credentials::new(
            required(&lookup, CONSUMER_KEY_VAR)?,
            required(&lookup, CONSUMER_SECRET_VAR)?,
            required(&lookup, ACCESS_TOKEN_VAR)?,
            required(&lookup, ACCESS_TOKEN_SECRET_VAR)?,
        )?;

        if credentials.user_id_hint().is_none() {
            warn!("ACCESS_TOKEN has no user ID prefix; the user will be looked up via /2/users/me");
        }

        let base_url_raw = optional(&lookup, API_BASE_URL_VAR)
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let api_base_url = Url::parse(&base_url_raw).map_err(|e| ConfigError::InvalidValue {
            name: API_BASE_URL_VAR,
            reason: e.to_string(),
        })?;
        if !matches!(api_base_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                name: API_BASE_URL_VAR,
                reason: format!("unsupported scheme '{}'", api_base_url.scheme()),
            });
        }

        let cache_path = optional(&lookup, CACHE_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_PATH));

        let max_attempts = parse_or(&lookup, MAX_ATTEMPTS_VAR, RetryPolicy::DEFAULT_MAX_ATTEMPTS)?;
        let base_delay_ms = parse_or(
            &lookup,
            BASE_DELAY_VAR,
            RetryPolicy::DEFAULT_BASE_DELAY.as_millis() as u64,
        )?;
        let max_delay_ms = parse_or(
            &lookup,
            MAX_DELAY_VAR,
            RetryPolicy::DEFAULT_MAX_DELAY.as_millis() as u64,
        )?;
        let retry = RetryPolicy::new(
            max_attempts,
            Duration::from_millis(base_delay_ms),
            Duration::from_millis(max_delay_ms),
        )?;

        let timeout_secs = parse_or(&lookup, TIMEOUT_VAR, DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                name: TIMEOUT_VAR,
                reason: "must be greater than zero".into(),
            });
        }

        let retry_server_errors = match optional(&lookup, RETRY_SERVER_ERRORS_VAR) {
            Some(raw) => parse_bool(RETRY_SERVER_ERRORS_VAR, &raw)?,
            None => false,
        };

        let config = TwitterConfig {
            credentials,
            api_base_url,
            cache_path,
            retry,
            timeout: Duration::from_secs(timeout_secs),
            retry_server_errors,
        };

        info!("Twitter configuration loaded successfully");
        debug!(
            "API base URL: {}, cache: {}, retry: {:?}, timeout: {:?}, retry server errors: {}",
            config.api_base_url,
            config.cache_path.display(),
            config.retry,
            config.timeout,
            config.retry_server_errors
        );

        Ok(config)
    }
}

/// Masks a secret for logging, keeping at most an 8-character prefix and suffix.
pub fn mask_secret(secret: &str) -> String {
    let length = secret.len();
    let prefix = secret.get(..8.min(length)).unwrap_or("");
    if length > 16 {
        let suffix = secret.get(length - 8..).unwrap_or("");
        format!("{}...{}", prefix, suffix)
    } else {
        format!("{}...", prefix)
    }
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => {
            let value = value.trim().to_string();
            if value.is_empty() {
                error!("{} is set but empty", name);
                return Err(ConfigError::EmptyVar(name));
            }
            info!(
                "Found {} environment variable with length: {}",
                name,
                value.len()
            );
            debug!("{} (masked): {}", name, mask_secret(&value));
            Ok(value)
        }
        None => {
            error!("Failed to load {} from environment", name);
            error!("Make sure {} environment variable is set", name);
            Err(ConfigError::MissingVar(name))
        }
    }
}

fn optional<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match optional(lookup, name) {
        Some(raw) => raw.parse::<T>().map_err(|e| ConfigError::InvalidValue {
            name,
            reason: format!("'{}': {}", raw, e),
        }),
        None => Ok(default),
    }
}

fn parse_bool(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name,
            reason: format!("'{}' is not a boolean", raw),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    // Mutex to prevent parallel test execution that manipulates the process environment
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn full_env() -> HashMap<&'static str, String> {
        HashMap::from([
            (CONSUMER_KEY_VAR, "consumer-key".to_string()),
            (CONSUMER_SECRET_VAR, "consumer-secret".to_string()),
            (ACCESS_TOKEN_VAR, "12345-access-token".to_string()),
            (ACCESS_TOKEN_SECRET_VAR, "access-token-secret".to_string()),
        ])
    }

    fn load(vars: &HashMap<&'static str, String>) -> Result<TwitterConfig, ConfigError> {
        TwitterConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&full_env()).unwrap();
        assert_eq!(config.api_base_url.as_str(), "https://api.x.com/");
        assert_eq!(config.cache_path, PathBuf::from("liked_tweets.txt"));
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(!config.retry_server_errors);
        assert_eq!(config.credentials.access_token(), "12345-access-token");
    }

    #[test]
    fn test_each_missing_credential_is_reported() {
        for name in [
            CONSUMER_KEY_VAR,
            CONSUMER_SECRET_VAR,
            ACCESS_TOKEN_VAR,
            ACCESS_TOKEN_SECRET_VAR,
        ] {
            let mut vars = full_env();
            vars.remove(name);
            assert_eq!(load(&vars).unwrap_err(), ConfigError::MissingVar(name));

            let mut vars = full_env();
            vars.insert(name, "   ".to_string());
            assert_eq!(load(&vars).unwrap_err(), ConfigError::EmptyVar(name));
        }
    }

    #[test]
    fn test_optional_overrides() {
        let mut vars = full_env();
        vars.insert(API_BASE_URL_VAR, "http://127.0.0.1:9999".to_string());
        vars.insert(CACHE_PATH_VAR, "/tmp/likes.txt".to_string());
        vars.insert(MAX_ATTEMPTS_VAR, "5".to_string());
        vars.insert(BASE_DELAY_VAR, "100".to_string());
        vars.insert(MAX_DELAY_VAR, "1000".to_string());
        vars.insert(TIMEOUT_VAR, "5".to_string());
        vars.insert(RETRY_SERVER_ERRORS_VAR, "TRUE".to_string());

        let config = load(&vars).unwrap();
        assert_eq!(config.api_base_url.as_str(), "http://127.0.0.1:9999/");
        assert_eq!(config.cache_path, PathBuf::from("/tmp/likes.txt"));
        assert_eq!(config.retry.max_attempts(), 5);
        assert_eq!(config.retry.delay_for_retry(1), Duration::from_millis(100));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.retry_server_errors);
    }

    #[test]
    fn test_invalid_values() {
        let cases = [
            (API_BASE_URL_VAR, "not a url"),
            (API_BASE_URL_VAR, "ftp://api.x.com"),
            (MAX_ATTEMPTS_VAR, "three"),
            (MAX_ATTEMPTS_VAR, "0"),
            (TIMEOUT_VAR, "0"),
            (RETRY_SERVER_ERRORS_VAR, "maybe"),
        ];
        for (name, value) in cases {
            let mut vars = full_env();
            vars.insert(name, value.to_string());
            assert!(
                matches!(load(&vars), Err(ConfigError::InvalidValue { .. })),
                "{}={} should be rejected",
                name,
                value
            );
        }
    }

    #[test]
    fn test_user_id_hint() {
        let creds = Credentials::new("k", "s", "370773112-GmHxMAgY", "t").unwrap();
        assert_eq!(creds.user_id_hint(), Some("370773112"));

        let creds = Credentials::new("k", "s", "opaque-token", "t").unwrap();
        assert_eq!(creds.user_id_hint(), None);

        let creds = Credentials::new("k", "s", "notoken", "t").unwrap();
        assert_eq!(creds.user_id_hint(), None);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials::new(
            "consumer-key-abcdefghijkl",
            "very-secret-consumer",
            "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb",
            "very-secret-token",
        )
        .unwrap();
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("very-secret-consumer"));
        assert!(!printed.contains("very-secret-token"));
        assert!(!printed.contains("GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb"));
        assert!(printed.contains("[REDACTED]"));
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("short"), "short...");
        assert_eq!(mask_secret("0123456789ab"), "01234567...");
        assert_eq!(
            mask_secret("0123456789abcdefghijkl"),
            "01234567...efghijkl"
        );
    }

    #[test]
    fn test_from_env_reads_process_environment() {
        let _guard = ENV_LOCK.lock().unwrap();
        for (name, value) in full_env() {
            env::set_var(name, value);
        }
        env::remove_var(CACHE_PATH_VAR);

        let config = TwitterConfig::from_env().unwrap();
        assert_eq!(config.credentials.consumer_key(), "consumer-key");

        env::remove_var(ACCESS_TOKEN_SECRET_VAR);
        assert_eq!(
            TwitterConfig::from_env().unwrap_err(),
            ConfigError::MissingVar(ACCESS_TOKEN_SECRET_VAR)
        );

        // Clean up
        for (name, _) in full_env() {
            env::remove_var(name);
        }
    }

    #[test]
    fn test_dotenv_file_never_overrides_process_env() {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "CONSUMER_KEY=from-file\nTWEET_LIKER_DOTENV_ONLY=from-file\n",
        )
        .unwrap();

        env::set_var(CONSUMER_KEY_VAR, "from-process");
        env::remove_var("TWEET_LIKER_DOTENV_ONLY");

        assert_eq!(load_dotenv_from(&path), Some(path.clone()));
        assert_eq!(env::var(CONSUMER_KEY_VAR).unwrap(), "from-process");
        assert_eq!(env::var("TWEET_LIKER_DOTENV_ONLY").unwrap(), "from-file");

        env::remove_var(CONSUMER_KEY_VAR);
        env::remove_var("TWEET_LIKER_DOTENV_ONLY");
    }

    #[test]
    fn test_missing_dotenv_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_dotenv_from(&dir.path().join(".env")), None);
    }
}
