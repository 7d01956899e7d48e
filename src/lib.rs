//! # Tweet Liker Library
//!
//! Likes a single tweet on Twitter/X using OAuth 1.0a User Context request signing,
//! with bounded exponential backoff for rate limits and network failures and a
//! local cache that prevents the same tweet from being liked twice.
//!
//! ## Features
//!
//! - OAuth 1.0a (HMAC-SHA1) request signing with a fresh nonce per request
//! - Retry with strictly increasing backoff for 429s and connection failures
//! - File-backed duplicate-suppression cache with atomic writes
//! - Structured logging via `log`
//!
//! ## Configuration
//!
//! The following environment variables are required:
//! - `CONSUMER_KEY`, `CONSUMER_SECRET`: API key and secret
//! - `ACCESS_TOKEN`, `ACCESS_TOKEN_SECRET`: user access token and secret
//!
//! Optional tuning is documented on [`TwitterConfig::from_env`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use tweet_liker::{FileLikeCache, LikeExecutor, TwitterClient, TwitterConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let config = TwitterConfig::from_env()?;
//!     let cache = FileLikeCache::open(&config.cache_path)?;
//!     let client = TwitterClient::new(&config)?;
//!
//!     let mut executor = LikeExecutor::new(client, cache, config.retry);
//!     let outcome = executor.execute("1234567890123456789").await;
//!     println!("{}", outcome);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod executor;
pub mod oauth;
pub mod twitter;

// Re-export commonly used types and functions
pub use cache::{CacheError, FileLikeCache, LikeCache, MemoryLikeCache};
pub use config::{ConfigError, Credentials, TwitterConfig};
pub use executor::{ActionOutcome, LikeExecutor, RetryPolicy, Sleeper, TokioSleeper};
pub use oauth::{OAuthError, OAuthSigner};
pub use twitter::{ApiResponse, LikeTransport, RateLimitInfo, TransportError, TwitterClient};
