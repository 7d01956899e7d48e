//! Like action executor.
//!
//! This module drives one like action from start to a terminal [`ActionOutcome`]:
//! it consults the duplicate-suppression cache, sends the signed request through a
//! [`LikeTransport`], classifies the response, retries rate limits and network
//! failures with exponential backoff, and records successful likes in the cache.

use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::fmt;
use std::time::Duration;

use crate::cache::{is_valid_tweet_id, LikeCache};
use crate::config::{ConfigError, BASE_DELAY_VAR, MAX_ATTEMPTS_VAR, MAX_DELAY_VAR};
use crate::twitter::{sanitize_for_logging, ApiResponse, LikeTransport};

/// Bounded exponential backoff schedule.
///
/// The wait before retry `n` (1-based) is `base_delay * 2^(n-1)`, capped at
/// `max_delay`. Construction rejects schedules where the cap would make two
/// consecutive waits equal, so waits always strictly increase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);
    pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

    /// Creates a validated retry policy.
    ///
    /// # Parameters
    ///
    /// - `max_attempts`: Total attempts including the first one (at least 1)
    /// - `base_delay`: Wait before the first retry (non-zero)
    /// - `max_delay`: Upper bound for any single wait
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
    ) -> Result<Self, ConfigError> {
        if max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                name: MAX_ATTEMPTS_VAR,
                reason: "must be at least 1".into(),
            });
        }
        if base_delay.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: BASE_DELAY_VAR,
                reason: "must be greater than zero".into(),
            });
        }
        if max_delay < base_delay {
            return Err(ConfigError::InvalidValue {
                name: MAX_DELAY_VAR,
                reason: format!(
                    "{:?} is shorter than the base delay {:?}",
                    max_delay, base_delay
                ),
            });
        }

        let policy = Self {
            max_attempts,
            base_delay,
            max_delay,
        };

        // Waits strictly increase iff the second-to-last one is still under the cap
        let retries = max_attempts - 1;
        if retries >= 2 {
            match policy.uncapped_delay(retries - 1) {
                Some(delay) if delay < max_delay => {}
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: MAX_DELAY_VAR,
                        reason: format!(
                            "{:?} caps the backoff before attempt {}; raise it or lower {}",
                            max_delay, max_attempts, MAX_ATTEMPTS_VAR
                        ),
                    })
                }
            }
        }

        Ok(policy)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn uncapped_delay(&self, retry: u32) -> Option<Duration> {
        let factor = 2u32.checked_pow(retry.checked_sub(1)?)?;
        self.base_delay.checked_mul(factor)
    }

    /// Wait before retry `retry` (1-based: the wait after the first failed attempt is retry 1).
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        self.uncapped_delay(retry.max(1))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            base_delay: Self::DEFAULT_BASE_DELAY,
            max_delay: Self::DEFAULT_MAX_DELAY,
        }
    }
}

/// Waits between attempts. Injected so tests can record delays instead of sleeping.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// The single terminal result of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The tweet was liked and recorded in the cache
    Success { tweet_id: String },
    /// The cache already held the tweet; no request was sent
    AlreadyLiked { tweet_id: String },
    /// The API rejected the credentials or signature (401/403)
    AuthenticationFailed { tweet_id: String, detail: String },
    /// Still rate limited after the last attempt
    RateLimited { tweet_id: String, attempts: u32 },
    /// Network failures on every attempt
    TransientFailureExhausted {
        tweet_id: String,
        attempts: u32,
        detail: String,
    },
    /// An unexpected response or local error; not retried
    UnknownError { tweet_id: String, detail: String },
    /// Configuration was incomplete or invalid; nothing was sent
    ConfigurationError(ConfigError),
}

impl ActionOutcome {
    /// True for Success and AlreadyLiked.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. } | Self::AlreadyLiked { .. })
    }

    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

impl From<ConfigError> for ActionOutcome {
    fn from(e: ConfigError) -> Self {
        Self::ConfigurationError(e)
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { tweet_id } => write!(f, "Successfully liked tweet {}.", tweet_id),
            Self::AlreadyLiked { tweet_id } => {
                write!(f, "Tweet {} is already liked. Skipping.", tweet_id)
            }
            Self::AuthenticationFailed { tweet_id, detail } => write!(
                f,
                "Authentication failed while liking tweet {}: {}",
                tweet_id, detail
            ),
            Self::RateLimited { tweet_id, attempts } => write!(
                f,
                "Rate limit exceeded while liking tweet {}; giving up after {} attempts.",
                tweet_id, attempts
            ),
            Self::TransientFailureExhausted {
                tweet_id,
                attempts,
                detail,
            } => write!(
                f,
                "Network error while liking tweet {}; giving up after {} attempts: {}",
                tweet_id, attempts, detail
            ),
            Self::UnknownError { tweet_id, detail } => {
                write!(f, "Failed to like tweet {}: {}", tweet_id, detail)
            }
            Self::ConfigurationError(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

/// How one HTTP response is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Classification {
    Success,
    AuthFailed,
    RateLimited,
    ServerError,
    Unknown,
}

/// A failed attempt that may be retried.
enum RetryableFailure {
    RateLimited,
    Transient(String),
}

/// Runs like actions against a transport, a cache and a sleeper.
pub struct LikeExecutor<T, C, S = TokioSleeper> {
    transport: T,
    cache: C,
    sleeper: S,
    policy: RetryPolicy,
    retry_server_errors: bool,
}

impl<T, C> LikeExecutor<T, C, TokioSleeper>
where
    T: LikeTransport,
    C: LikeCache,
{
    /// Creates an executor that sleeps on the tokio timer between attempts.
    pub fn new(transport: T, cache: C, policy: RetryPolicy) -> Self {
        Self {
            transport,
            cache,
            sleeper: TokioSleeper,
            policy,
            retry_server_errors: false,
        }
    }
}

impl<T, C, S> LikeExecutor<T, C, S>
where
    T: LikeTransport,
    C: LikeCache,
    S: Sleeper,
{
    /// Replaces the sleeper used between attempts.
    pub fn with_sleeper<S2: Sleeper>(self, sleeper: S2) -> LikeExecutor<T, C, S2> {
        LikeExecutor {
            transport: self.transport,
            cache: self.cache,
            sleeper,
            policy: self.policy,
            retry_server_errors: self.retry_server_errors,
        }
    }

    /// Treat 5xx responses as transient failures instead of unknown errors.
    pub fn retry_server_errors(mut self, enabled: bool) -> Self {
        self.retry_server_errors = enabled;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    pub fn into_cache(self) -> C {
        self.cache
    }

    fn classify(&self, response: &ApiResponse) -> Classification {
        match response.status {
            200..=299 => Classification::Success,
            401 | 403 => Classification::AuthFailed,
            429 => Classification::RateLimited,
            _ if response.rate_limit.is_exhausted() => Classification::RateLimited,
            500..=599 if self.retry_server_errors => Classification::ServerError,
            _ => Classification::Unknown,
        }
    }

    /// Likes `tweet_id` unless the cache already holds it.
    ///
    /// Never panics and never returns an error: every failure is folded into
    /// the returned [`ActionOutcome`].
    pub async fn execute(&mut self, tweet_id: &str) -> ActionOutcome {
        let tweet_id = tweet_id.trim();
        if tweet_id.is_empty() {
            error!("Refusing to like an empty tweet ID");
            return ActionOutcome::UnknownError {
                tweet_id: String::new(),
                detail: "tweet ID cannot be empty".into(),
            };
        }
        if !is_valid_tweet_id(tweet_id) {
            error!("Refusing to like malformed tweet ID {:?}", tweet_id);
            return ActionOutcome::UnknownError {
                tweet_id: tweet_id.to_string(),
                detail: "tweet ID cannot contain whitespace or control characters".into(),
            };
        }

        debug!("Checking like cache for tweet {}", tweet_id);
        if self.cache.contains(tweet_id) {
            info!("Tweet {} is already liked. Skipping.", tweet_id);
            return ActionOutcome::AlreadyLiked {
                tweet_id: tweet_id.to_string(),
            };
        }

        let max_attempts = self.policy.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            info!(
                "Liking tweet {} (attempt {}/{})",
                tweet_id, attempt, max_attempts
            );

            let failure = match self.transport.send_like(tweet_id).await {
                Ok(response) => {
                    let classification = self.classify(&response);
                    debug!(
                        "Response status {} classified as {:?}",
                        response.status, classification
                    );
                    match classification {
                        Classification::Success => return self.record_success(tweet_id, &response),
                        Classification::AuthFailed => {
                            let detail = response.error_detail();
                            error!("Authentication failed for tweet {}: {}", tweet_id, detail);
                            return ActionOutcome::AuthenticationFailed {
                                tweet_id: tweet_id.to_string(),
                                detail,
                            };
                        }
                        Classification::RateLimited => {
                            match response.rate_limit.seconds_until_reset() {
                                Some(seconds) => warn!(
                                    "Rate limit exceeded. Window resets in {} seconds.",
                                    seconds
                                ),
                                None => warn!("Rate limit exceeded (status {}).", response.status),
                            }
                            RetryableFailure::RateLimited
                        }
                        Classification::ServerError => {
                            let detail = response.error_detail();
                            warn!("Twitter API server error: {}", detail);
                            RetryableFailure::Transient(detail)
                        }
                        Classification::Unknown => {
                            let detail = response.error_detail();
                            error!("Unexpected response for tweet {}: {}", tweet_id, detail);
                            debug!(
                                "Unexpected response body: {}",
                                sanitize_for_logging(&response.body, 200)
                            );
                            return ActionOutcome::UnknownError {
                                tweet_id: tweet_id.to_string(),
                                detail,
                            };
                        }
                    }
                }
                Err(e) if e.is_transient() => {
                    warn!("Network error while liking tweet {}: {}", tweet_id, e);
                    RetryableFailure::Transient(e.to_string())
                }
                Err(e) => {
                    error!("Like request for tweet {} failed: {}", tweet_id, e);
                    return ActionOutcome::UnknownError {
                        tweet_id: tweet_id.to_string(),
                        detail: e.to_string(),
                    };
                }
            };

            if attempt >= max_attempts {
                error!(
                    "Giving up on tweet {} after {} attempts",
                    tweet_id, attempt
                );
                return match failure {
                    RetryableFailure::RateLimited => ActionOutcome::RateLimited {
                        tweet_id: tweet_id.to_string(),
                        attempts: attempt,
                    },
                    RetryableFailure::Transient(detail) => {
                        ActionOutcome::TransientFailureExhausted {
                            tweet_id: tweet_id.to_string(),
                            attempts: attempt,
                            detail,
                        }
                    }
                };
            }

            let delay = self.policy.delay_for_retry(attempt);
            warn!("Retrying like for tweet {} in {:?}", tweet_id, delay);
            self.sleeper.sleep(delay).await;
        }
    }

    fn record_success(&mut self, tweet_id: &str, response: &ApiResponse) -> ActionOutcome {
        if response.liked() == Some(false) {
            warn!(
                "API accepted the like for tweet {} but reported liked=false",
                tweet_id
            );
        }

        // The like already happened remotely; a cache write failure does not undo it
        if let Err(e) = self.cache.add(tweet_id) {
            error!("Failed to record tweet {} in like cache: {}", tweet_id, e);
        }

        info!("Successfully liked tweet {}.", tweet_id);
        ActionOutcome::Success {
            tweet_id: tweet_id.to_string(),
        }
    }
}
