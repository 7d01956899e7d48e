//! Like operations for Twitter API.
//!
//! This module contains the reqwest-backed client that signs and sends the
//! `POST /2/users/:id/likes` request using OAuth 1.0a User Context.

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::OnceLock;

use crate::config::TwitterConfig;
use crate::oauth::OAuthSigner;

use super::api::{sanitize_for_logging, ApiResponse, LikeTransport, TransportError};

#[derive(Debug, Deserialize)]
struct TwitterResponse<Data> {
    data: Data,
}

#[derive(Debug, Deserialize)]
struct TwitterUser {
    id: String,
    #[serde(default)]
    username: Option<String>,
}

/// Outcome of resolving the authenticated user's ID.
enum UserLookup {
    Resolved(String),
    /// The lookup request itself got a non-success response
    Rejected(ApiResponse),
}

/// Twitter API v2 client for the like endpoint.
#[derive(Debug)]
pub struct TwitterClient {
    client: Client,
    base_url: String,
    signer: OAuthSigner,
    user_id: OnceLock<String>,
}

impl TwitterClient {
    /// Creates a client from configuration.
    ///
    /// The authenticated user ID is taken from the access token prefix when
    /// present; otherwise it is looked up lazily on the first like request.
    pub fn new(config: &TwitterConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(format!("tweet-liker/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        let user_id = OnceLock::new();
        if let Some(id) = config.credentials.user_id_hint() {
            debug!("Authenticated user ID taken from access token: {}", id);
            let _ = user_id.set(id.to_string());
        }

        Ok(Self {
            client,
            base_url: config.api_base_url.as_str().trim_end_matches('/').to_string(),
            signer: OAuthSigner::new(config.credentials.clone()),
            user_id,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Looks up the authenticated user via `GET /2/users/me`, memoizing the ID.
    async fn resolve_user_id(&self) -> Result<UserLookup, TransportError> {
        if let Some(id) = self.user_id.get() {
            return Ok(UserLookup::Resolved(id.clone()));
        }

        info!("Looking up authenticated user via /2/users/me");
        let url = self.endpoint("/2/users/me");
        let auth_header = self.signer.authorization_header("GET", &url, &[])?;

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, auth_header)
            .send()
            .await?;
        let response = ApiResponse::read(response).await?;

        if !response.is_success() {
            warn!("User lookup failed with status {}", response.status);
            return Ok(UserLookup::Rejected(response));
        }

        let user: TwitterResponse<TwitterUser> = serde_json::from_str(&response.body)
            .map_err(|e| {
                TransportError::InvalidRequest(format!(
                    "unexpected /2/users/me response ({}): {}",
                    e,
                    sanitize_for_logging(&response.body, 200)
                ))
            })?;

        info!(
            "Authenticated as user {} (@{})",
            user.data.id,
            user.data.username.as_deref().unwrap_or("unknown")
        );
        let id = self.user_id.get_or_init(|| user.data.id).clone();
        Ok(UserLookup::Resolved(id))
    }
}

#[async_trait]
impl LikeTransport for TwitterClient {
    async fn send_like(&self, tweet_id: &str) -> Result<ApiResponse, TransportError> {
        let user_id = match self.resolve_user_id().await? {
            UserLookup::Resolved(id) => id,
            UserLookup::Rejected(response) => return Ok(response),
        };

        let url = self.endpoint(&format!("/2/users/{}/likes", user_id));
        let payload = json!({ "tweet_id": tweet_id });

        debug!("Building OAuth 1.0a authorization header");
        let auth_header = self.signer.authorization_header("POST", &url, &[])?;

        info!("Sending POST request to Twitter API v2 like endpoint");
        debug!("Request URL: {}", url);
        debug!("Request headers: Authorization: OAuth [REDACTED], Content-Type: application/json");
        debug!("Request payload: {}", payload);

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, auth_header)
            .header(CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .await?;

        let response = ApiResponse::read(response).await?;
        info!("Received response with status: {}", response.status);
        if !response.is_success() {
            debug!(
                "Error response body: {}",
                sanitize_for_logging(&response.body, 200)
            );
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(access_token: &str, base_url: &str) -> TwitterConfig {
        let vars = HashMap::from([
            ("CONSUMER_KEY", "ck".to_string()),
            ("CONSUMER_SECRET", "cs".to_string()),
            ("ACCESS_TOKEN", access_token.to_string()),
            ("ACCESS_TOKEN_SECRET", "ats".to_string()),
            ("TWITTER_API_BASE_URL", base_url.to_string()),
        ]);
        TwitterConfig::from_lookup(|name| vars.get(name).cloned()).unwrap()
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let client = TwitterClient::new(&config("42-abc", "https://api.x.com/")).unwrap();
        assert_eq!(
            client.endpoint("/2/users/42/likes"),
            "https://api.x.com/2/users/42/likes"
        );
    }

    #[test]
    fn test_user_id_from_token_prefix() {
        let client = TwitterClient::new(&config("42-abc", "https://api.x.com")).unwrap();
        assert_eq!(client.user_id.get().map(String::as_str), Some("42"));

        let client = TwitterClient::new(&config("opaque", "https://api.x.com")).unwrap();
        assert!(client.user_id.get().is_none());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transient() {
        // Port 1 on localhost refuses connections
        let client = TwitterClient::new(&config("42-abc", "http://127.0.0.1:1")).unwrap();
        let err = client.send_like("1234567890").await.unwrap_err();
        assert!(err.is_transient(), "unexpected error: {}", err);
    }

    #[test]
    fn test_users_me_response_shape() {
        let body = r#"{"data":{"id":"2244994945","name":"X Dev","username":"XDevelopers"}}"#;
        let user: TwitterResponse<TwitterUser> = serde_json::from_str(body).unwrap();
        assert_eq!(user.data.id, "2244994945");
        assert_eq!(user.data.username.as_deref(), Some("XDevelopers"));
    }
}
