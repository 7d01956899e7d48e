//! Twitter/X API integration module.
//!
//! This module contains the transport used to like a tweet via the Twitter/X
//! API v2 with OAuth 1.0a User Context authentication.

mod api;
mod likes;

pub use api::{ApiResponse, LikeTransport, RateLimitInfo, TransportError};
pub use likes::TwitterClient;

pub(crate) use api::sanitize_for_logging;
