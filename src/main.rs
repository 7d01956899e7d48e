//! # Tweet Liker
//!
//! Prompts for a tweet ID and likes it on Twitter/X, printing one status line.
//!
//! ## Environment Variables
//!
//! - `CONSUMER_KEY`, `CONSUMER_SECRET`, `ACCESS_TOKEN`, `ACCESS_TOKEN_SECRET`: required
//! - `RUST_LOG`: log verbosity (defaults to `info`)
//!
//! Variables may also come from a `.env` file; values already set in the
//! process environment take precedence.
//!
//! ## Exit Codes
//!
//! - `0`: the tweet was liked, or was already liked
//! - `1`: configuration, authentication, rate limit, network or API failure
//! - `2`: no tweet ID was entered

use log::{error, info};
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use tweet_liker::{ActionOutcome, FileLikeCache, LikeExecutor, TwitterClient, TwitterConfig};

/// Prompts on stdout and reads one line from stdin.
fn prompt_tweet_id() -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    print!("Enter the tweet ID to like: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Main entry point for the tweet-liker tool.
///
/// Loads configuration before prompting so that missing credentials are
/// reported without any network activity, then runs a single like action on a
/// current-thread runtime.
///
/// # Example Usage
///
/// ```bash
/// CONSUMER_KEY=... CONSUMER_SECRET=... ACCESS_TOKEN=... ACCESS_TOKEN_SECRET=... cargo run
///
/// # Run with debug logging
/// RUST_LOG=debug cargo run
/// ```
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialize the logging system
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    tweet_liker::config::load_dotenv();

    let config = match TwitterConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            let outcome = ActionOutcome::from(e);
            eprintln!("{}", outcome);
            return ExitCode::from(outcome.exit_code());
        }
    };

    let tweet_id = match prompt_tweet_id() {
        Ok(id) => id,
        Err(e) => {
            eprintln!("Failed to read tweet ID: {}", e);
            return ExitCode::from(2);
        }
    };
    if tweet_id.is_empty() {
        eprintln!("Tweet ID cannot be empty.");
        return ExitCode::from(2);
    }

    let cache = match FileLikeCache::open(&config.cache_path) {
        Ok(cache) => cache,
        Err(e) => {
            error!("{}", e);
            eprintln!("Failed to like tweet {}: {}", tweet_id, e);
            return ExitCode::FAILURE;
        }
    };

    let client = match TwitterClient::new(&config) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            eprintln!("Failed to like tweet {}: {}", tweet_id, e);
            return ExitCode::FAILURE;
        }
    };
    info!("Authentication configured with OAuth 1.0a User Context");

    let mut executor = LikeExecutor::new(client, cache, config.retry)
        .retry_server_errors(config.retry_server_errors);
    let outcome = executor.execute(&tweet_id).await;

    if outcome.is_success() {
        println!("{}", outcome);
    } else {
        eprintln!("{}", outcome);
    }
    ExitCode::from(outcome.exit_code())
}
