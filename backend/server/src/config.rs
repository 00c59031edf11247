use std::{env, fmt::Display, fs::read_to_string, str::FromStr, time::Duration};

use records::{Paging, RetryPolicy};
use tracing::{info, warn};

/// https on any `*.vercel.app` host, or http on localhost / 127.0.0.1 with any port.
pub const DEFAULT_CORS_PATTERN: &str =
    r"^(https://([a-z0-9-]+\.)*vercel\.app|http://(localhost|127\.0\.0\.1)(:\d+)?)$";

pub struct Config {
    pub port: u16,
    pub store_url: String,
    pub store_key: String,
    pub gemini_key: Option<String>,
    pub retry: RetryPolicy,
    pub paging: Paging,
    pub cors_pattern: String,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("RUST_PORT", "8001"),
            store_url: try_load("STORE_URL", "http://localhost:54321"),
            store_key: read_secret("STORE_KEY").expect("Secrets misconfigured!"),
            gemini_key: read_secret("GEMINI_API_KEY"),
            retry: RetryPolicy {
                max_attempts: try_load("STORE_RETRY_ATTEMPTS", "3"),
                delay: Duration::from_millis(try_load("STORE_RETRY_DELAY_MS", "500")),
            },
            paging: Paging {
                page_size: try_load("STORE_PAGE_SIZE", "1000"),
                max_pages: try_load("STORE_MAX_PAGES", "100"),
            },
            cors_pattern: try_load("CORS_ORIGIN_PATTERN", DEFAULT_CORS_PATTERN),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

/// Secret file first, then the environment variable of the same name.
fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            info!("Failed to read {secret_name} from file: {e}");
        })
        .or_else(|_| env::var(secret_name))
        .ok()
        .filter(|s| !s.is_empty())
        .or_else(|| {
            warn!("Secret {secret_name} not found");
            None
        })
}
