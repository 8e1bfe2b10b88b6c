//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

/// Storefront configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `"json"` for JSON log lines, anything else for text
/// - `STOREFRONT_API_URL`: base URL of the public store API
/// - `RECONCILIATION_TIMEOUT_SECS`: order reconciliation request timeout (default: `30`)
/// - `MOCK_CHECKOUT`: `"true"` to reconcile against the in-memory backend
/// - `CART_SNAPSHOT_PATH`: file the cart is restored from and saved to
/// - `CONFIRMATION_VIEW_TTL_SECS`: how long a settled, undismissed
///   confirmation view stays mounted (default: `600`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub json_logs: bool,
    pub api_url: String,
    pub reconciliation_timeout: Duration,
    pub mock_checkout: bool,
    pub cart_snapshot_path: Option<PathBuf>,
    pub view_ttl: Duration,
}

const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1/public";
const DEFAULT_RECONCILIATION_TIMEOUT_SECS: u64 = 30;

fn env_secs(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            json_logs: std::env::var("LOG_FORMAT")
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            api_url: std::env::var("STOREFRONT_API_URL").unwrap_or(defaults.api_url),
            reconciliation_timeout: env_secs("RECONCILIATION_TIMEOUT_SECS")
                .unwrap_or(defaults.reconciliation_timeout),
            mock_checkout: env_flag("MOCK_CHECKOUT"),
            cart_snapshot_path: std::env::var_os("CART_SNAPSHOT_PATH").map(PathBuf::from),
            view_ttl: env_secs("CONFIRMATION_VIEW_TTL_SECS").unwrap_or(defaults.view_ttl),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            json_logs: false,
            api_url: DEFAULT_API_URL.to_string(),
            reconciliation_timeout: Duration::from_secs(DEFAULT_RECONCILIATION_TIMEOUT_SECS),
            mock_checkout: false,
            cart_snapshot_path: None,
            view_ttl: crate::state::DEFAULT_VIEW_TTL,
        }
    }
}
