//! Browser session configuration.
//!
//! Always compiled so configuration parsing works without the `browser`
//! feature.

use serde::{Deserialize, Serialize};

/// Chromium session configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrowserEngineConfig {
    /// Run in headless mode (default: true).
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Proxy server URL (e.g., "socks5://127.0.0.1:1080").
    #[serde(default)]
    pub proxy: Option<String>,

    /// Page load timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// User agent sent with every request. Chromium's own when unset.
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Viewport as `[width, height]`.
    #[serde(default = "default_window_size")]
    pub window_size: (u32, u32),

    /// Additional Chrome arguments.
    #[serde(default)]
    pub chrome_args: Vec<String>,

    /// Remote Chrome DevTools URL (e.g., "ws://localhost:9222").
    /// If set, connects to an existing browser instead of launching one.
    /// Can also be set via the BROWSER_URL environment variable.
    #[serde(default)]
    pub remote_url: Option<String>,
}

impl Default for BrowserEngineConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            proxy: None,
            timeout: default_timeout(),
            user_agent: None,
            window_size: default_window_size(),
            chrome_args: Vec::new(),
            remote_url: None,
        }
    }
}

impl BrowserEngineConfig {
    /// Apply environment variable overrides.
    ///
    /// - `BROWSER_URL` - Remote Chrome DevTools URL
    /// - `MARKETSCRAPE_HEADLESS` - `false`/`0`/`no` to show the browser window
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("BROWSER_URL") {
            if !val.trim().is_empty() {
                self.remote_url = Some(val.trim().to_string());
            }
        }

        if let Ok(val) = std::env::var("MARKETSCRAPE_HEADLESS") {
            if let Some(headless) = parse_flag(&val) {
                self.headless = headless;
            }
        }

        self
    }
}

/// Parse a boolean-ish environment value.
pub(crate) fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn default_headless() -> bool {
    true
}

pub fn default_timeout() -> u64 {
    30
}

pub fn default_window_size() -> (u32, u32) {
    (1920, 1080)
}
