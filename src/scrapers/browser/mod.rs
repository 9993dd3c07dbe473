//! Browser session used to load and render search pages.
//!
//! The scraper only talks to [`BrowserSession`]. The Chromium implementation
//! drives a single page over CDP with chromiumoxide; tests swap in a fake
//! that serves fixtures.

mod config;

pub use config::BrowserEngineConfig;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

#[cfg(feature = "browser")]
pub use chromium::ChromiumSession;

/// Capabilities the scraper needs from a browser.
#[async_trait]
pub trait BrowserSession: Send {
    /// Load a URL, bounded by the session's page-load timeout.
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Run a script in the page, discarding its value.
    async fn execute_script(&mut self, script: &str) -> Result<()>;

    /// Poll until an element matches `selector`. Returns whether it appeared.
    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<bool>;

    /// Serialized DOM of the current page.
    async fn page_source(&mut self) -> Result<String>;

    async fn current_url(&mut self) -> Result<Option<String>>;

    async fn title(&mut self) -> Result<Option<String>>;

    /// PNG capture of the current page.
    async fn screenshot(&mut self) -> Result<Vec<u8>>;

    /// Shut the session down. Further calls fail.
    async fn quit(&mut self) -> Result<()>;
}

/// Launch (or connect to) a browser and open a session on it.
#[cfg(feature = "browser")]
pub async fn launch_session(config: &BrowserEngineConfig) -> Result<Box<dyn BrowserSession>> {
    let session = ChromiumSession::launch(config).await?;
    Ok(Box::new(session))
}

#[cfg(not(feature = "browser"))]
pub async fn launch_session(_config: &BrowserEngineConfig) -> Result<Box<dyn BrowserSession>> {
    Err(crate::error::ScrapeError::Setup(
        "Browser support not compiled. Rebuild with: cargo build --features browser".to_string(),
    ))
}

#[cfg(feature = "browser")]
mod chromium {
    use std::path::PathBuf;
    use std::time::Duration;

    use async_trait::async_trait;
    use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
    use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, NavigateParams};
    use chromiumoxide::handler::HandlerConfig;
    use chromiumoxide::page::ScreenshotParams;
    use chromiumoxide::{Browser, BrowserConfig, Page};
    use futures::StreamExt;
    use tokio::task::JoinHandle;
    use tracing::{debug, info, warn};

    use super::{BrowserEngineConfig, BrowserSession};
    use crate::error::{Result, ScrapeError};

    /// Chrome builds looked up on PATH, in preference order.
    const CHROME_BINARIES: &[&str] = &[
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
    ];

    /// App bundles that are never on PATH.
    const MACOS_BUNDLES: &[&str] = &[
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
    ];

    /// Flags that keep a scripted browser from announcing itself.
    const LAUNCH_ARGS: &[&str] = &[
        "--disable-blink-features=AutomationControlled",
        "--disable-infobars",
        "--disable-dev-shm-usage",
        "--no-first-run",
        "--no-default-browser-check",
        "--no-sandbox",
        "--disable-gpu",
    ];

    const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

    /// JavaScript resolving once the document is interactive.
    const WAIT_FOR_READY_SCRIPT: &str = r#"
        new Promise((resolve) => {
            if (document.readyState === 'complete' || document.readyState === 'interactive') {
                resolve(document.readyState);
            } else {
                document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
                setTimeout(() => resolve('timeout'), 10000);
            }
        })
    "#;

    /// One Chromium page plus the browser that owns it.
    pub struct ChromiumSession {
        browser: Option<Browser>,
        page: Option<Page>,
        handler: JoinHandle<()>,
        timeout: Duration,
        /// Whether we launched the browser (and so must shut it down).
        owned: bool,
    }

    impl ChromiumSession {
        pub async fn launch(config: &BrowserEngineConfig) -> Result<Self> {
            let (browser, handler, owned) = match config.remote_url.as_deref() {
                Some(remote_url) => {
                    let (browser, handler) = connect_remote(remote_url, config.timeout).await?;
                    (browser, handler, false)
                }
                None => {
                    let (browser, handler) = launch_local(config).await?;
                    (browser, handler, true)
                }
            };

            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| ScrapeError::Setup(format!("Failed to open page: {}", e)))?;

            if let Some(ref user_agent) = config.user_agent {
                page.execute(SetUserAgentOverrideParams::new(user_agent.clone()))
                    .await
                    .map_err(|e| ScrapeError::Setup(format!("Failed to set user agent: {}", e)))?;
            }

            Ok(Self {
                browser: Some(browser),
                page: Some(page),
                handler,
                timeout: Duration::from_secs(config.timeout),
                owned,
            })
        }

        fn page(&self) -> Result<&Page> {
            self.page
                .as_ref()
                .ok_or_else(|| ScrapeError::Setup("Browser session is closed".to_string()))
        }
    }

    /// Sessions dropped without `quit` still stop their CDP handler task. A
    /// launched Chrome process is killed by chromiumoxide's own `Browser` drop.
    impl Drop for ChromiumSession {
        fn drop(&mut self) {
            self.handler.abort();
        }
    }

    fn find_chrome() -> Result<PathBuf> {
        let found = CHROME_BINARIES
            .iter()
            .find_map(|bin| which::which(bin).ok())
            .or_else(|| {
                MACOS_BUNDLES
                    .iter()
                    .map(PathBuf::from)
                    .find(|path| path.is_file())
            });
        match found {
            Some(path) => {
                debug!("Using Chrome at {}", path.display());
                Ok(path)
            }
            None => Err(ScrapeError::Setup(
                "Chrome/Chromium not found. Install it or set BROWSER_URL to a running instance"
                    .to_string(),
            )),
        }
    }

    fn spawn_handler(mut handler: chromiumoxide::handler::Handler) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        })
    }

    async fn launch_local(config: &BrowserEngineConfig) -> Result<(Browser, JoinHandle<()>)> {
        info!("Launching browser (headless={})", config.headless);

        let chrome_path = find_chrome()?;
        let (width, height) = config.window_size;
        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .window_size(width, height)
            .request_timeout(Duration::from_secs(config.timeout));

        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(ref proxy) = config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }
        let extra = config.chrome_args.iter().map(String::as_str);
        for arg in LAUNCH_ARGS.iter().copied().chain(extra) {
            builder = builder.arg(arg);
        }

        let browser_config = builder
            .build()
            .map_err(|e| ScrapeError::Setup(format!("Failed to build browser config: {}", e)))?;

        let (browser, handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScrapeError::Setup(format!("Failed to launch browser: {}", e)))?;

        Ok((browser, spawn_handler(handler)))
    }

    /// `/json/version` endpoint of a DevTools address given as `http(s)://` or
    /// `ws(s)://`.
    fn version_endpoint(url: &str) -> String {
        let http_url = match url.strip_prefix("ws") {
            Some(rest) => format!("http{}", rest),
            None => url.to_string(),
        };
        format!("{}/json/version", http_url.trim_end_matches('/'))
    }

    /// Attach to a running DevTools endpoint.
    async fn connect_remote(url: &str, timeout: u64) -> Result<(Browser, JoinHandle<()>)> {
        info!("Attaching to browser at {}", url);

        let version_url = version_endpoint(url);

        let setup = |context: &str, e: &dyn std::fmt::Display| {
            ScrapeError::Setup(format!("{}: {}", context, e))
        };

        let resp: serde_json::Value = reqwest::Client::new()
            .get(&version_url)
            .send()
            .await
            .map_err(|e| setup("Failed to connect to remote browser", &e))?
            .json()
            .await
            .map_err(|e| setup("Failed to parse browser version info", &e))?;

        let ws_url = resp
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                ScrapeError::Setup(format!("{} has no webSocketDebuggerUrl", version_url))
            })?;
        debug!("DevTools socket: {}", ws_url);

        let handler_config = HandlerConfig {
            request_timeout: Duration::from_secs(timeout),
            ..Default::default()
        };

        let (browser, handler) = Browser::connect_with_config(ws_url, handler_config)
            .await
            .map_err(|e| setup("Failed to connect to remote browser", &e))?;

        Ok((browser, spawn_handler(handler)))
    }

    #[async_trait]
    impl BrowserSession for ChromiumSession {
        async fn navigate(&mut self, url: &str) -> Result<()> {
            info!("Navigating to {}", url);
            let page = self.page()?;
            let nav_error = |reason: String| ScrapeError::Navigation {
                url: url.to_string(),
                reason,
            };

            let nav_params = NavigateParams::builder()
                .url(url)
                .build()
                .map_err(|e| nav_error(format!("Invalid URL: {}", e)))?;

            tokio::time::timeout(self.timeout, page.execute(nav_params))
                .await
                .map_err(|_| nav_error(format!("timed out after {}s", self.timeout.as_secs())))?
                .map_err(|e| nav_error(e.to_string()))?;

            match tokio::time::timeout(self.timeout, page.evaluate(WAIT_FOR_READY_SCRIPT.to_string()))
                .await
            {
                Ok(Ok(result)) => {
                    let state: String = result
                        .into_value()
                        .unwrap_or_else(|_| "unknown".to_string());
                    debug!("Page ready state: {}", state);
                }
                Ok(Err(e)) => debug!("Could not check ready state: {}", e),
                Err(_) => warn!("Timeout waiting for page ready state"),
            }
            Ok(())
        }

        async fn execute_script(&mut self, script: &str) -> Result<()> {
            self.page()?
                .evaluate(script.to_string())
                .await
                .map(|_| ())
                .map_err(|e| ScrapeError::Script(e.to_string()))
        }

        async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<bool> {
            let page = self.page()?;
            let poll = async {
                loop {
                    if page.find_element(selector).await.is_ok() {
                        return;
                    }
                    tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
                }
            };
            Ok(tokio::time::timeout(timeout, poll).await.is_ok())
        }

        async fn page_source(&mut self) -> Result<String> {
            self.page()?
                .content()
                .await
                .map_err(|e| ScrapeError::Snapshot(e.to_string()))
        }

        async fn current_url(&mut self) -> Result<Option<String>> {
            self.page()?
                .url()
                .await
                .map_err(|e| ScrapeError::Script(e.to_string()))
        }

        async fn title(&mut self) -> Result<Option<String>> {
            self.page()?
                .get_title()
                .await
                .map_err(|e| ScrapeError::Script(e.to_string()))
        }

        async fn screenshot(&mut self) -> Result<Vec<u8>> {
            let params = ScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .full_page(true)
                .build();
            self.page()?
                .screenshot(params)
                .await
                .map_err(|e| ScrapeError::Screenshot(e.to_string()))
        }

        async fn quit(&mut self) -> Result<()> {
            let mut failures = Vec::new();

            if let Some(page) = self.page.take() {
                if let Err(e) = page.close().await {
                    failures.push(format!("page: {}", e));
                }
            }

            if let Some(mut browser) = self.browser.take() {
                if self.owned {
                    if let Err(e) = browser.close().await {
                        failures.push(format!("browser: {}", e));
                    }
                    if let Err(e) = browser.wait().await {
                        failures.push(format!("process: {}", e));
                    }
                }
            }
            self.handler.abort();

            if failures.is_empty() {
                Ok(())
            } else {
                Err(ScrapeError::Teardown(failures.join("; ")))
            }
        }
    }

}
