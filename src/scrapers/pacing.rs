//! Pacing controller.
//!
//! Result grids populate as the user scrolls, and there is no reliable
//! "done loading" signal. The controller scrolls a number of times scaled to
//! the requested result count, waits a randomized interval after each scroll,
//! then waits once for the ready selector.

use std::time::Duration;

use tracing::{debug, warn};

use super::browser::BrowserSession;
use super::config::PacingConfig;

/// Script that scrolls the window to the bottom of the document.
pub const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight);";

/// Number of scrolls needed to surface roughly `max_results` listings.
pub fn scroll_count(max_results: usize, config: &PacingConfig) -> usize {
    let rows = max_results / config.items_per_row.max(1) + 1;
    rows.max(config.min_scrolls)
}

/// Waits and scrolling around one search.
#[derive(Debug, Clone)]
pub struct Pacer {
    config: PacingConfig,
}

impl Pacer {
    pub fn new(config: PacingConfig) -> Self {
        Self { config }
    }

    /// Randomized pause between consecutive searches on one session.
    pub async fn between_searches(&self) {
        let delay = self.config.search_delay.sample();
        debug!("Waiting {:?} before next search", delay);
        tokio::time::sleep(delay).await;
    }

    /// Short wait for the freshly navigated page to settle.
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(self.config.settle_ms)).await;
    }

    /// Scroll to trigger lazy loading, then wait for the ready selector.
    ///
    /// Script failures are logged and skipped. Returns the number of scrolls
    /// that succeeded.
    pub async fn load_lazy_content(
        &self,
        session: &mut dyn BrowserSession,
        max_results: usize,
    ) -> usize {
        let count = scroll_count(max_results, &self.config);
        let mut completed = 0;
        for i in 0..count {
            match session.execute_script(SCROLL_TO_BOTTOM).await {
                Ok(()) => completed += 1,
                Err(e) => warn!("Scroll {}/{} failed: {}", i + 1, count, e),
            }
            tokio::time::sleep(self.config.scroll_delay.sample()).await;
        }
        debug!("Scrolled {}/{} times", completed, count);

        let timeout = Duration::from_secs(self.config.ready_timeout_secs);
        match session
            .wait_for_selector(&self.config.ready_selector, timeout)
            .await
        {
            Ok(true) => {}
            Ok(false) => warn!(
                "Timeout waiting for '{}' after {:?}",
                self.config.ready_selector, timeout
            ),
            Err(e) => warn!("Ready check failed: {}", e),
        }
        completed
    }
}
