//! Marketplace search scraper.
//!
//! [`MarketplaceScraper`] owns one browser session and runs searches through
//! it: navigate, pace lazy loading, snapshot the DOM, then hand the snapshot
//! to [`ListingExtractor`].

pub mod assemble;
pub mod browser;
pub mod config;
pub mod container;
pub mod extract;
pub mod fields;
pub mod locator;
pub mod pacing;
pub mod page;

pub use browser::{launch_session, BrowserEngineConfig, BrowserSession};
pub use config::{ExtractionConfig, PacingConfig, StrategyKind};
pub use extract::{ListingExtractor, PageExtraction};

use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::Config;
use crate::error::{Result, ScrapeError};
use crate::models::{ExtractedRecord, RecordVariant};
use pacing::Pacer;

/// Searches one marketplace through an exclusively owned browser session.
///
/// Call [`close`](Self::close) when done. Dropping an open scraper releases
/// the session without a graceful quit.
pub struct MarketplaceScraper {
    variant: RecordVariant,
    browser_config: BrowserEngineConfig,
    extractor: ListingExtractor,
    pacer: Pacer,
    session: Option<Box<dyn BrowserSession>>,
    searches: usize,
    last_screenshot: Option<Vec<u8>>,
}

impl MarketplaceScraper {
    /// Create a scraper; the browser is launched on the first search.
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config.base().map_err(ScrapeError::Setup)?;
        Ok(Self {
            variant: config.record,
            browser_config: config.browser.clone(),
            extractor: ListingExtractor::new(base_url, config.extraction.clone()),
            pacer: Pacer::new(config.pacing.clone()),
            session: None,
            searches: 0,
            last_screenshot: None,
        })
    }

    /// Create a scraper around an already-open session.
    pub fn with_session(config: &Config, session: Box<dyn BrowserSession>) -> Result<Self> {
        let mut scraper = Self::new(config)?;
        scraper.session = Some(session);
        Ok(scraper)
    }

    pub fn base_url(&self) -> &Url {
        self.extractor.base_url()
    }

    /// `{base_url}/search/{url-encoded query}`.
    pub fn search_url(&self, query: &str) -> String {
        format!(
            "{}/search/{}",
            self.base_url().as_str().trim_end_matches('/'),
            urlencoding::encode(query.trim())
        )
    }

    /// PNG of the last search page on which no listings were found.
    pub fn last_screenshot(&self) -> Option<&[u8]> {
        self.last_screenshot.as_deref()
    }

    /// Acquire the browser session if this scraper does not hold one yet.
    pub async fn ensure_session(&mut self) -> Result<()> {
        if self.session.is_none() {
            self.session = Some(launch_session(&self.browser_config).await?);
        }
        Ok(())
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Search the marketplace and return up to `max_results` records in page order.
    ///
    /// Only setup and input errors are returned. Navigation and page-level
    /// failures degrade to fewer records or an empty result.
    pub async fn search(&mut self, query: &str, max_results: usize) -> Result<Vec<ExtractedRecord>> {
        self.last_screenshot = None;
        if query.trim().is_empty() {
            return Err(ScrapeError::InvalidQuery);
        }
        if max_results == 0 {
            return Err(ScrapeError::InvalidLimit);
        }

        let url = self.search_url(query);
        let reused = self.searches > 0;
        self.ensure_session().await?;
        if reused {
            self.pacer.between_searches().await;
        }

        let Some(session) = self.session.as_deref_mut() else {
            return Err(ScrapeError::Setup("Browser session unavailable".to_string()));
        };

        info!("Searching for '{}'", query.trim());
        if let Err(e) = session.navigate(&url).await {
            warn!("{}; extracting from current page", e);
        }
        self.pacer.settle().await;
        self.pacer.load_lazy_content(session, max_results).await;

        let html = match session.page_source().await {
            Ok(html) => html,
            Err(e) => {
                error!("Giving up on '{}': {}", query.trim(), e);
                self.searches += 1;
                return Ok(Vec::new());
            }
        };

        let extraction = self.extractor.extract_html(&html, max_results, self.variant);
        self.searches += 1;

        if extraction.structure_changed() {
            let title = session.title().await.ok().flatten().unwrap_or_default();
            let current = session.current_url().await.ok().flatten().unwrap_or_default();
            warn!(
                "No listings found on '{}' ({}); page structure may have changed",
                title, current
            );
            match session.screenshot().await {
                Ok(png) => {
                    debug!("Captured {} byte diagnostic screenshot", png.len());
                    self.last_screenshot = Some(png);
                }
                Err(e) => warn!("{}", e),
            }
        }

        info!(
            "Found {} listings for '{}' from {} candidates",
            extraction.records.len(),
            query.trim(),
            extraction.candidates
        );
        Ok(extraction.records)
    }

    /// Release the browser session. Teardown failures are logged, never returned.
    pub async fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            match session.quit().await {
                Ok(()) => debug!("Browser session closed"),
                Err(e) => warn!("{}", e),
            }
        }
    }
}

impl Drop for MarketplaceScraper {
    fn drop(&mut self) {
        if self.session.is_some() {
            warn!("Scraper dropped without close(); releasing browser session");
        }
    }
}

/// Run a single search on a fresh session, closing it on every exit path.
///
/// Returns the records and, when nothing was found, the diagnostic screenshot.
pub async fn scrape_listings(
    config: &Config,
    query: &str,
    max_results: usize,
) -> Result<(Vec<ExtractedRecord>, Option<Vec<u8>>)> {
    let mut scraper = MarketplaceScraper::new(config)?;
    let result = scraper.search(query, max_results).await;
    let screenshot = scraper.last_screenshot().map(|png| png.to_vec());
    scraper.close().await;
    result.map(|records| (records, screenshot))
}
