//! End-to-end search tests against HTML fixtures served by a fake browser.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use marketscrape::scrapers::fields::validate::{PRICE_PATTERN, TIME_PATTERN};
use marketscrape::scrapers::PacingConfig;
use marketscrape::{
    BrowserSession, Config, ExtractedRecord, MarketplaceScraper, RecordVariant, ScrapeError,
    SENTINEL,
};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfixture";

/// Calls observed by the fake, shared with the test.
#[derive(Debug, Default)]
struct SessionLog {
    navigations: Vec<String>,
    scripts: usize,
    screenshots: usize,
    quits: usize,
    dropped: bool,
}

/// Serves a fixed page per URL, falling back to `default_page`.
struct FixtureSession {
    pages: HashMap<String, String>,
    default_page: String,
    current: Option<String>,
    fail_navigation: bool,
    fail_source: bool,
    fail_quit: bool,
    log: Arc<Mutex<SessionLog>>,
}

impl FixtureSession {
    fn new(html: &str) -> (Self, Arc<Mutex<SessionLog>>) {
        let log = Arc::new(Mutex::new(SessionLog::default()));
        let session = Self {
            pages: HashMap::new(),
            default_page: html.to_string(),
            current: None,
            fail_navigation: false,
            fail_source: false,
            fail_quit: false,
            log: Arc::clone(&log),
        };
        (session, log)
    }

    fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }
}

#[async_trait]
impl BrowserSession for FixtureSession {
    async fn navigate(&mut self, url: &str) -> marketscrape::Result<()> {
        self.log.lock().unwrap().navigations.push(url.to_string());
        if self.fail_navigation {
            return Err(ScrapeError::Navigation {
                url: url.to_string(),
                reason: "timed out after 30s".to_string(),
            });
        }
        self.current = Some(url.to_string());
        Ok(())
    }

    async fn execute_script(&mut self, _script: &str) -> marketscrape::Result<()> {
        self.log.lock().unwrap().scripts += 1;
        Ok(())
    }

    async fn wait_for_selector(
        &mut self,
        _selector: &str,
        _timeout: Duration,
    ) -> marketscrape::Result<bool> {
        Ok(true)
    }

    async fn page_source(&mut self) -> marketscrape::Result<String> {
        if self.fail_source {
            return Err(ScrapeError::Snapshot("target closed".to_string()));
        }
        Ok(self
            .current
            .as_ref()
            .and_then(|url| self.pages.get(url))
            .unwrap_or(&self.default_page)
            .clone())
    }

    async fn current_url(&mut self) -> marketscrape::Result<Option<String>> {
        Ok(self.current.clone())
    }

    async fn title(&mut self) -> marketscrape::Result<Option<String>> {
        Ok(Some("Search results".to_string()))
    }

    async fn screenshot(&mut self) -> marketscrape::Result<Vec<u8>> {
        self.log.lock().unwrap().screenshots += 1;
        Ok(PNG.to_vec())
    }

    async fn quit(&mut self) -> marketscrape::Result<()> {
        self.log.lock().unwrap().quits += 1;
        if self.fail_quit {
            return Err(ScrapeError::Teardown("browser already gone".to_string()));
        }
        Ok(())
    }
}

impl Drop for FixtureSession {
    fn drop(&mut self) {
        if let Ok(mut log) = self.log.lock() {
            log.dropped = true;
        }
    }
}

fn test_config() -> Config {
    Config {
        pacing: PacingConfig::immediate(),
        ..Default::default()
    }
}

fn scraper_for(session: FixtureSession) -> MarketplaceScraper {
    MarketplaceScraper::with_session(&test_config(), Box::new(session)).unwrap()
}

fn card(i: usize) -> String {
    format!(
        r#"<div class="card">
             <p>seller{i}</p>
             <p>{i} days ago</p>
             <a href="/p/item-{i}"><p>Item number {i}</p></a>
             <p>S${i}0</p>
           </div>"#
    )
}

fn grid(cards: &[String]) -> String {
    format!(
        "<html><body><main><div class=\"grid\">{}</div></main></body></html>",
        cards.join("\n")
    )
}

fn assert_valid(records: &[ExtractedRecord], max_results: usize) {
    assert!(records.len() <= max_results);

    let mut urls: Vec<&str> = records
        .iter()
        .map(|r| r.url.as_str())
        .filter(|u| *u != SENTINEL)
        .collect();
    let total = urls.len();
    urls.sort();
    urls.dedup();
    assert_eq!(urls.len(), total, "duplicate urls in {:?}", records);

    for record in records {
        if record.price != SENTINEL {
            assert!(
                PRICE_PATTERN.is_match(&record.price) || record.price == "Make Offer"
                    || record.price == "Free",
                "bad price {:?}",
                record.price
            );
        }
        if let Some(time) = record.time.as_deref().filter(|t| *t != SENTINEL) {
            assert!(TIME_PATTERN.is_match(time), "bad time {:?}", time);
        }
        if record.url != SENTINEL {
            assert!(record.url.starts_with("https://"));
        }
    }
}

#[tokio::test]
async fn caps_results_in_encounter_order() {
    let cards: Vec<String> = (1..=8).map(card).collect();
    let (session, log) = FixtureSession::new(&grid(&cards));
    let mut scraper = scraper_for(session);

    let records = scraper.search("item", 5).await.unwrap();
    assert_eq!(records.len(), 5);
    assert_valid(&records, 5);

    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Item number 1",
            "Item number 2",
            "Item number 3",
            "Item number 4",
            "Item number 5"
        ]
    );
    let first = &records[0];
    assert_eq!(first.price, "S$10");
    assert_eq!(first.seller.as_deref(), Some("seller1"));
    assert_eq!(first.time.as_deref(), Some("1 days ago"));
    assert_eq!(first.condition.as_deref(), Some(SENTINEL));
    assert_eq!(first.url, "https://www.carousell.sg/p/item-1");

    assert!(scraper.last_screenshot().is_none());
    let log = log.lock().unwrap();
    assert_eq!(log.navigations, vec!["https://www.carousell.sg/search/item"]);
    // max(2, 5 / 4 + 1)
    assert_eq!(log.scripts, 2);
    assert_eq!(log.screenshots, 0);
}

#[tokio::test]
async fn anchor_without_name_line_keeps_url() {
    let html = r#"<html><body><div class="results">
        <a href="/p/mystery-box-77"><p>S$50</p><p>2 days ago</p></a>
    </div></body></html>"#;
    let (session, _log) = FixtureSession::new(html);
    let mut scraper = scraper_for(session);

    let records = scraper.search("mystery box", 10).await.unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.name, SENTINEL);
    assert_eq!(record.price, "S$50");
    assert_eq!(record.time.as_deref(), Some("2 days ago"));
    assert_eq!(record.url, "https://www.carousell.sg/p/mystery-box-77");
}

#[tokio::test]
async fn empty_page_returns_nothing_with_screenshot() {
    let html = "<html><body><h1>Something went wrong</h1><p>Try again later</p></body></html>";
    let (session, log) = FixtureSession::new(html);
    let mut scraper = scraper_for(session);

    let records = scraper.search("lamp", 10).await.unwrap();
    assert!(records.is_empty());
    assert_eq!(scraper.last_screenshot(), Some(PNG));
    assert_eq!(log.lock().unwrap().screenshots, 1);
}

#[tokio::test]
async fn relative_and_absolute_hrefs_dedup() {
    let html = r#"<html><body><div class="grid">
        <div class="card"><a href="/p/desk-5"><p>Standing desk</p></a><p>S$150</p><p>3 hours ago</p></div>
        <div class="card"><a href="https://www.carousell.sg/p/desk-5"><p>Standing desk</p></a><p>S$150</p><p>3 hours ago</p></div>
        <div class="card"><a href="/p/chair-6"><p>Office chair</p></a><p>S$60</p><p>4 hours ago</p></div>
    </div></body></html>"#;
    let (session, _log) = FixtureSession::new(html);
    let mut scraper = scraper_for(session);

    let records = scraper.search("desk", 10).await.unwrap();
    assert_valid(&records, 10);
    let urls: Vec<&str> = records.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://www.carousell.sg/p/desk-5",
            "https://www.carousell.sg/p/chair-6"
        ]
    );
}

#[tokio::test]
async fn fallback_selectors_find_cards_without_product_links() {
    let html = r#"<html><body>
        <div class="ListingCard"><h3>Rice cooker</h3><span>S$25</span></div>
        <div class="ListingCard"><h3>Air fryer</h3><span>Make Offer</span></div>
    </body></html>"#;
    let (session, _log) = FixtureSession::new(html);
    let mut scraper = scraper_for(session);

    let records = scraper.search("kitchen", 10).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].name, "Rice cooker");
    assert_eq!(records[0].price, "S$25");
    assert_eq!(records[0].url, SENTINEL);
    assert_eq!(records[1].price, "Make Offer");
    assert!(scraper.last_screenshot().is_none());
}

/// Listing card shaped like the live site: hashed `D_` classes, a seller
/// block linking to `/u/` with an avatar, and separate image and text
/// anchors pointing at the same product.
fn site_card(
    id: u32,
    seller: &str,
    posted: &str,
    title: &str,
    price: &str,
    condition: &str,
) -> String {
    format!(
        r#"<div class="D_qc" data-testid="listing-card-{id}">
             <a class="D_qe" href="/u/{seller}/">
               <div class="D_qf"><img class="D_qg" alt="{seller}" src="/avatars/{seller}.jpg"></div>
               <div class="D_qh">
                 <p class="D_qi" data-testid="listing-card-text-seller-name">{seller}</p>
                 <div class="D_qj"><p class="D_qk">{posted}</p></div>
               </div>
             </a>
             <a class="D_ql" href="/p/listing-{id}/">
               <div class="D_qm"><img class="D_qn" alt="{title}" src="/photos/{id}.jpg"></div>
             </a>
             <a class="D_ql" href="/p/listing-{id}/">
               <p class="D_qo">{title}</p>
               <div class="D_qp"><p class="D_qq" title="{price}">{price}</p></div>
               <p class="D_qo">{condition}</p>
             </a>
           </div>"#
    )
}

#[tokio::test]
async fn site_shaped_cards_fill_every_field() {
    let cards = vec![
        site_card(1001, "gadgetguy", "3 hours ago", "Nintendo Switch OLED", "S$320", "Like new"),
        site_card(1002, "camera_kaki", "1 day ago", "Fujifilm X100V silver", "S$1,650", "Lightly used"),
    ];
    let (session, _log) = FixtureSession::new(&grid(&cards));
    let mut scraper = scraper_for(session);

    let records = scraper.search("switch", 10).await.unwrap();
    assert_valid(&records, 10);
    assert_eq!(
        records,
        vec![
            ExtractedRecord {
                name: "Nintendo Switch OLED".to_string(),
                price: "S$320".to_string(),
                seller: Some("gadgetguy".to_string()),
                time: Some("3 hours ago".to_string()),
                condition: Some("Like new".to_string()),
                url: "https://www.carousell.sg/p/listing-1001/".to_string(),
            },
            ExtractedRecord {
                name: "Fujifilm X100V silver".to_string(),
                price: "S$1,650".to_string(),
                seller: Some("camera_kaki".to_string()),
                time: Some("1 day ago".to_string()),
                condition: Some("Lightly used".to_string()),
                url: "https://www.carousell.sg/p/listing-1002/".to_string(),
            },
        ]
    );
}

#[tokio::test]
async fn nested_fallback_matches_yield_one_record_per_card() {
    let html = r#"<html><body>
        <div data-testid="listing-card"><h3 data-testid="listing-title">Rice cooker</h3><span data-testid="listing-price">S$25</span></div>
        <div data-testid="listing-card"><h3 data-testid="listing-title">Air fryer</h3><span data-testid="listing-price">Make Offer</span></div>
    </body></html>"#;
    let (session, _log) = FixtureSession::new(html);
    let mut scraper = scraper_for(session);

    let records = scraper.search("kitchen", 2).await.unwrap();
    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Rice cooker", "Air fryer"]);
    assert_eq!(records[0].price, "S$25");
    assert_eq!(records[1].price, "Make Offer");
}

#[tokio::test]
async fn minimal_variant_only_carries_three_keys() {
    let cards: Vec<String> = (1..=3).map(card).collect();
    let (session, _log) = FixtureSession::new(&grid(&cards));
    let config = Config {
        record: RecordVariant::Minimal,
        ..test_config()
    };
    let mut scraper = MarketplaceScraper::with_session(&config, Box::new(session)).unwrap();

    let records = scraper.search("item", 10).await.unwrap();
    assert_eq!(records.len(), 3);
    let json = serde_json::to_value(&records[0]).unwrap();
    let mut keys: Vec<&String> = json.as_object().unwrap().keys().collect();
    keys.sort();
    assert_eq!(keys, vec!["name", "price", "url"]);
}

#[tokio::test]
async fn navigation_failure_still_extracts() {
    let cards: Vec<String> = (1..=2).map(card).collect();
    let (mut session, _log) = FixtureSession::new(&grid(&cards));
    session.fail_navigation = true;
    let mut scraper = scraper_for(session);

    let records = scraper.search("item", 10).await.unwrap();
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn snapshot_failure_yields_empty_result() {
    let (mut session, log) = FixtureSession::new(&grid(&[card(1)]));
    session.fail_source = true;
    let mut scraper = scraper_for(session);

    let records = scraper.search("item", 10).await.unwrap();
    assert!(records.is_empty());
    assert_eq!(log.lock().unwrap().screenshots, 0);
}

#[tokio::test]
async fn rejects_invalid_input() {
    let (session, log) = FixtureSession::new("<html></html>");
    let mut scraper = scraper_for(session);

    assert!(matches!(
        scraper.search("   ", 5).await,
        Err(ScrapeError::InvalidQuery)
    ));
    assert!(matches!(
        scraper.search("lamp", 0).await,
        Err(ScrapeError::InvalidLimit)
    ));
    assert!(log.lock().unwrap().navigations.is_empty());
}

#[tokio::test]
async fn screenshot_resets_between_searches() {
    let cards: Vec<String> = (1..=2).map(card).collect();
    let (session, log) = FixtureSession::new("<html><body><p>No results</p></body></html>");
    let session = session.with_page("https://www.carousell.sg/search/item", &grid(&cards));
    let mut scraper = scraper_for(session);

    assert!(scraper.search("nothing here", 5).await.unwrap().is_empty());
    assert!(scraper.last_screenshot().is_some());

    let records = scraper.search("item", 5).await.unwrap();
    assert_eq!(records.len(), 2);
    assert!(scraper.last_screenshot().is_none());
    assert_eq!(
        log.lock().unwrap().navigations,
        vec![
            "https://www.carousell.sg/search/nothing%20here",
            "https://www.carousell.sg/search/item"
        ]
    );
}

#[tokio::test]
async fn close_swallows_teardown_errors() {
    let (mut session, log) = FixtureSession::new("<html></html>");
    session.fail_quit = true;
    let mut scraper = scraper_for(session);

    assert!(scraper.has_session());
    scraper.close().await;
    assert!(!scraper.has_session());
    scraper.close().await;
    assert_eq!(log.lock().unwrap().quits, 1);
}

#[tokio::test]
async fn dropping_without_close_releases_session() {
    let (session, log) = FixtureSession::new(&grid(&[card(1)]));
    let mut scraper = scraper_for(session);
    assert_eq!(scraper.search("item", 5).await.unwrap().len(), 1);

    drop(scraper);
    let log = log.lock().unwrap();
    assert!(log.dropped);
    assert_eq!(log.quits, 0);
}

#[test]
fn search_url_encodes_query() {
    let scraper = MarketplaceScraper::new(&test_config()).unwrap();
    assert_eq!(
        scraper.search_url("nintendo switch & games"),
        "https://www.carousell.sg/search/nintendo%20switch%20%26%20games"
    );
}
