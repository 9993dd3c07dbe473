//! marketscrape - resilient listing extraction for marketplace search pages.
//!
//! A search drives one browser session through the results page, snapshots
//! the DOM, and turns each listing card into an [`ExtractedRecord`]. Every
//! field is read through a cascade of strategies so that a markup change
//! degrades individual fields to `"N/A"` instead of breaking the search.

pub mod config;
pub mod error;
pub mod models;
pub mod scrapers;

pub use config::Config;
pub use error::{Result, ScrapeError};
pub use models::{ExtractedRecord, Field, RecordVariant, SENTINEL};
pub use scrapers::{scrape_listings, BrowserSession, MarketplaceScraper};
