//! Errors surfaced by a search.

use thiserror::Error;

/// Failures that can reach the caller of a search, or be logged on the way.
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// No browser session could be obtained.
    #[error("Browser setup failed: {0}")]
    Setup(String),

    #[error("Search query must not be empty")]
    InvalidQuery,

    #[error("max_results must be positive")]
    InvalidLimit,

    /// Page load failed or timed out.
    #[error("Navigation failed for {url}: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Script execution failed: {0}")]
    Script(String),

    /// The rendered DOM could not be read back.
    #[error("Could not read page source: {0}")]
    Snapshot(String),

    #[error("Screenshot capture failed: {0}")]
    Screenshot(String),

    /// A single listing could not be turned into a record.
    #[error("Listing extraction failed: {0}")]
    Listing(String),

    #[error("Browser teardown failed: {0}")]
    Teardown(String),
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
