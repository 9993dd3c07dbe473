//! Extraction and pacing configuration.
//!
//! Selector lists and positional constants change whenever the marketplace
//! reworks its markup, so they live here rather than in the strategies.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Hard ceiling on how far the container resolver may climb.
pub const MAX_ANCESTOR_DEPTH: usize = 5;

/// Stages of a field cascade, in the order they are tried by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Query child elements by field-specific selectors.
    Structural,
    /// Regex over the container's unrendered markup.
    Markup,
    /// Positional rule over the container's rendered lines.
    LinePosition,
    /// Regex over the container's whole rendered text.
    TextScan,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Structural => "structural",
            Self::Markup => "markup",
            Self::LinePosition => "line-position",
            Self::TextScan => "text-scan",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Child selectors probed by the structural stage, per field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSelectors {
    pub name: Vec<String>,
    pub price: Vec<String>,
    pub seller: Vec<String>,
    pub time: Vec<String>,
    pub condition: Vec<String>,
}

impl Default for FieldSelectors {
    fn default() -> Self {
        Self {
            name: strings(&[
                "h3",
                "h4",
                "h2",
                r#"p[class*="title" i]"#,
                r#"[class*="Title"]"#,
                r#"[data-testid*="title" i]"#,
                r#"[class*="name" i]:not([class*="user" i]):not([class*="seller" i])"#,
                r#"div[class*="D_zW"]"#,
                r#"p[class*="D_"]"#,
            ]),
            price: strings(&[
                r#"[class*="price" i]"#,
                r#"[data-testid*="price" i]"#,
                r#"p[class*="D_"]"#,
                r#"span[class*="D_"]"#,
            ]),
            seller: strings(&[
                r#"[class*="seller" i]"#,
                r#"[class*="username" i]"#,
                r#"[data-testid*="seller" i]"#,
                r#"a[href*="/u/"]"#,
            ]),
            time: strings(&[
                "time",
                r#"[class*="time" i]"#,
                r#"[class*="date" i]"#,
                r#"[data-testid*="time" i]"#,
            ]),
            condition: strings(&[
                r#"[class*="condition" i]"#,
                r#"[data-testid*="condition" i]"#,
            ]),
        }
    }
}

/// Locator, resolver and field-extraction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Anchors pointing at product pages (primary locator strategy).
    pub product_link_selector: String,
    /// Structural selectors tried in order when no product anchors exist.
    pub fallback_selectors: Vec<String>,
    /// Ancestor levels the resolver may climb (capped at 5).
    pub max_ancestor_depth: usize,
    /// Non-empty rendered lines an ancestor needs to count as a card.
    pub min_container_lines: usize,
    pub selectors: FieldSelectors,
    /// Seller profile and avatar markup, never read as the item title.
    pub seller_markup: Vec<String>,
    /// Order of cascade stages, shared by every field.
    pub cascade: Vec<StrategyKind>,
    pub name_min_length: usize,
    pub seller_max_length: usize,
    pub time_line_max_length: usize,
    pub condition_max_length: usize,
    /// Whole-value price literals for listings without a fixed price.
    pub offer_literals: Vec<String>,
    /// Condition phrases matched at the start of a line.
    pub condition_vocabulary: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            product_link_selector: r#"a[href*="/p/"]"#.to_string(),
            fallback_selectors: strings(&[
                "article",
                r#"[data-testid*="listing" i]"#,
                r#"[class*="ProductCard" i]"#,
                r#"[class*="ListingCard" i]"#,
                r#"[class*="listing" i]"#,
            ]),
            max_ancestor_depth: MAX_ANCESTOR_DEPTH,
            min_container_lines: 3,
            selectors: FieldSelectors::default(),
            seller_markup: strings(&[
                r#"a[href*="/u/"]"#,
                r#"[class*="avatar" i]"#,
                r#"[class*="seller" i]"#,
                r#"[class*="username" i]"#,
                r#"[data-testid*="seller" i]"#,
            ]),
            cascade: vec![
                StrategyKind::Structural,
                StrategyKind::Markup,
                StrategyKind::LinePosition,
                StrategyKind::TextScan,
            ],
            name_min_length: 4,
            seller_max_length: 50,
            time_line_max_length: 40,
            condition_max_length: 40,
            offer_literals: strings(&["Make Offer", "Free"]),
            condition_vocabulary: strings(&[
                "brand new",
                "like new",
                "lightly used",
                "well used",
                "heavily used",
                "well-maintained",
                "mint",
                "excellent condition",
                "good condition",
                "fair condition",
            ]),
        }
    }
}

impl ExtractionConfig {
    /// Ancestor depth actually used by the resolver.
    pub fn effective_ancestor_depth(&self) -> usize {
        self.max_ancestor_depth.min(MAX_ANCESTOR_DEPTH)
    }
}

/// Inclusive range of milliseconds a randomized wait is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub const fn zero() -> Self {
        Self::new(0, 0)
    }

    /// Draw a wait from the range. A reversed range is treated as its minimum.
    pub fn sample(&self) -> Duration {
        let ms = if self.max_ms > self.min_ms {
            rand::rng().random_range(self.min_ms..=self.max_ms)
        } else {
            self.min_ms
        };
        Duration::from_millis(ms)
    }
}

/// Waits bracketing navigation, scrolling and extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Wait after navigation before touching the page.
    pub settle_ms: u64,
    /// Wait after each scroll-to-bottom.
    pub scroll_delay: DelayRange,
    /// Wait before a search on an already-used session.
    pub search_delay: DelayRange,
    /// Minimum number of scrolls per search.
    pub min_scrolls: usize,
    /// Listings per row of the results grid.
    pub items_per_row: usize,
    /// Element whose presence marks the page as settled.
    pub ready_selector: String,
    pub ready_timeout_secs: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            settle_ms: 500,
            scroll_delay: DelayRange::new(500, 1000),
            search_delay: DelayRange::new(2000, 5000),
            min_scrolls: 2,
            items_per_row: 4,
            ready_selector: "body".to_string(),
            ready_timeout_secs: 10,
        }
    }
}

impl PacingConfig {
    /// No waits at all; for fixtures and tests.
    pub fn immediate() -> Self {
        Self {
            settle_ms: 0,
            scroll_delay: DelayRange::zero(),
            search_delay: DelayRange::zero(),
            ready_timeout_secs: 1,
            ..Default::default()
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
