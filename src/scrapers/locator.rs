//! Listing locator.
//!
//! Product-page anchors are the primary signal. When a redesign removes them
//! the locator walks a fixed chain of structural selectors and stops at the
//! first one that matches anything.

use tracing::{debug, warn};

use super::config::ExtractionConfig;
use super::page::PageTree;

/// Which locator strategy produced the candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatorStrategy {
    /// Anchors linking to product pages.
    ProductLinks,
    /// A structural fallback selector.
    Fallback(String),
    /// Nothing matched; the page structure has likely changed.
    Exhausted,
}

impl LocatorStrategy {
    /// Whether candidates are anchors that still need a container.
    pub fn yields_anchors(&self) -> bool {
        matches!(self, LocatorStrategy::ProductLinks)
    }
}

impl std::fmt::Display for LocatorStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocatorStrategy::ProductLinks => f.write_str("product links"),
            LocatorStrategy::Fallback(selector) => write!(f, "fallback '{}'", selector),
            LocatorStrategy::Exhausted => f.write_str("none"),
        }
    }
}

/// Candidates found on a page, in document order.
#[derive(Debug)]
pub struct Located<N> {
    pub strategy: LocatorStrategy,
    pub candidates: Vec<N>,
}

impl<N> Located<N> {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Find listing candidates on a loaded page.
pub fn locate<'p, T: PageTree>(page: &'p T, config: &ExtractionConfig) -> Located<T::Node<'p>> {
    match page.select_all(&config.product_link_selector) {
        Ok(anchors) if !anchors.is_empty() => {
            debug!("Found {} product anchors", anchors.len());
            return Located {
                strategy: LocatorStrategy::ProductLinks,
                candidates: anchors,
            };
        }
        Ok(_) => debug!("No product anchors, trying fallback selectors"),
        Err(e) => warn!("Product link selector unusable: {}", e),
    }

    for selector in &config.fallback_selectors {
        match page.select_all(selector) {
            Ok(nodes) if !nodes.is_empty() => {
                debug!("Fallback '{}' matched {} elements", selector, nodes.len());
                return Located {
                    strategy: LocatorStrategy::Fallback(selector.clone()),
                    candidates: nodes,
                };
            }
            Ok(_) => {}
            Err(e) => warn!("Skipping fallback selector: {}", e),
        }
    }

    Located {
        strategy: LocatorStrategy::Exhausted,
        candidates: Vec::new(),
    }
}
