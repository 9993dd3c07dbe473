//! Container resolver.
//!
//! A product anchor usually wraps only the title or the thumbnail. The card
//! holding price, seller and time sits a few levels up; the first ancestor
//! whose rendered text spans enough lines is taken as that card.

use std::collections::HashSet;

use tracing::debug;
use url::Url;

use super::config::ExtractionConfig;
use super::locator::Located;
use super::page::PageNode;

/// A container ready for field extraction.
#[derive(Debug, Clone)]
pub struct ListingCandidate<N> {
    pub container: N,
    /// Absolute product URL, when one could be resolved.
    pub url: Option<String>,
    /// Whether resolution fell back to the anchor itself.
    pub degraded: bool,
}

/// Resolve an href against the marketplace base URL.
pub fn absolute_url(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    base.join(href).ok().map(|u| u.to_string())
}

/// Anchors deduplicated by absolute URL, capped at `limit`, in page order.
pub fn unique_anchors<N: PageNode>(anchors: Vec<N>, base: &Url, limit: usize) -> Vec<(N, String)> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for anchor in anchors {
        if unique.len() >= limit {
            break;
        }
        let Some(url) = anchor.attribute("href").and_then(|h| absolute_url(base, &h)) else {
            continue;
        };
        if seen.insert(url.clone()) {
            unique.push((anchor, url));
        }
    }
    unique
}

/// Climb at most the configured depth looking for the listing card.
///
/// Returns the container and whether it is the anchor itself.
pub fn resolve_container<N: PageNode>(anchor: &N, config: &ExtractionConfig) -> (N, bool) {
    let mut current = anchor.clone();
    for level in 1..=config.effective_ancestor_depth() {
        let Some(parent) = current.parent() else {
            break;
        };
        if parent.lines().len() >= config.min_container_lines {
            debug!("Container found {} levels above <{}>", level, anchor.tag_name());
            return (parent, false);
        }
        current = parent;
    }
    (anchor.clone(), true)
}

/// Turn locator output into containers ready for extraction.
///
/// Anchors are deduplicated and capped before any resolution work. Fallback
/// candidates are already card-level; matches nested inside another match
/// (a card's own `listing-title`, say) are dropped.
pub fn resolve_candidates<N: PageNode>(
    located: Located<N>,
    base: &Url,
    max_results: usize,
    config: &ExtractionConfig,
) -> Vec<ListingCandidate<N>> {
    if located.strategy.yields_anchors() {
        return unique_anchors(located.candidates, base, max_results)
            .into_iter()
            .map(|(anchor, url)| {
                let (container, degraded) = resolve_container(&anchor, config);
                ListingCandidate {
                    container,
                    url: Some(url),
                    degraded,
                }
            })
            .collect();
    }

    let nodes = located.candidates;
    let outermost: Vec<N> = nodes
        .iter()
        .filter(|node| !node.is_inside(&nodes))
        .cloned()
        .collect();
    if outermost.len() < nodes.len() {
        debug!("Dropped {} nested fallback matches", nodes.len() - outermost.len());
    }

    outermost
        .into_iter()
        .map(|node| {
            let url = embedded_product_url(&node, base, config);
            ListingCandidate {
                container: node,
                url,
                degraded: false,
            }
        })
        .collect()
}

/// Product URL from the node itself or its first product-link descendant.
fn embedded_product_url<N: PageNode>(
    node: &N,
    base: &Url,
    config: &ExtractionConfig,
) -> Option<String> {
    let href = match node.children_matching(&config.product_link_selector) {
        Ok(links) => links.first().and_then(|a| a.attribute("href")),
        Err(e) => {
            debug!("Product link lookup failed: {}", e);
            None
        }
    };
    let href = href.or_else(|| {
        if node.tag_name() == "a" {
            node.attribute("href")
        } else {
            None
        }
    })?;
    absolute_url(base, &href)
}
