//! Page-level extraction: locate, resolve, extract, assemble.
//!
//! Runs entirely over a DOM snapshot, so it is synchronous and can be fed
//! HTML fixtures directly.

use tracing::{debug, info};
use url::Url;

use super::assemble::Assembler;
use super::config::ExtractionConfig;
use super::container::{resolve_candidates, ListingCandidate};
use super::fields::{ContainerView, FieldExtractor, FieldValues};
use super::locator::{locate, LocatorStrategy};
use super::page::{PageNode, PageSnapshot, PageTree};
use crate::error::{Result, ScrapeError};
use crate::models::{ExtractedRecord, RecordVariant};

/// Outcome of extracting one page.
#[derive(Debug)]
pub struct PageExtraction {
    pub records: Vec<ExtractedRecord>,
    pub strategy: LocatorStrategy,
    /// Containers handed to the field extractor.
    pub candidates: usize,
}

impl PageExtraction {
    /// Whether the locator found nothing at all on the page.
    pub fn structure_changed(&self) -> bool {
        self.strategy == LocatorStrategy::Exhausted
    }
}

/// Turns a loaded results page into records.
pub struct ListingExtractor {
    base_url: Url,
    config: ExtractionConfig,
    fields: FieldExtractor,
}

impl ListingExtractor {
    pub fn new(base_url: Url, config: ExtractionConfig) -> Self {
        let fields = FieldExtractor::new(&config);
        Self {
            base_url,
            config,
            fields,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Parse serialized page source and extract from it.
    pub fn extract_html(
        &self,
        html: &str,
        max_results: usize,
        variant: RecordVariant,
    ) -> PageExtraction {
        let snapshot = PageSnapshot::parse(html);
        self.extract(&snapshot, max_results, variant)
    }

    pub fn extract<T: PageTree>(
        &self,
        page: &T,
        max_results: usize,
        variant: RecordVariant,
    ) -> PageExtraction {
        let located = locate(page, &self.config);
        let strategy = located.strategy.clone();
        if located.is_empty() {
            return PageExtraction {
                records: Vec::new(),
                strategy,
                candidates: 0,
            };
        }
        info!("Located {} candidates via {}", located.candidates.len(), strategy);

        let candidates = resolve_candidates(located, &self.base_url, max_results, &self.config);
        let total = candidates.len();
        let mut assembler = Assembler::new(variant, max_results);
        for (idx, candidate) in candidates.into_iter().enumerate() {
            if assembler.is_full() {
                break;
            }
            match self.listing_values(&candidate, variant) {
                Ok(values) => {
                    assembler.push(candidate.url, values);
                }
                Err(e) => debug!("Skipping listing {}: {}", idx + 1, e),
            }
        }

        PageExtraction {
            records: assembler.finish(),
            strategy,
            candidates: total,
        }
    }

    fn listing_values<N: PageNode>(
        &self,
        candidate: &ListingCandidate<N>,
        variant: RecordVariant,
    ) -> Result<FieldValues> {
        let view = ContainerView::of(&candidate.container);
        if view.lines().is_empty() && candidate.url.is_none() {
            return Err(ScrapeError::Listing(format!(
                "empty <{}> container without a product link",
                candidate.container.tag_name()
            )));
        }
        if candidate.degraded {
            debug!("Extracting from anchor only: {:?}", candidate.url);
        }
        Ok(self.fields.extract_fields(&view, variant.fields()))
    }
}
