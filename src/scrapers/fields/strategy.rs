//! Extraction strategies making up a field cascade.
//!
//! Each strategy inspects a [`ContainerView`] and returns a validated value or
//! nothing. Failures inside a strategy (bad selector, regex miss) never leave
//! it; the cascade just moves on.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::validate::{Validators, HANDLE_PATTERN, PRICE_PATTERN, TIME_PATTERN};
use super::view::ContainerView;
use crate::models::Field;
use crate::scrapers::config::{ExtractionConfig, StrategyKind};
use crate::scrapers::page::non_empty_lines;

/// Seller profile link inside raw markup, e.g. `href="/u/gadgetguy/"`.
static PROFILE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"href="(?:https?://[^"/]+)?/u/([^"/?#]+)"#).unwrap()
});

/// Text between two tags in raw markup.
static TEXT_SEGMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">([^<>]+)<").unwrap());

/// `Condition: Like new` style labels.
static CONDITION_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)condition\s*[:\-]\s*([^\n]{1,60})").unwrap());

/// One stage of a field cascade.
pub trait FieldStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Try to produce a validated value for this strategy's field.
    fn attempt(&self, view: &ContainerView<'_>, validators: &Validators) -> Option<String>;
}

impl StrategyKind {
    /// Create the strategy of this kind for one field.
    pub fn create_strategy(&self, field: Field, config: &ExtractionConfig) -> Box<dyn FieldStrategy> {
        match self {
            Self::Structural => Box::new(StructuralProbe {
                field,
                selectors: selectors_for(field, config),
            }),
            Self::Markup => Box::new(MarkupProbe {
                field,
                seller_markup: config.seller_markup.clone(),
            }),
            Self::LinePosition => Box::new(LinePosition { field }),
            Self::TextScan => Box::new(TextScan { field }),
        }
    }
}

fn selectors_for(field: Field, config: &ExtractionConfig) -> Vec<String> {
    let selectors = &config.selectors;
    match field {
        Field::Name => selectors.name.clone(),
        Field::Price => selectors.price.clone(),
        Field::Seller => selectors.seller.clone(),
        Field::Time => selectors.time.clone(),
        Field::Condition => selectors.condition.clone(),
    }
}

/// Child elements whose class or data attributes name the field.
pub struct StructuralProbe {
    field: Field,
    selectors: Vec<String>,
}

impl StructuralProbe {
    fn validate(
        &self,
        text: &str,
        view: &ContainerView<'_>,
        validators: &Validators,
    ) -> Option<String> {
        match self.field {
            Field::Price => validators.price(text),
            Field::Time => validators.time(text),
            // Elements spanning several lines are wrappers, not values.
            Field::Name => single_line(text)
                .filter(|line| !is_seller_line(view, validators, line))
                .and_then(|line| validators.name(&line)),
            Field::Seller => single_line(text).and_then(|line| validators.seller_label(&line)),
            Field::Condition => single_line(text).and_then(|line| validators.condition(&line)),
        }
    }
}

impl FieldStrategy for StructuralProbe {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Structural
    }

    fn attempt(&self, view: &ContainerView<'_>, validators: &Validators) -> Option<String> {
        for selector in &self.selectors {
            let texts = match view.texts_matching(selector) {
                Ok(texts) => texts,
                Err(e) => {
                    debug!("Skipping {} probe: {}", self.field, e);
                    continue;
                }
            };
            if let Some(value) = texts.iter().find_map(|t| self.validate(t, view, validators)) {
                return Some(value);
            }
        }
        None
    }
}

/// Unrendered markup: attributes, profile links and script-injected values
/// the page hides from its text.
pub struct MarkupProbe {
    field: Field,
    seller_markup: Vec<String>,
}

impl FieldStrategy for MarkupProbe {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Markup
    }

    fn attempt(&self, view: &ContainerView<'_>, validators: &Validators) -> Option<String> {
        let markup = view.markup();
        match self.field {
            Field::Price => PRICE_PATTERN
                .find_iter(markup)
                .find_map(|m| validators.price(m.as_str())),
            Field::Time => TIME_PATTERN
                .find_iter(markup)
                .find_map(|m| validators.time(m.as_str())),
            Field::Seller => PROFILE_LINK
                .captures_iter(markup)
                .filter_map(|c| c.get(1))
                .find_map(|m| validators.seller_label(&decode_entities(m.as_str()))),
            Field::Name => view
                .labels_outside(&self.seller_markup)
                .iter()
                .map(|label| label.trim())
                .filter(|label| !is_seller_line(view, validators, label))
                .find_map(|label| validators.name(label)),
            Field::Condition => TEXT_SEGMENT
                .captures_iter(markup)
                .filter_map(|c| c.get(1))
                .find_map(|m| validators.condition(&decode_entities(m.as_str()))),
        }
    }
}

/// Field-specific positional rule over the rendered lines.
pub struct LinePosition {
    field: Field,
}

impl FieldStrategy for LinePosition {
    fn kind(&self) -> StrategyKind {
        StrategyKind::LinePosition
    }

    fn attempt(&self, view: &ContainerView<'_>, validators: &Validators) -> Option<String> {
        let lines = view.lines();
        let first_time = lines.iter().position(|l| validators.is_time_line(l));
        match self.field {
            // The title follows the seller/time header on a listing card.
            Field::Name => first_time
                .and_then(|i| lines.get(i + 1))
                .and_then(|line| validators.name(line)),
            Field::Price => lines.iter().find_map(|l| validators.price(l)),
            Field::Time => first_time.and_then(|i| validators.time(&lines[i])),
            Field::Seller => lines
                .iter()
                .find_map(|l| validators.handle(l))
                .or_else(|| {
                    first_time
                        .filter(|&i| i > 0)
                        .and_then(|i| validators.seller_at(lines, i - 1))
                }),
            Field::Condition => lines.iter().find_map(|l| validators.condition(l)),
        }
    }
}

/// Last resort: regex over the whole rendered text.
pub struct TextScan {
    field: Field,
}

impl FieldStrategy for TextScan {
    fn kind(&self) -> StrategyKind {
        StrategyKind::TextScan
    }

    fn attempt(&self, view: &ContainerView<'_>, validators: &Validators) -> Option<String> {
        let text = view.text();
        match self.field {
            Field::Price => PRICE_PATTERN
                .find_iter(text)
                .find_map(|m| validators.price(&collapse_whitespace(m.as_str()))),
            Field::Time => TIME_PATTERN
                .find_iter(text)
                .find_map(|m| validators.time(&collapse_whitespace(m.as_str()))),
            Field::Seller => HANDLE_PATTERN
                .captures_iter(text)
                .filter_map(|c| c.get(1))
                .map(|m| m.as_str().to_string())
                .next(),
            Field::Condition => CONDITION_LABEL
                .captures_iter(text)
                .filter_map(|c| c.get(1))
                .find_map(|m| validators.condition(m.as_str())),
            Field::Name => {
                let lines = view.lines();
                lines
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| validators.seller_at(lines, *i).is_none())
                    .find_map(|(_, line)| validators.name(line))
            }
        }
    }
}

/// Whether `candidate` is the card's seller line rather than its title.
fn is_seller_line(view: &ContainerView<'_>, validators: &Validators, candidate: &str) -> bool {
    let lines = view.lines();
    lines
        .iter()
        .enumerate()
        .any(|(i, line)| line == candidate && validators.seller_at(lines, i).is_some())
}

fn single_line(text: &str) -> Option<String> {
    let mut lines = non_empty_lines(text);
    if lines.len() == 1 {
        lines.pop()
    } else {
        None
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Undo the entity escaping `scraper` applies when serializing markup.
fn decode_entities(s: &str) -> String {
    s.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}
