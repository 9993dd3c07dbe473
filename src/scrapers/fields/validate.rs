//! Per-field validators.
//!
//! A validator either rejects a candidate or returns the canonical value to
//! store, e.g. the price token cut out of a longer label.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::scrapers::config::ExtractionConfig;

/// Currency marker followed by a digit group, e.g. `$5`, `S$ 1,200`, `S$10.50`.
pub static PRICE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"S?\$\s*(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d{2})?").unwrap()
});

/// Relative posting time, e.g. `3 days ago`, `1 hour ago`, `just now`.
pub static TIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d+\s*(?:second|minute|hour|day|week|month|year)s?\s+ago\b|\bjust now\b")
        .unwrap()
});

/// A single `@handle` token.
pub static HANDLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)(@[A-Za-z0-9_.\-]{1,48})").unwrap());

/// Validators configured from [`ExtractionConfig`].
#[derive(Debug, Clone)]
pub struct Validators {
    name_min_length: usize,
    seller_max_length: usize,
    time_line_max_length: usize,
    condition_max_length: usize,
    offer_literals: Vec<String>,
    condition: Option<Regex>,
}

impl Validators {
    pub fn new(config: &ExtractionConfig) -> Self {
        let condition = build_condition_pattern(&config.condition_vocabulary);
        Self {
            name_min_length: config.name_min_length,
            seller_max_length: config.seller_max_length,
            time_line_max_length: config.time_line_max_length,
            condition_max_length: config.condition_max_length,
            offer_literals: config.offer_literals.clone(),
            condition,
        }
    }

    /// Price token or offer literal.
    pub fn price(&self, candidate: &str) -> Option<String> {
        let candidate = candidate.trim();
        if let Some(literal) = self.offer_literal(candidate) {
            return Some(literal);
        }
        PRICE_PATTERN
            .find(candidate)
            .map(|m| m.as_str().trim().to_string())
    }

    /// Relative-time token.
    pub fn time(&self, candidate: &str) -> Option<String> {
        TIME_PATTERN
            .find(candidate.trim())
            .map(|m| m.as_str().to_string())
    }

    /// A short line that carries a relative time and little else.
    pub fn is_time_line(&self, line: &str) -> bool {
        line.chars().count() <= self.time_line_max_length && TIME_PATTERN.is_match(line)
    }

    /// Item title: long enough, no currency marker, not another field's value.
    pub fn name(&self, candidate: &str) -> Option<String> {
        let candidate = candidate.trim();
        if candidate.chars().count() < self.name_min_length
            || candidate.contains('$')
            || self.is_time_line(candidate)
            || self.offer_literal(candidate).is_some()
            || self.handle(candidate).is_some()
            || self.condition(candidate).is_some()
        {
            return None;
        }
        Some(candidate.to_string())
    }

    /// An `@`-prefixed handle occupying the whole candidate.
    pub fn handle(&self, candidate: &str) -> Option<String> {
        let candidate = candidate.trim();
        if !candidate.starts_with('@') {
            return None;
        }
        HANDLE_PATTERN
            .captures(candidate)
            .and_then(|c| c.get(1))
            .filter(|m| m.as_str().len() == candidate.len())
            .map(|m| m.as_str().to_string())
    }

    /// A seller label found under seller-specific markup.
    pub fn seller_label(&self, candidate: &str) -> Option<String> {
        if let Some(handle) = self.handle(candidate) {
            return Some(handle);
        }
        let candidate = candidate.trim();
        if candidate.is_empty()
            || candidate.chars().count() >= self.seller_max_length
            || candidate.contains('$')
            || self.is_time_line(candidate)
        {
            return None;
        }
        Some(candidate.to_string())
    }

    /// Seller from a line sequence: the line at `index` must be a handle, or a
    /// short label sitting directly above a time line.
    pub fn seller_at(&self, lines: &[String], index: usize) -> Option<String> {
        let line = lines.get(index)?;
        if let Some(handle) = self.handle(line) {
            return Some(handle);
        }
        let next = lines.get(index + 1)?;
        if !self.is_time_line(next) {
            return None;
        }
        self.seller_label(line)
    }

    /// Condition phrase at the start of a short line.
    pub fn condition(&self, candidate: &str) -> Option<String> {
        let candidate = candidate.trim();
        if candidate.chars().count() > self.condition_max_length {
            return None;
        }
        let pattern = self.condition.as_ref()?;
        if pattern.is_match(candidate) {
            Some(candidate.to_string())
        } else {
            None
        }
    }

    fn offer_literal(&self, candidate: &str) -> Option<String> {
        self.offer_literals
            .iter()
            .find(|literal| literal.eq_ignore_ascii_case(candidate))
            .cloned()
    }
}

fn build_condition_pattern(vocabulary: &[String]) -> Option<Regex> {
    if vocabulary.is_empty() {
        return None;
    }
    let alternatives: Vec<String> = vocabulary.iter().map(|v| regex::escape(v)).collect();
    let pattern = format!(r"(?i)^(?:{})(?:$|[^\w])", alternatives.join("|"));
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!("Condition vocabulary produced an invalid pattern: {}", e);
            None
        }
    }
}
