//! Record assembly: identity filter, URL dedup and the result cap.

use std::collections::HashSet;

use tracing::debug;

use super::fields::FieldValues;
use crate::models::{ExtractedRecord, Field, RecordVariant, SENTINEL};

/// Collects records in encounter order until the cap is reached.
#[derive(Debug)]
pub struct Assembler {
    variant: RecordVariant,
    max_results: usize,
    seen_urls: HashSet<String>,
    records: Vec<ExtractedRecord>,
}

impl Assembler {
    pub fn new(variant: RecordVariant, max_results: usize) -> Self {
        Self {
            variant,
            max_results,
            seen_urls: HashSet::new(),
            records: Vec::new(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= self.max_results
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Offer one container's field values. Returns whether a record was kept.
    pub fn push(&mut self, url: Option<String>, mut values: FieldValues) -> bool {
        if self.is_full() {
            return false;
        }

        let mut take = |field: Field| values.remove(&field).unwrap_or_else(|| SENTINEL.to_string());
        let name = take(Field::Name);
        let price = take(Field::Price);
        let (seller, time, condition) = match self.variant {
            RecordVariant::Extended => (
                Some(take(Field::Seller)),
                Some(take(Field::Time)),
                Some(take(Field::Condition)),
            ),
            RecordVariant::Minimal => (None, None, None),
        };
        let record = ExtractedRecord {
            name,
            price,
            seller,
            time,
            condition,
            url: url.unwrap_or_else(|| SENTINEL.to_string()),
        };

        if !record.is_identifiable() {
            debug!("Dropping listing with neither name nor url");
            return false;
        }
        if let Some(key) = record.dedup_key() {
            if !self.seen_urls.insert(key.to_string()) {
                debug!("Skipping duplicate listing {}", key);
                return false;
            }
        }
        self.records.push(record);
        true
    }

    pub fn finish(self) -> Vec<ExtractedRecord> {
        self.records
    }
}
