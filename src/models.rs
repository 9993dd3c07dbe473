//! Listing record types produced by a search.

use serde::{Deserialize, Serialize};

/// Placeholder for a field that could not be determined.
pub const SENTINEL: &str = "N/A";

/// Check whether a field value is the sentinel placeholder.
pub fn is_sentinel(value: &str) -> bool {
    value == SENTINEL
}

/// Fields extracted from a listing container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Price,
    Seller,
    Time,
    Condition,
}

impl Field {
    /// Fields extracted for the extended record variant, in extraction order.
    pub const ALL: [Field; 5] = [
        Field::Name,
        Field::Price,
        Field::Seller,
        Field::Time,
        Field::Condition,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Price => "price",
            Field::Seller => "seller",
            Field::Time => "time",
            Field::Condition => "condition",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which keys a record carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordVariant {
    /// name, price, seller, time, condition, url
    #[default]
    Extended,
    /// name, price, url
    Minimal,
}

impl RecordVariant {
    /// Fields the extractor should run for this variant.
    pub fn fields(&self) -> &'static [Field] {
        match self {
            RecordVariant::Extended => &Field::ALL,
            RecordVariant::Minimal => &[Field::Name, Field::Price],
        }
    }
}

/// One listing assembled from a page.
///
/// Every present value is either a meaningful string or [`SENTINEL`].
/// `seller`, `time` and `condition` are `None` only for the minimal variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    pub name: String,
    pub price: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    pub url: String,
}

impl ExtractedRecord {
    /// The URL used to suppress duplicates, if it was resolved.
    pub fn dedup_key(&self) -> Option<&str> {
        if is_sentinel(&self.url) || self.url.is_empty() {
            None
        } else {
            Some(&self.url)
        }
    }

    /// Whether the record carries enough identity to be kept.
    pub fn is_identifiable(&self) -> bool {
        !is_sentinel(&self.url) || !is_sentinel(&self.name)
    }
}
