//! Per-field extraction cascades.
//!
//! Every field runs its own ordered list of strategies against a container
//! and keeps the first validated value. An exhausted cascade yields
//! [`SENTINEL`].

pub mod strategy;
pub mod validate;
pub mod view;

pub use strategy::FieldStrategy;
pub use validate::Validators;
pub use view::ContainerView;

use std::collections::HashMap;

use tracing::debug;

use crate::models::{Field, SENTINEL};
use crate::scrapers::config::ExtractionConfig;

/// Ordered strategies for one field.
pub struct FieldCascade {
    field: Field,
    strategies: Vec<Box<dyn FieldStrategy>>,
}

impl FieldCascade {
    pub fn new(field: Field, config: &ExtractionConfig) -> Self {
        let strategies = config
            .cascade
            .iter()
            .map(|kind| kind.create_strategy(field, config))
            .collect();
        Self { field, strategies }
    }

    pub fn field(&self) -> Field {
        self.field
    }

    /// Run each strategy in turn; the first validated value wins.
    pub fn run(&self, view: &ContainerView<'_>, validators: &Validators) -> String {
        for strategy in &self.strategies {
            if let Some(value) = strategy.attempt(view, validators) {
                debug!("{} resolved by {} stage: {}", self.field, strategy.kind(), value);
                return value;
            }
        }
        debug!("{} unresolved after {} stages", self.field, self.strategies.len());
        SENTINEL.to_string()
    }
}

/// Field values for one container, keyed by field.
pub type FieldValues = HashMap<Field, String>;

/// All field cascades plus the validators they share.
pub struct FieldExtractor {
    validators: Validators,
    cascades: Vec<FieldCascade>,
}

impl FieldExtractor {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            validators: Validators::new(config),
            cascades: Field::ALL
                .iter()
                .map(|field| FieldCascade::new(*field, config))
                .collect(),
        }
    }

    /// Value of a single field, or the sentinel.
    pub fn extract(&self, field: Field, view: &ContainerView<'_>) -> String {
        self.cascades
            .iter()
            .find(|c| c.field() == field)
            .map(|c| c.run(view, &self.validators))
            .unwrap_or_else(|| SENTINEL.to_string())
    }

    /// Values for each requested field.
    pub fn extract_fields(&self, view: &ContainerView<'_>, fields: &[Field]) -> FieldValues {
        fields
            .iter()
            .map(|field| (*field, self.extract(*field, view)))
            .collect()
    }
}
