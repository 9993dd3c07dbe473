//! Command-line interface for mscrape.

mod commands;

pub use commands::{is_verbose, run};
