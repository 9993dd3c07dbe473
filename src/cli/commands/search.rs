//! Search command.

use std::path::Path;

use anyhow::Context;
use console::style;

use marketscrape::config::Config;
use marketscrape::scrape_listings;

/// Run one search and print the records to stdout.
pub async fn cmd_search(
    config: &Config,
    query: &str,
    max_results: usize,
    screenshot: Option<&Path>,
    pretty: bool,
) -> anyhow::Result<()> {
    let (records, png) = scrape_listings(config, query, max_results)
        .await
        .with_context(|| format!("Search for '{}' failed", query))?;

    let json = if pretty {
        serde_json::to_string_pretty(&records)?
    } else {
        serde_json::to_string(&records)?
    };
    println!("{}", json);

    if records.is_empty() {
        eprintln!("{} No listings found for '{}'", style("!").yellow(), query);
        match (screenshot, png) {
            (Some(path), Some(png)) => {
                tokio::fs::write(path, &png)
                    .await
                    .with_context(|| format!("Failed to write screenshot to {}", path.display()))?;
                eprintln!(
                    "  {} Screenshot saved to {}",
                    style("→").dim(),
                    path.display()
                );
            }
            (Some(_), None) => {
                eprintln!("  {} No screenshot was captured", style("→").dim());
            }
            (None, _) => {}
        }
    } else {
        eprintln!(
            "{} {} listings for '{}'",
            style("✓").green(),
            records.len(),
            query
        );
    }

    Ok(())
}
