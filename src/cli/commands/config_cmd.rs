//! Configuration commands.

use console::style;

use marketscrape::config::Config;

/// Print the effective configuration as TOML.
pub fn cmd_config_show(config: &Config) -> anyhow::Result<()> {
    let source = config
        .source_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    eprintln!("{} Source: {}", style("→").dim(), source);

    let rendered = config.to_toml().map_err(|e| anyhow::anyhow!(e))?;
    print!("{}", rendered);
    Ok(())
}
