//! Config command handlers.

use anyhow::{Context, Result};
use rental_core::config::{self, Config};

pub fn path() {
    println!("{}", config::paths::config_path().display());
}

pub fn init() -> Result<()> {
    let config_path = config::paths::config_path();
    Config::init(&config_path)
        .with_context(|| format!("init config at {}", config_path.display()))?;
    println!("Created config at {}", config_path.display());
    Ok(())
}

/// Prints the effective configuration after env and flag overrides.
pub fn show(config: &Config) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("render config")?;
    print!("{rendered}");
    Ok(())
}
