//! CLI command handlers.

use anyhow::Result;
use rental_core::api::ApiClient;
use rental_core::auth::TokenStore;
use rental_core::config::Config;
use rental_core::services::bookings::parse_time;
use rental_core::session::AuthSession;
use serde::Serialize;

pub mod auth;
pub mod bookings;
pub mod cars;
pub mod config;
pub mod health;
pub mod search;

/// How results are printed.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json: bool,
}

impl Output {
    /// Prints `value` as pretty JSON, or hands it to `human` for text output.
    pub fn emit<T: Serialize>(self, value: &T, human: impl FnOnce(&T)) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human(value);
        }
        Ok(())
    }
}

/// Shared state for commands that talk to the API.
pub struct Context {
    pub session: AuthSession,
    pub output: Output,
}

impl Context {
    pub fn new(config: &Config, output: Output) -> Result<Self> {
        let client = ApiClient::new(config, TokenStore::from_default_file())?;
        tracing::debug!(api_url = %client.base_url(), "client ready");
        Ok(Self {
            session: AuthSession::new(client),
            output,
        })
    }

    pub fn client(&self) -> &ApiClient {
        self.session.client()
    }
}

/// Formats an API timestamp for display; unparseable input is shown as-is.
fn display_time(value: &str) -> String {
    parse_time(value).map_or_else(
        || value.to_string(),
        |dt| dt.format("%Y-%m-%d %H:%M UTC").to_string(),
    )
}

fn money(amount: f64) -> String {
    format!("${amount:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_time() {
        assert_eq!(display_time("2025-06-01T10:00:00.000Z"), "2025-06-01 10:00 UTC");
        assert_eq!(display_time("whenever"), "whenever");
    }

    #[test]
    fn test_money() {
        assert_eq!(money(45.0), "$45.00");
        assert_eq!(money(178.5), "$178.50");
    }
}
