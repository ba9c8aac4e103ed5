use anyhow::{Context as _, Result};
use rental_core::services::health;

use super::{Context, display_time};

pub async fn run(ctx: &Context) -> Result<()> {
    let report = health::get_health(ctx.client())
        .await
        .context("health check failed")?;

    ctx.output.emit(&report, |report| {
        println!("status: {}", report.status);
        if !report.timestamp.is_empty() {
            println!("checked: {}", display_time(&report.timestamp));
        }
        for (name, service) in &report.services {
            match &service.error {
                Some(error) => println!(
                    "  {name}: {} ({:.0} ms) {error}",
                    service.status, service.response_time
                ),
                None => println!(
                    "  {name}: {} ({:.0} ms)",
                    service.status, service.response_time
                ),
            }
        }
    })
}
