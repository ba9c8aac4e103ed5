use anyhow::{Context as _, Result, bail};
use rental_core::services::bookings::{is_date_range_valid, to_iso};
use rental_core::services::cars;
use rental_core::types::{CarSearchResult, SearchParams};

use super::{Context, money};

pub async fn run(ctx: &Context, mut params: SearchParams) -> Result<()> {
    params.pickup_time = normalize_time(params.pickup_time.as_deref(), "pickup")?;
    params.dropoff_time = normalize_time(params.dropoff_time.as_deref(), "dropoff")?;
    if let (Some(pickup), Some(dropoff)) = (&params.pickup_time, &params.dropoff_time)
        && !is_date_range_valid(pickup, dropoff)
    {
        bail!("Dropoff time must be after pickup time");
    }

    let page = cars::search_cars(ctx.client(), &params)
        .await
        .context("search failed")?;

    ctx.output.emit(&page, |page| {
        if page.cars.is_empty() {
            println!("No cars found.");
            return;
        }
        println!(
            "{} of {} cars (page {}/{})",
            page.cars.len(),
            page.total,
            page.page,
            page.total_pages.max(1)
        );
        for car in &page.cars {
            println!("{}", summary_line(car));
        }
    })
}

fn normalize_time(value: Option<&str>, label: &str) -> Result<Option<String>> {
    value
        .map(|v| to_iso(v).with_context(|| format!("Invalid {label} time: {v}")))
        .transpose()
}

fn summary_line(car: &CarSearchResult) -> String {
    let availability = if car.is_available { "" } else { "  [unavailable]" };
    format!(
        "{}  {} {} {}  {}/{}  {} seats  {}/day  {:.1} km  {}{availability}",
        car.id,
        car.year,
        car.make,
        car.model,
        car.fuel_type.to_lowercase(),
        car.transmission.to_lowercase(),
        car.seats,
        money(car.price_per_day),
        car.distance,
        car.location.city,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_line() {
        let car = CarSearchResult {
            id: "c1".to_string(),
            make: "Tesla".to_string(),
            model: "Model 3".to_string(),
            year: 2023,
            fuel_type: "ELECTRIC".to_string(),
            transmission: "AUTOMATIC".to_string(),
            seats: 5,
            price_per_day: 89.0,
            distance: 1.24,
            is_available: true,
            ..CarSearchResult::default()
        };
        assert_eq!(
            summary_line(&car),
            "c1  2023 Tesla Model 3  electric/automatic  5 seats  $89.00/day  1.2 km  "
        );
    }

    #[test]
    fn test_normalize_time() {
        assert_eq!(normalize_time(None, "pickup").unwrap(), None);
        assert_eq!(
            normalize_time(Some("2025-06-01T10:00"), "pickup").unwrap().as_deref(),
            Some("2025-06-01T10:00:00.000Z")
        );
        let err = normalize_time(Some("tomorrow"), "pickup").unwrap_err();
        assert_eq!(err.to_string(), "Invalid pickup time: tomorrow");
    }
}
