//! Booking commands.

use anyhow::{Context as _, Result, anyhow};
use rental_core::services::bookings::{self, rental_days};
use rental_core::types::{Booking, BookingRequest};

use super::{Context, display_time, money};

pub async fn list(ctx: &Context) -> Result<()> {
    let bookings = bookings::list_bookings(ctx.client())
        .await
        .context("list bookings")?;
    ctx.output.emit(&bookings, |bookings| {
        if bookings.is_empty() {
            println!("No bookings.");
        }
        for booking in bookings {
            println!("{}", summary_line(booking));
        }
    })
}

pub async fn show(ctx: &Context, id: &str) -> Result<()> {
    let booking = bookings::get_booking(ctx.client(), id)
        .await
        .with_context(|| format!("load booking {id}"))?;
    ctx.output.emit(&booking, print_booking)
}

pub async fn create(ctx: &Context, car_id: &str, pickup: &str, dropoff: &str) -> Result<()> {
    let request = BookingRequest::new(car_id, pickup, dropoff).map_err(|e| anyhow!(e))?;
    let booking = bookings::create_booking(ctx.client(), &request)
        .await
        .context("create booking")?;
    ctx.output.emit(&booking, |booking| {
        println!("Booked {} as {}", booking.car_id, booking.id);
        print_booking(booking);
    })
}

pub async fn cancel(ctx: &Context, id: &str) -> Result<()> {
    let booking = bookings::cancel_booking(ctx.client(), id)
        .await
        .with_context(|| format!("cancel booking {id}"))?;
    ctx.output.emit(&booking, |booking| {
        println!("Booking {} is now {}", booking.id, booking.status);
    })
}

fn car_label(booking: &Booking) -> &str {
    booking
        .car
        .as_ref()
        .map(|car| car.name.as_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(&booking.car_id)
}

fn summary_line(booking: &Booking) -> String {
    format!(
        "{}  {}  {}  {} -> {}  {}",
        booking.id,
        booking.status,
        car_label(booking),
        display_time(&booking.pickup_time),
        display_time(&booking.dropoff_time),
        money(booking.total_price),
    )
}

fn print_booking(booking: &Booking) {
    let days = rental_days(&booking.pickup_time, &booking.dropoff_time);
    println!("booking: {}", booking.id);
    println!("car:     {}", car_label(booking));
    println!("status:  {}", booking.status);
    println!("pickup:  {}", display_time(&booking.pickup_time));
    println!("dropoff: {}", display_time(&booking.dropoff_time));
    let plural = if days == 1 { "" } else { "s" };
    println!("total:   {} ({days} day{plural})", money(booking.total_price));
}

#[cfg(test)]
mod tests {
    use rental_core::types::{BookingCar, BookingStatus};

    use super::*;

    fn booking() -> Booking {
        Booking {
            id: "b1".to_string(),
            user_id: Some("u1".to_string()),
            car_id: "car-1".to_string(),
            pickup_time: "2025-06-01T10:00:00.000Z".to_string(),
            dropoff_time: "2025-06-03T10:00:00.000Z".to_string(),
            total_price: 178.0,
            status: BookingStatus::Confirmed,
            created_at: None,
            updated_at: None,
            car: None,
        }
    }

    #[test]
    fn test_summary_line() {
        assert_eq!(
            summary_line(&booking()),
            "b1  confirmed  car-1  2025-06-01 10:00 UTC -> 2025-06-03 10:00 UTC  $178.00"
        );
    }

    #[test]
    fn test_car_label_prefers_embedded_name() {
        let mut with_car = booking();
        with_car.car = Some(BookingCar {
            id: "car-1".to_string(),
            name: "Tesla Model 3".to_string(),
            images: Vec::new(),
        });
        assert_eq!(car_label(&with_car), "Tesla Model 3");

        with_car.car = Some(BookingCar::default());
        assert_eq!(car_label(&with_car), "car-1");
    }
}
