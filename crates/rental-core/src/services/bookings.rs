//! Booking endpoints and the date arithmetic the booking form relies on.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::api::{ApiClient, ApiResult, envelope};
use crate::types::{Booking, BookingRequest, BookingStatus};

pub async fn create_booking(client: &ApiClient, request: &BookingRequest) -> ApiResult<Booking> {
    envelope::decode(client.post("/bookings", request).await?)
}

/// Lists the current user's bookings.
///
/// Accepts an array in any envelope, or an object holding it under `items`
/// or `bookings`. Anything else is an empty list.
///
/// # Errors
/// Transport and HTTP status failures only.
pub async fn list_bookings(client: &ApiClient) -> ApiResult<Vec<Booking>> {
    let body = client.get("/bookings").await?;
    Ok(envelope::listing(body, "bookings").items)
}

pub async fn get_booking(client: &ApiClient, id: &str) -> ApiResult<Booking> {
    envelope::decode(client.get(&format!("/bookings/{id}")).await?)
}

/// Cancels a booking by patching its status.
///
/// # Errors
/// The backend rejects cancelling a completed booking with a 4xx whose message
/// is surfaced unchanged.
pub async fn cancel_booking(client: &ApiClient, id: &str) -> ApiResult<Booking> {
    let body = client
        .patch(
            &format!("/bookings/{id}"),
            &serde_json::json!({ "status": BookingStatus::Cancelled }),
        )
        .await?;
    envelope::decode(body)
}

/// Parses an RFC 3339 timestamp, or a `YYYY-MM-DDTHH:MM[:SS]` local value
/// taken as UTC.
pub fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Normalizes a user-entered time to the RFC 3339 form the backend expects.
pub fn to_iso(value: &str) -> Option<String> {
    parse_time(value).map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
}

/// True when both times parse and pickup is strictly before dropoff.
pub fn is_date_range_valid(pickup: &str, dropoff: &str) -> bool {
    match (parse_time(pickup), parse_time(dropoff)) {
        (Some(p), Some(d)) => p < d,
        _ => false,
    }
}

/// Whole days between pickup and dropoff, never less than one.
pub fn rental_days(pickup: &str, dropoff: &str) -> i64 {
    match (parse_time(pickup), parse_time(dropoff)) {
        (Some(p), Some(d)) => (d - p).num_days().max(1),
        _ => 1,
    }
}

/// Whole hours between pickup and dropoff; 0 when either side is unparseable.
pub fn rental_hours(pickup: &str, dropoff: &str) -> i64 {
    match (parse_time(pickup), parse_time(dropoff)) {
        (Some(p), Some(d)) => (d - p).num_hours(),
        _ => 0,
    }
}

impl BookingRequest {
    /// Builds a request with both times normalized to RFC 3339.
    ///
    /// # Errors
    /// Returns a message suitable for display when a time is unparseable or
    /// the range is empty.
    pub fn new(car_id: &str, pickup: &str, dropoff: &str) -> Result<Self, String> {
        let pickup_time = to_iso(pickup).ok_or_else(|| format!("Invalid pickup time: {pickup}"))?;
        let dropoff_time =
            to_iso(dropoff).ok_or_else(|| format!("Invalid dropoff time: {dropoff}"))?;
        if !is_date_range_valid(&pickup_time, &dropoff_time) {
            return Err("Dropoff time must be after pickup time".to_string());
        }
        Ok(Self {
            car_id: car_id.to_string(),
            pickup_time,
            dropoff_time,
        })
    }
}
