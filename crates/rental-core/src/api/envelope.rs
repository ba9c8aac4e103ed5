//! Response envelope normalization.
//!
//! The backend wraps payloads inconsistently:
//!
//! - `{ "success": true, "data": payload }`
//! - `{ "data": payload }`
//! - `payload`
//!
//! and list endpoints sometimes answer with a bare array. Every response goes
//! through [`Envelope::classify`], which tries the shapes in that fixed order
//! (most specific first). Nothing here keeps state between calls.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{ApiError, ApiResult};
use crate::types::{CarSearchResult, SearchResponse};

/// A response body after shape detection.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// `{ "success": true, "data": payload }`
    SuccessData(Value),
    /// `{ "data": payload }`
    Data(Value),
    /// The body is the payload.
    Raw(Value),
}

impl Envelope {
    pub fn classify(body: Value) -> Self {
        let Value::Object(mut map) = body else {
            return Envelope::Raw(body);
        };

        let has_data = map.get("data").is_some_and(|d| !d.is_null());
        if !has_data {
            return Envelope::Raw(Value::Object(map));
        }

        let success = map.get("success").and_then(Value::as_bool) == Some(true);
        let data = map.remove("data").unwrap_or(Value::Null);
        if success {
            Envelope::SuccessData(data)
        } else {
            Envelope::Data(data)
        }
    }

    pub fn is_wrapped(&self) -> bool {
        !matches!(self, Envelope::Raw(_))
    }

    pub fn into_payload(self) -> Value {
        match self {
            Envelope::SuccessData(v) | Envelope::Data(v) | Envelope::Raw(v) => v,
        }
    }
}

/// Strips the transport wrapping from `body`.
pub fn payload(body: Value) -> Value {
    Envelope::classify(body).into_payload()
}

/// Strips the wrapping and decodes the payload as `T`.
///
/// # Errors
/// Returns a `Parse` error if the payload does not match `T`.
pub fn decode<T: DeserializeOwned>(body: Value) -> ApiResult<T> {
    serde_json::from_value(payload(body))
        .map_err(|e| ApiError::parse(format!("Unexpected response format: {e}")))
}

/// A list payload with its total count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Default for Listing<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }
}

/// Normalizes a list response.
///
/// Accepts a bare array (total = length) or an object holding the array under
/// `items` or `alt_key`, with an optional `total`. Anything else is an empty
/// listing. Rows that fail to decode are skipped.
pub fn listing<T: DeserializeOwned>(body: Value, alt_key: &str) -> Listing<T> {
    match payload(body) {
        Value::Array(rows) => {
            let items = decode_rows(rows);
            let total = items.len() as u64;
            Listing { items, total }
        }
        Value::Object(mut map) => {
            let rows = take_array(&mut map, "items").or_else(|| take_array(&mut map, alt_key));
            let Some(rows) = rows else {
                tracing::debug!("list response matched no known shape");
                return Listing::default();
            };
            let items = decode_rows(rows);
            let total = u64_field(&map, "total").unwrap_or(items.len() as u64);
            Listing { items, total }
        }
        _ => Listing::default(),
    }
}

/// Normalizes a `GET /search` response into a full result page.
///
/// Missing `page`/`limit`/`totalPages` default to 1/20/1 and a missing
/// `total` to the number of cars. A bare array is one page holding every
/// row. A body matching no shape is [`SearchResponse::empty`].
pub fn search_response(body: Value) -> SearchResponse {
    let envelope = Envelope::classify(body);
    let wrapped = envelope.is_wrapped();

    match envelope.into_payload() {
        Value::Array(rows) => {
            let cars: Vec<CarSearchResult> = decode_rows(rows);
            let count = cars.len();
            SearchResponse {
                total: count as u64,
                page: 1,
                limit: count as u32,
                total_pages: 1,
                cars,
            }
        }
        Value::Object(mut map) if wrapped || map.get("cars").is_some_and(Value::is_array) => {
            let cars: Vec<CarSearchResult> = take_array(&mut map, "cars")
                .map(decode_rows)
                .unwrap_or_default();
            SearchResponse {
                total: u64_field(&map, "total").unwrap_or(cars.len() as u64),
                page: u32_field(&map, "page").unwrap_or(1),
                limit: u32_field(&map, "limit").unwrap_or(SearchResponse::DEFAULT_LIMIT),
                total_pages: u32_field(&map, "totalPages").unwrap_or(1),
                cars,
            }
        }
        other => {
            tracing::warn!(
                shape = json_kind(&other),
                "search response matched no known shape"
            );
            SearchResponse::empty()
        }
    }
}

fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(item) => Some(item),
            Err(err) => {
                tracing::warn!(error = %err, "skipping undecodable list row");
                None
            }
        })
        .collect()
}

fn take_array(map: &mut Map<String, Value>, key: &str) -> Option<Vec<Value>> {
    match map.remove(key) {
        Some(Value::Array(rows)) => Some(rows),
        Some(other) => {
            map.insert(key.to_string(), other);
            None
        }
        None => None,
    }
}

fn u64_field(map: &Map<String, Value>, key: &str) -> Option<u64> {
    let value = map.get(key)?;
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
}

fn u32_field(map: &Map<String, Value>, key: &str) -> Option<u32> {
    u64_field(map, key).and_then(|v| u32::try_from(v).ok())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
