//! Shared helpers for rental-core integration tests.

#![allow(dead_code)]

use rental_core::api::ApiClient;
use rental_core::auth::TokenStore;
use rental_core::config::Config;
use serde_json::{Value, json};
use wiremock::{MockServer, ResponseTemplate};

pub fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

/// Client against `server` with an in-memory token store.
pub fn client_for(server: &MockServer) -> ApiClient {
    client_with_timeout(server, 30)
}

pub fn client_with_timeout(server: &MockServer, request_timeout_secs: u64) -> ApiClient {
    let config = Config {
        api_url: server.uri(),
        request_timeout_secs,
        ..Config::default()
    };
    ApiClient::new(&config, TokenStore::in_memory()).expect("build client")
}

pub fn user_json(id: &str) -> Value {
    json!({
        "id": id,
        "email": format!("{id}@example.com"),
        "name": "Test User",
        "createdAt": "2024-01-01T00:00:00.000Z"
    })
}

/// Login/signup body in the `{ success, data }` envelope.
pub fn auth_body(access: &str, refresh: &str, user_id: &str) -> Value {
    json!({
        "success": true,
        "data": {
            "accessToken": access,
            "refreshToken": refresh,
            "user": user_json(user_id)
        }
    })
}

pub fn search_car_json(id: &str) -> Value {
    json!({
        "id": id,
        "make": "Tesla",
        "model": "Model 3",
        "year": 2023,
        "fuelType": "ELECTRIC",
        "transmission": "AUTOMATIC",
        "seats": 5,
        "pricePerDay": 89.0,
        "imageUrl": "https://img.example.com/car.jpg",
        "location": {"lat": 52.52, "lng": 13.405, "city": "Berlin"},
        "isAvailable": true,
        "distance": 1.2
    })
}

pub fn booking_json(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "userId": "u1",
        "carId": "car-1",
        "pickupTime": "2025-06-01T10:00:00.000Z",
        "dropoffTime": "2025-06-03T10:00:00.000Z",
        "totalPrice": 178.0,
        "status": status,
        "createdAt": "2025-05-01T10:00:00.000Z"
    })
}

pub fn unauthorized() -> ResponseTemplate {
    ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid token"}))
}
