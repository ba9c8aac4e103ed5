//! Typed wrappers over the REST endpoints.
//!
//! One function per endpoint: send through [`ApiClient`](crate::api::ApiClient),
//! then strip the envelope into the endpoint's payload type.

pub mod auth;
pub mod bookings;
pub mod cars;
pub mod health;
pub mod notifications;
