//! REST access layer: the authenticated client, its error type and the
//! response envelope normalizer.

pub mod client;
pub mod envelope;
pub mod error;

pub use client::{ApiClient, ApiRequest, AuthEvent};
pub use envelope::{Envelope, Listing};
pub use error::{ApiError, ApiErrorKind, ApiResult};
