use crate::api::{ApiClient, ApiResult, envelope};
use crate::types::HealthResponse;

/// `GET /health`; works without credentials.
///
/// # Errors
/// Transport, HTTP status or `Parse` failures.
pub async fn get_health(client: &ApiClient) -> ApiResult<HealthResponse> {
    envelope::decode(client.get("/health").await?)
}
