use crate::api::{ApiClient, ApiResult, envelope};
use crate::types::{MessageResponse, NotificationSubscription};

/// Registers a push token for the current user.
///
/// # Errors
/// Fails like any authenticated call.
pub async fn subscribe(
    client: &ApiClient,
    subscription: &NotificationSubscription,
) -> ApiResult<MessageResponse> {
    let body = client.post("/notifications/subscribe", subscription).await?;
    if body.is_null() {
        return Ok(MessageResponse::default());
    }
    envelope::decode(body)
}
