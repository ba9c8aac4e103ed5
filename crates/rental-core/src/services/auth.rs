//! `/auth/*` endpoints.

use crate::api::{ApiClient, ApiResult, envelope};
use crate::types::{AuthResponse, LoginRequest, SignupRequest, User};

/// Creates an account and stores the issued credential pair.
///
/// # Errors
/// Returns the server's validation message (e.g. duplicate email) as an
/// `HttpStatus` error, or `Parse` if the response carries no tokens.
pub async fn signup(client: &ApiClient, request: &SignupRequest) -> ApiResult<AuthResponse> {
    let body = client.post("/auth/signup", request).await?;
    let auth: AuthResponse = envelope::decode(body)?;
    client.tokens().set(&auth.access_token, &auth.refresh_token);
    tracing::info!(user_id = %auth.user.id, "signed up");
    Ok(auth)
}

/// Exchanges email and password for a credential pair and stores it.
///
/// # Errors
/// Invalid credentials surface as an `HttpStatus` 401 error; no refresh is
/// attempted because the request carries no token.
pub async fn login(client: &ApiClient, request: &LoginRequest) -> ApiResult<AuthResponse> {
    let body = client.post("/auth/login", request).await?;
    let auth: AuthResponse = envelope::decode(body)?;
    client.tokens().set(&auth.access_token, &auth.refresh_token);
    tracing::info!(user_id = %auth.user.id, "logged in");
    Ok(auth)
}

/// Fetches the profile behind the current access token.
///
/// # Errors
/// Fails like any authenticated call, including `SessionExpired`.
pub async fn me(client: &ApiClient) -> ApiResult<User> {
    envelope::decode(client.get("/auth/me").await?)
}

/// Revokes `refresh_token` server-side.
///
/// Does not touch local credentials; callers clear them regardless of the
/// outcome.
///
/// # Errors
/// Whatever the server or transport reports.
pub async fn logout(client: &ApiClient, refresh_token: &str) -> ApiResult<()> {
    client
        .post(
            "/auth/logout",
            &serde_json::json!({ "refreshToken": refresh_token }),
        )
        .await?;
    Ok(())
}
