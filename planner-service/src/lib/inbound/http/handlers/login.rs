use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use super::UserData;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;

pub const TOKEN_COOKIE: &str = "jwt";

/// Issue a bearer token for a principal established by Basic auth.
///
/// The token is set as an HTTP-only cookie and echoed in the body.
pub async fn login(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let issued = state
        .authenticator
        .issue_token(user.id)
        .map_err(|e| ApiError::InternalServerError(format!("Token generation failed: {}", e)))?;

    let cookie = token_cookie(&issued.access_token, state.authenticator.token_ttl().num_seconds());

    tracing::info!(user_id = %user.id, "Issued bearer token");

    Ok((
        [(SET_COOKIE, cookie)],
        ApiSuccess::new(
            StatusCode::CREATED,
            LoginResponseData {
                user: (&user).into(),
                token: issued.access_token,
            },
        ),
    ))
}

fn token_cookie(token: &str, max_age_seconds: i64) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; Secure; SameSite=Lax",
        TOKEN_COOKIE, token, max_age_seconds
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginResponseData {
    pub user: UserData,
    pub token: String,
}
