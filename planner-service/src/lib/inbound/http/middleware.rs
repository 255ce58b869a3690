use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::extract::Request;
use axum::extract::State;
use axum::http::header;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::inbound::http::handlers::ApiError;
use crate::inbound::http::router::AppState;
use crate::user::errors::UserError;

/// Principal attached to the request by one of the authentication strategies.
///
/// Extracting it on a route without an authentication layer is a wiring bug and
/// fails with a 500 instead of yielding an empty principal.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| {
                ApiError::InternalServerError(
                    "authenticated user requested on a route without authentication".to_string(),
                )
            })
    }
}

/// Bearer strategy: validate the JWT and resolve its subject to a principal.
///
/// Every failure, including a principal lookup that errors, is answered with
/// 401.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers()).ok_or_else(|| {
        tracing::debug!("Missing or malformed bearer Authorization header");
        ApiError::Unauthorized
    })?;

    let claims = state.authenticator.validate_token(token).map_err(|e| {
        tracing::warn!(error = %e, "JWT validation failed");
        ApiError::Unauthorized
    })?;

    let user_id = UserId::from_string(&claims.sub).map_err(|e| {
        tracing::warn!(error = %e, "Token subject is not a user ID");
        ApiError::Unauthorized
    })?;

    let user = state.principals.resolve(&user_id).await.map_err(|e| {
        match &e {
            UserError::NotFound(_) => {
                tracing::warn!(user_id = %user_id, "Token subject has no active user")
            }
            _ => tracing::error!(user_id = %user_id, error = %e, "Failed to resolve principal"),
        }
        ApiError::Unauthorized
    })?;

    req.extensions_mut().insert(AuthenticatedUser(user));

    Ok(next.run(req).await)
}

/// Basic strategy: verify `email:password` and attach the matching user.
///
/// Unknown users and wrong passwords are indistinguishable to the client.
pub async fn authenticate_basic(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (email, password) = basic_credentials(req.headers()).ok_or_else(|| {
        tracing::debug!("Missing or malformed basic Authorization header");
        ApiError::UnauthorizedBasic
    })?;

    let user = state
        .user_service
        .authenticate(&email, &password)
        .await
        .map_err(|e| match e {
            UserError::NotFoundByEmail(_) | UserError::InvalidCredentials => {
                tracing::warn!("Basic authentication failed");
                ApiError::UnauthorizedBasic
            }
            _ => ApiError::from(e),
        })?;

    req.extensions_mut().insert(AuthenticatedUser(user));

    Ok(next.run(req).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();

    (!token.is_empty()).then_some(token)
}

fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?.trim();
    let decoded = STANDARD.decode(encoded).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (identity, secret) = decoded.split_once(':')?;

    if identity.is_empty() {
        return None;
    }

    Some((identity.to_string(), secret.to_string()))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(authorization: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(authorization).unwrap(),
        );
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_basic_credentials_parsing() {
        let encoded = STANDARD.encode("a@x.com:pass:with:colons");
        assert_eq!(
            basic_credentials(&headers(&format!("Basic {}", encoded))),
            Some(("a@x.com".to_string(), "pass:with:colons".to_string()))
        );
    }

    #[test]
    fn test_basic_credentials_rejects_malformed() {
        assert_eq!(basic_credentials(&headers("Basic !!!notbase64")), None);

        let no_colon = STANDARD.encode("a@x.com");
        assert_eq!(basic_credentials(&headers(&format!("Basic {}", no_colon))), None);

        let empty_identity = STANDARD.encode(":secret");
        assert_eq!(
            basic_credentials(&headers(&format!("Basic {}", empty_identity))),
            None
        );
        assert_eq!(basic_credentials(&headers("Bearer token")), None);
    }
}
