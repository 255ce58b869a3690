use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::extract::Request;
use axum::extract::State;
use axum::middleware::Next;
use axum::response::Response;

use crate::inbound::http::handlers::ApiError;
use crate::rate_limit::FixedWindowRateLimiter;

/// Admission control keyed by the peer IP address.
///
/// Runs before routing and authentication, so a denied request does no other
/// work.
pub async fn limit_by_client(
    State(limiter): State<Arc<FixedWindowRateLimiter>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = client_key(&req);
    let decision = limiter.allow(&key);

    if !decision.admitted {
        tracing::warn!(
            client = %key,
            retry_after_ms = decision.retry_after.as_millis() as u64,
            "Rate limit exceeded"
        );
        return Err(ApiError::TooManyRequests {
            retry_after: decision.retry_after,
        });
    }

    Ok(next.run(req).await)
}

fn client_key(req: &Request) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
