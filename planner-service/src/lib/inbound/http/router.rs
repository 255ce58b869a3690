use std::sync::Arc;
use std::time::Duration;

use auth::Authenticator;
use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;
use axum::routing::put;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::activate_user::activate_user;
use super::handlers::delete_user::delete_user;
use super::handlers::follow_user::follow_user;
use super::handlers::get_self::get_self;
use super::handlers::get_user::get_user;
use super::handlers::health::health;
use super::handlers::login::login;
use super::handlers::register::register;
use super::handlers::unfollow_user::unfollow_user;
use super::middleware::authenticate as bearer_auth;
use super::middleware::authenticate_basic as basic_auth;
use super::rate_limit::limit_by_client;
use crate::domain::principal::ports::PrincipalResolver;
use crate::domain::user::ports::UserServicePort;
use crate::rate_limit::FixedWindowRateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<dyn UserServicePort>,
    pub principals: Arc<dyn PrincipalResolver>,
    pub authenticator: Arc<Authenticator>,
}

/// Build the HTTP surface.
///
/// `rate_limiter` is `None` when rate limiting is disabled; otherwise it wraps
/// every route, ahead of routing and both authentication strategies.
pub fn create_router(
    user_service: Arc<dyn UserServicePort>,
    principals: Arc<dyn PrincipalResolver>,
    authenticator: Arc<Authenticator>,
    rate_limiter: Option<Arc<FixedWindowRateLimiter>>,
) -> Router {
    let state = AppState {
        user_service,
        principals,
        authenticator,
    };

    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/authentication/register", post(register))
        .route("/users/activate/:token", put(activate_user));

    let basic_routes = Router::new()
        .route("/authentication/login", post(login))
        .route_layer(middleware::from_fn_with_state(state.clone(), basic_auth));

    let protected_routes = Router::new()
        .route("/users/self", get(get_self))
        .route("/users/:user_id", get(get_user))
        .route("/users/:user_id", delete(delete_user))
        .route("/users/:user_id/follow", put(follow_user))
        .route("/users/:user_id/unfollow", put(unfollow_user))
        .route_layer(middleware::from_fn_with_state(state.clone(), bearer_auth));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    let router = Router::new()
        .merge(public_routes)
        .merge(basic_routes)
        .merge(protected_routes)
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state);

    match rate_limiter {
        Some(limiter) => router.layer(middleware::from_fn_with_state(limiter, limit_by_client)),
        None => router,
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use auth::InvitationToken;
    use axum::http::header;
    use axum::http::StatusCode;
    use mockall::mock;
    use tower::ServiceExt;

    use super::*;
    use crate::domain::user::models::RegisterUserCommand;
    use crate::domain::user::models::Registration;
    use crate::domain::user::models::User;
    use crate::domain::user::models::UserId;
    use crate::user::errors::UserError;

    mock! {
        pub TestUserService {}

        #[async_trait]
        impl UserServicePort for TestUserService {
            async fn register(&self, command: RegisterUserCommand) -> Result<Registration, UserError>;
            async fn activate(&self, token: &InvitationToken) -> Result<(), UserError>;
            async fn authenticate(&self, email: &str, password: &str) -> Result<User, UserError>;
            async fn get_user(&self, id: &UserId) -> Result<User, UserError>;
            async fn follow(&self, follower: &UserId, target: &UserId) -> Result<(), UserError>;
            async fn unfollow(&self, follower: &UserId, target: &UserId) -> Result<(), UserError>;
            async fn delete_user(&self, id: &UserId) -> Result<(), UserError>;
        }
    }

    mock! {
        pub TestPrincipalResolver {}

        #[async_trait]
        impl PrincipalResolver for TestPrincipalResolver {
            async fn resolve(&self, id: &UserId) -> Result<User, UserError>;
            async fn invalidate(&self, id: &UserId) -> Result<(), UserError>;
        }
    }

    fn router(rate_limiter: Option<Arc<FixedWindowRateLimiter>>) -> Router {
        create_router(
            Arc::new(MockTestUserService::new()),
            Arc::new(MockTestPrincipalResolver::new()),
            Arc::new(Authenticator::new(
                b"router-test-secret-of-at-least-32-bytes",
                "planner",
                chrono::Duration::hours(1),
            )),
            rate_limiter,
        )
    }

    fn health_request() -> Request<Body> {
        Request::builder()
            .uri("/health")
            .header(header::ORIGIN, "http://localhost:5173")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_passes_through_trace_and_cors_layers() {
        let response = router(None).oneshot(health_request()).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn test_rate_limiter_wraps_every_route() {
        let limiter = Arc::new(FixedWindowRateLimiter::new(1, Duration::from_secs(60)));
        let app = router(Some(limiter));

        let first = app.clone().oneshot(health_request()).await.unwrap();
        let second = app.clone().oneshot(health_request()).await.unwrap();
        let unrouted = app
            .oneshot(Request::builder().uri("/nowhere").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(second.headers().contains_key(header::RETRY_AFTER));
        assert_eq!(unrouted.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
