use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use auth::Authenticator;
use auth::PasswordHasher;
use planner_service::config::Config;
use planner_service::domain::principal::ports::PrincipalResolver;
use planner_service::domain::principal::resolver::CachedPrincipalResolver;
use planner_service::domain::principal::resolver::DirectPrincipalResolver;
use planner_service::domain::user::credentials::CredentialStore;
use planner_service::domain::user::service::RegistrationSettings;
use planner_service::domain::user::service::UserService;
use planner_service::inbound::http::router::create_router;
use planner_service::outbound::cache::redis_user::RedisUserCache;
use planner_service::outbound::mailer::sendgrid::SendGridMailer;
use planner_service::outbound::repositories::follower::PostgresFollowerRepository;
use planner_service::outbound::repositories::user::PostgresUserRepository;
use planner_service::rate_limit::FixedWindowRateLimiter;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "planner_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "planner-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;
    let deadline = config.timeouts.operation();

    tracing::info!(
        http_port = config.server.http_port,
        environment = %config.server.environment,
        cache_enabled = config.cache.enabled,
        rate_limiter_enabled = config.rate_limiter.enabled,
        "Configuration loaded"
    );

    let pg_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(deadline)
        .connect(&config.database.url)
        .await?;
    tracing::info!(
        max_connections = config.database.max_connections,
        database = "postgresql",
        "Database connection pool created"
    );

    sqlx::migrate!("./migrations").run(&pg_pool).await?;
    tracing::info!(database = "postgresql", "Database migrations completed");

    let authenticator = Arc::new(Authenticator::new(
        config.jwt.secret.as_bytes(),
        config.jwt.issuer.clone(),
        chrono::Duration::hours(config.jwt.expiration_hours),
    ));
    let hasher = PasswordHasher::with_params(
        config.password.memory_kib,
        config.password.iterations,
        config.password.parallelism,
    )?;
    let credentials =
        CredentialStore::new(hasher, config.password.max_concurrent_hashes, deadline);

    let user_repository = Arc::new(PostgresUserRepository::new(pg_pool.clone()));
    let follower_repository = Arc::new(PostgresFollowerRepository::new(pg_pool));
    let mailer = Arc::new(SendGridMailer::new(
        &config.mail,
        !config.server.is_production(),
        deadline,
    )?);
    let mail_deadline = mailer.delivery_budget();
    tracing::info!(
        max_retries = config.mail.max_retries,
        budget_ms = mail_deadline.as_millis() as u64,
        "Mailer configured"
    );

    let principals: Arc<dyn PrincipalResolver> = if config.cache.enabled {
        let cache = RedisUserCache::connect(
            &config.cache.url,
            Duration::from_secs(config.cache.ttl_seconds),
        )
        .await?;
        tracing::info!(ttl_seconds = config.cache.ttl_seconds, "Principal cache enabled");
        Arc::new(CachedPrincipalResolver::new(
            Arc::clone(&user_repository),
            Arc::new(cache),
            deadline,
        ))
    } else {
        Arc::new(DirectPrincipalResolver::new(
            Arc::clone(&user_repository),
            deadline,
        ))
    };

    let user_service = Arc::new(UserService::new(
        user_repository,
        follower_repository,
        mailer,
        Arc::clone(&principals),
        credentials,
        RegistrationSettings {
            invitation_ttl: chrono::Duration::hours(config.mail.invitation_expiry_hours),
            activation_url: config.mail.activation_url.clone(),
            deadline,
            mail_deadline,
        },
    ));

    let rate_limiter = config.rate_limiter.enabled.then(|| {
        Arc::new(FixedWindowRateLimiter::new(
            config.rate_limiter.requests_per_window,
            config.rate_limiter.window(),
        ))
    });

    if let Some(limiter) = rate_limiter.clone() {
        tracing::info!(
            requests_per_window = config.rate_limiter.requests_per_window,
            window_seconds = config.rate_limiter.window_seconds,
            "Rate limiter enabled"
        );
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(limiter.window().max(Duration::from_secs(1)));
            loop {
                interval.tick().await;
                let purged = limiter.purge_expired(Instant::now());
                if purged > 0 {
                    tracing::debug!(purged, "Purged expired rate limit windows");
                }
            }
        });
    }

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let http_application = create_router(user_service, principals, authenticator, rate_limiter);

    axum::serve(
        http_listener,
        http_application.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
