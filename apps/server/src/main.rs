mod auth;
mod db;
mod handlers;
mod models;
mod rate_limit;
mod schedule;

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::sqlite::SqlitePoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use rate_limit::{rate_limit_admin, rate_limit_public, RateLimitConfig, RateLimiter};
use schedule::ScheduleService;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub schedule: ScheduleService,
    pub admin_token: String,
    pub started_at: Instant,
}

/// Rate limit cleanup interval (seconds).
const RATE_LIMIT_CLEANUP_SECS: u64 = 300;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:glowdesk.db?mode=rwc".into());
    let admin_token = std::env::var("ADMIN_TOKEN").unwrap_or_default();

    // ── Tracing ──
    let env_filter = EnvFilter::from_default_env().add_directive("info".parse()?);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    if admin_token.is_empty() {
        tracing::warn!("ADMIN_TOKEN not set — admin endpoints will reject all requests");
    }

    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".into());
    let webapp_url = std::env::var("WEBAPP_URL").unwrap_or_default();

    // ── Database ──
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    db::run_migrations(&pool).await?;

    let state = Arc::new(AppState {
        db: pool.clone(),
        schedule: ScheduleService::new(pool),
        admin_token,
        started_at: Instant::now(),
    });

    // ── Rate limiter ──
    let rate_limiter = RateLimiter::new(
        RateLimitConfig {
            max_requests: 120,
            window: Duration::from_secs(60),
        },
        RateLimitConfig {
            max_requests: 60,
            window: Duration::from_secs(60),
        },
    );

    // ── Background task: cleanup stale rate limit windows ──
    let cleanup_limiter = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(tokio::time::Duration::from_secs(RATE_LIMIT_CLEANUP_SECS));
        loop {
            interval.tick().await;
            cleanup_limiter.cleanup();
        }
    });

    // ── CORS: whitelist WEBAPP_URL when configured, otherwise allow any ──
    let cors = if !webapp_url.is_empty() {
        let origins: Vec<axum::http::HeaderValue> = vec![
            webapp_url.parse().expect("WEBAPP_URL must be a valid URL"),
            "http://localhost:5173".parse().unwrap(), // Vite dev server
        ];
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // ── Router ──

    // 1. No-limit: health checks
    let no_limit_routes = Router::new().route("/api/health", get(handlers::health::health));

    // 2. Public: read-only availability endpoints (120 req/min)
    let public_routes = Router::new()
        .route("/api/services", get(handlers::availability::list_services))
        .route("/api/staff", get(handlers::availability::list_staff))
        .route(
            "/api/schedule/slots",
            get(handlers::availability::day_slots),
        )
        .route(
            "/api/schedule/overview",
            get(handlers::availability::overview),
        )
        .route(
            "/api/schedule/dates",
            get(handlers::availability::available_dates),
        )
        .layer(from_fn_with_state(rate_limiter.clone(), rate_limit_public));

    // 3. Admin: schedule configuration (60 req/min)
    let admin_routes = Router::new()
        .route(
            "/api/admin/schedule/{staff_id}",
            get(handlers::admin::get_schedule),
        )
        .route(
            "/api/admin/schedule/{staff_id}",
            put(handlers::admin::upsert_schedule),
        )
        .route("/api/admin/time-off", post(handlers::admin::create_time_off))
        .route(
            "/api/admin/time-off/{id}",
            delete(handlers::admin::delete_time_off),
        )
        .route(
            "/api/admin/holidays/{date}",
            put(handlers::admin::upsert_holiday),
        )
        .route(
            "/api/admin/holidays/{date}",
            delete(handlers::admin::delete_holiday),
        )
        .route("/api/admin/settings", get(handlers::admin::get_settings))
        .route("/api/admin/settings", put(handlers::admin::update_settings))
        .route("/api/admin/staff", post(handlers::admin::create_staff))
        .route("/api/admin/staff/{id}", put(handlers::admin::update_staff))
        .route("/api/admin/services", post(handlers::admin::create_service))
        .route(
            "/api/admin/services/{id}",
            put(handlers::admin::update_service),
        )
        .layer(from_fn_with_state(rate_limiter.clone(), rate_limit_admin));

    let app = Router::new()
        .merge(no_limit_routes)
        .merge(public_routes)
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    tracing::info!("Glowdesk server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
