//! Event Check-in Service - Main Application Entry Point
//!
//! This is a REST API server for event check-in collection. Attendees scan a
//! QR code and submit a short form; staff dashboards read masked listings,
//! statistics, and a live stream of arrivals.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Authentication**: API key with SHA-256 hashing (admin and viewer roles)
//! - **Privacy**: Attendee fields encrypted at rest (AES-256-GCM), masked for viewers
//! - **Format**: JSON requests/responses, SSE for the live stream
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Bootstrap an admin API key if none exists
//! 5. Build HTTP router with routes and middleware
//! 6. Start server on configured port

mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod notify;
mod services;
mod state;

use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, patch, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    // First-run setup: without at least one admin key nobody can create events
    services::bootstrap::bootstrap_admin_key(&pool).await?;

    let state = state::AppState::new(pool, &config);

    // Create authenticated routes (staff and admin endpoints)
    let authenticated_routes = Router::new()
        // Event management routes
        .route("/api/v1/events", post(handlers::events::create_event))
        .route("/api/v1/events", get(handlers::events::list_events))
        .route(
            "/api/v1/events/{id}",
            patch(handlers::events::update_event),
        )
        .route(
            "/api/v1/events/{id}/display-limit",
            put(handlers::events::set_display_limit),
        )
        // Statistics routes
        .route("/api/v1/stats", get(handlers::events::get_overall_stats))
        .route(
            "/api/v1/events/{id}/stats",
            get(handlers::events::get_event_stats),
        )
        // Check-in management routes
        .route("/api/v1/checkins", get(handlers::checkins::list_checkins))
        .route(
            "/api/v1/checkins/masked",
            get(handlers::checkins::list_masked_checkins),
        )
        .route(
            "/api/v1/checkins/stream",
            get(handlers::stream::checkin_stream),
        )
        .route(
            "/api/v1/checkins/{id}",
            patch(handlers::checkins::update_checkin),
        )
        .route(
            "/api/v1/checkins/{id}",
            delete(handlers::checkins::delete_checkin),
        )
        // Apply authentication middleware to all routes in this group
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    // Combine authenticated routes with public routes
    let app = Router::new()
        // Public routes (no authentication required)
        .route("/health", get(handlers::health::health_check))
        .route(
            "/api/v1/events/by-slug/{slug}",
            get(handlers::events::get_event_by_slug),
        )
        .route(
            "/api/v1/events/by-slug/{slug}/checkins",
            post(handlers::checkins::submit_event_checkin),
        )
        .route(
            "/api/v1/checkins",
            post(handlers::checkins::submit_legacy_checkin),
        )
        // Merge authenticated routes
        .merge(authenticated_routes)
        // Add distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        // The check-in form and dashboards are served from other origins
        .layer(CorsLayer::permissive())
        // Share pool, cipher, and notifier with all handlers via State extraction
        .with_state(state);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Start serving HTTP requests
    // ConnectInfo exposes the peer address for the duplicate-submission guard
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
