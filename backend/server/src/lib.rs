//! # Survey backend
//!
//! HTTP surface for restaurant feedback surveys with an optional prize draw.
//!
//! ## Flow
//! - Merchants register, log in and manage their lotteries and surveys
//! - Customers submit a response; if the survey is linked to a lottery they get a draw result back
//! - The dashboard reads response timestamps and turns them into totals, deltas and chart series
//! - Analysis sends a digest of one survey's answers to a hosted text model
//!
//! ## Layout
//! - `records`: hosted table store, typed rows, retries and paging
//! - `insight`: draw, trends, dashboard scope and summarization
//! - this crate: configuration, state, routes and error mapping
//!
//! ## Configuration
//!
//! | Variable | Default |
//! |---|---|
//! | `RUST_PORT` | `8001` |
//! | `STORE_URL` | `http://localhost:54321` |
//! | `STORE_KEY` | secret, required |
//! | `GEMINI_API_KEY` | secret, optional |
//! | `STORE_RETRY_ATTEMPTS` / `STORE_RETRY_DELAY_MS` | `3` / `500` |
//! | `STORE_PAGE_SIZE` / `STORE_MAX_PAGES` | `1000` / `100` |
//! | `CORS_ORIGIN_PATTERN` | vercel previews and localhost |
//!
//! Secrets are read from `/run/secrets/<NAME>` first, then from the environment.
//!
//! ```sh
//! RUST_LOG=info cargo run --bin survey
//! ```
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, post, put},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod error;
pub mod payloads;
pub mod routes;
pub mod state;
pub mod utils;

use routes::*;
use state::State;
use utils::origin_allowed;

pub fn build_router(state: Arc<State>) -> Router {
    let allowed_origins = state.allowed_origins.clone();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin, _| {
            origin_allowed(&allowed_origins, origin)
        }))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    let api = Router::new()
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler))
        .route("/merchants", get(list_merchants_handler))
        .route(
            "/merchants/{id}",
            put(update_merchant_handler).delete(delete_merchant_handler),
        )
        .route(
            "/lotteries",
            get(list_lotteries_handler).post(create_lottery_handler),
        )
        .route(
            "/lotteries/{id}",
            put(update_lottery_handler).delete(delete_lottery_handler),
        )
        .route(
            "/surveys",
            get(list_surveys_handler).post(create_survey_handler),
        )
        .route(
            "/surveys/{id}",
            get(get_survey_handler)
                .put(update_survey_handler)
                .delete(delete_survey_handler),
        )
        .route(
            "/responses",
            get(list_responses_handler).post(submit_response_handler),
        )
        .route("/analytics/dashboard-stats", get(dashboard_stats_handler))
        .route("/analytics/trends", get(trends_handler))
        .route("/analytics/analyze", post(analyze_handler));

    Router::new()
        .route("/", get(root_handler))
        .nest("/api", api)
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = State::new().await;
    info!("Record store backend: {}", state.db.backend_tag());

    info!("Starting server...");
    let address = format!("0.0.0.0:{}", state.config.port);
    let app = build_router(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    info!("Server shutting down...");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
