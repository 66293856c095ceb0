use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    routing::{get, post},
    Router,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod aggregate;
mod auth;
mod comparison;
mod config;
mod error;
mod format;
mod handlers;
mod models;
mod orders;
mod renewal;
mod report;
mod store;

#[cfg(test)]
mod test_support;

use auth::TokenService;
use handlers::{api, print, spa};
use report::ReportGenerator;
use store::Store;

/// Client lists carry whole generated reports, so bodies can get large.
const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

// ── Shared application state ───────────────────────────────────────────────

pub struct AppState {
    pub config: config::AppConfig,
    pub store: Store,
    pub tokens: TokenService,
    pub reports: ReportGenerator,
}

impl AppState {
    pub async fn new(config: config::AppConfig) -> anyhow::Result<Self> {
        let store = Store::open(&config.data_dir).await?;
        let tokens = TokenService::new(&config.jwt_secret, config.session_duration_hours);
        let reports = ReportGenerator::new(config.openai.clone())?;

        Ok(Self {
            config,
            store,
            tokens,
            reports,
        })
    }
}

// ── Router ─────────────────────────────────────────────────────────────────

pub fn app(state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        // Public
        .route("/health", get(api::health))
        .route("/login", post(api::login))
        // Account
        .route("/change-password", post(api::change_password))
        // Clients
        .route("/clients", get(api::get_clients).post(api::save_clients))
        .route("/clients/:id/summary", get(api::client_summary))
        .route("/clients/:id/renew", post(api::renew_service))
        .route("/clients/:id/reports", post(api::generate_report))
        .route("/clients/:id/reports/:report_id/print", get(print::report))
        .route("/control/overview", get(api::control_overview))
        .route("/export", get(api::export_clients))
        .route("/import", post(api::import_clients))
        // Service orders
        .route(
            "/service-orders",
            get(api::get_orders).post(api::save_orders),
        )
        .route("/service-orders/new", post(api::create_order))
        .route("/service-orders/stats", get(api::order_stats))
        .route("/service-orders/:id/print", get(print::service_order))
        .fallback(api::not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    Router::new()
        .nest("/api", api_router)
        .fallback(spa::frontend)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// ── Entry point ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (ignore error if file is absent; env vars may already be set)
    dotenvy::dotenv().ok();

    // Initialise structured logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adspanel=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::AppConfig::from_env()?;
    tracing::info!("Starting AdsPanel on {}:{}", config.host, config.port);
    tracing::info!("Data directory: {}", config.data_dir.display());
    if !config.static_dir.join("index.html").exists() {
        tracing::warn!(
            "No frontend build found in {}; only /api is served",
            config.static_dir.display()
        );
    }
    if config.openai.api_key.is_none() {
        tracing::info!("OPENAI_API_KEY not set; AI reports are disabled");
    }

    let bind_addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(config).await?);
    let app = app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
