use crate::catalog::SeedCatalog;
use crate::config::KbConfig;
use crate::handlers::{admin, articles, categories, health, seed};
use crate::middleware::{ADMIN_SECRET_HEADER, admin_gate_middleware, http_metrics_middleware};
use crate::services::{SeedOutcome, SeedPolicy, Seeder, Store, connect_store};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Method, Request, header},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use service_core::error::AppError;
use service_core::middleware::{
    REQUEST_ID_HEADER, RequestId, request_id_middleware, security_headers_middleware,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<KbConfig>,
    pub store: Arc<dyn Store>,
    pub seeder: Arc<Seeder>,
}

impl AppState {
    /// Wires the seeder to `store`, loading the catalog named by config.
    pub fn new(config: KbConfig, store: Arc<dyn Store>) -> Result<Self, AppError> {
        let catalog = SeedCatalog::load(config.seed.catalog_path.as_deref())
            .map_err(|e| AppError::ConfigError(anyhow::Error::new(e)))?;
        Ok(Self::with_catalog(config, store, catalog))
    }

    pub fn with_catalog(config: KbConfig, store: Arc<dyn Store>, catalog: SeedCatalog) -> Self {
        let seeder = Arc::new(Seeder::new(
            store.clone(),
            Arc::new(catalog),
            config.seed.store_timeout,
        ));

        Self {
            config: Arc::new(config),
            store,
            seeder,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/_gate", get(admin::gate))
        .route("/seed", post(seed::trigger_seed))
        .route("/ops", get(admin::list_ops))
        .route("/ops/:name", post(admin::run_op))
        .layer(from_fn_with_state(state.clone(), admin_gate_middleware));

    let kb_routes = Router::new()
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route("/articles", get(articles::list_articles))
        .route("/articles/:slug", get(articles::get_article))
        .route("/seed-status", get(seed::seed_status));

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/_health", get(health::health_json))
        .route("/ready", get(health::readiness))
        .route("/metrics", get(health::metrics))
        .route("/seed-status", get(seed::seed_status))
        .nest("/api/kb", kb_routes)
        .nest("/api/admin", admin_routes.clone())
        .nest("/admin", admin_routes)
        .route_layer(from_fn(http_metrics_middleware))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let request_id = request
                    .extensions()
                    .get::<RequestId>()
                    .map(|id| id.0.as_str())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config.security.allowed_origins))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origin = if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(allowed_origins.iter().filter_map(|o| {
            o.parse::<HeaderValue>()
                .map_err(|e| tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e))
                .ok()
        }))
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(ADMIN_SECRET_HEADER),
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
}

/// Migrates then seeds in the background. Failures are logged and the
/// process keeps serving whatever the store holds.
pub fn spawn_boot_seed(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = state.store.migrate().await {
            tracing::error!(error = %e, "Boot migration failed, serving in degraded mode");
            return;
        }

        let policy = SeedPolicy {
            skip_when_populated: state.config.seed.skip_when_populated,
            force: state.config.seed.force,
        };

        match state.seeder.seed_if_needed(policy).await {
            Ok(SeedOutcome::Skipped { category_count }) => {
                tracing::info!(category_count, "Boot seed skipped");
            }
            Ok(SeedOutcome::Reconciled(report)) => {
                tracing::info!(
                    created = report.created(),
                    updated = report.updated(),
                    unchanged = report.unchanged(),
                    violations = report.violations.len(),
                    "Boot seed completed"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "Boot seed failed, serving in degraded mode");
            }
        }
    })
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    pub async fn build(config: KbConfig) -> Result<Self, AppError> {
        let store = connect_store(&config.database)?;
        Self::build_with_store(config, store).await
    }

    pub async fn build_with_store(
        config: KbConfig,
        store: Arc<dyn Store>,
    ) -> Result<Self, AppError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let state = AppState::new(config, store)?;

        let listener = TcpListener::bind(addr).await?;
        let port = listener.local_addr()?.port();

        tracing::info!(port, "HTTP listener bound");

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn store(&self) -> Arc<dyn Store> {
        self.state.store.clone()
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        if self.state.config.seed.on_boot {
            spawn_boot_seed(self.state.clone());
        }

        let router = build_router(self.state);

        tracing::info!(port = self.port, "HTTP server starting");
        axum::serve(self.listener, router).await
    }
}
