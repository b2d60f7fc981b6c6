//! Common test utilities for kb-service integration tests.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use kb_service::catalog::{CategorySeed, SeedCatalog};
use kb_service::config::{DatabaseConfig, KbConfig, SecurityConfig, SeedConfig};
use kb_service::services::Store;
use kb_service::services::sqlite::SqliteStore;
use kb_service::startup::{AppState, build_router};
use secrecy::Secret;
use serde_json::Value;
use service_core::config::Config as CommonConfig;
use std::sync::{Arc, Once};
use std::time::Duration;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub const TEST_SECRET: &str = "test-admin-secret-0123456789";

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,kb_service=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn test_config(database_url: &str, admin_secret: Option<&str>) -> KbConfig {
    KbConfig {
        common: CommonConfig { port: 0 },
        service_name: "kb-service-test".to_string(),
        service_version: "test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: database_url.to_string(),
            max_connections: 4,
            acquire_timeout: Duration::from_secs(5),
        },
        seed: SeedConfig {
            on_boot: false,
            skip_when_populated: false,
            force: false,
            store_timeout: Duration::from_secs(5),
            catalog_path: None,
        },
        security: SecurityConfig {
            admin_secret: admin_secret.map(|s| Secret::new(s.to_string())),
            allowed_origins: vec![],
        },
    }
}

/// A migrated SQLite store in its own temp directory.
pub struct TestStore {
    pub store: Arc<dyn Store>,
    pub database_url: String,
    _dir: TempDir,
}

pub async fn test_store() -> TestStore {
    init_tracing();

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let database_url = format!("sqlite://{}", dir.path().join("kb.db").display());
    let config = test_config(&database_url, None);

    let store = SqliteStore::connect_lazy(&config.database).expect("Failed to open store");
    store.migrate().await.expect("Failed to run migrations");

    TestStore {
        store: Arc::new(store),
        database_url,
        _dir: dir,
    }
}

/// Router plus the state behind it, sharing one store.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<dyn Store>,
    _db: TestStore,
}

pub async fn spawn_app(admin_secret: Option<&str>) -> TestApp {
    spawn_app_with_catalog(admin_secret, SeedCatalog::builtin().expect("builtin catalog")).await
}

pub async fn spawn_app_with_catalog(admin_secret: Option<&str>, catalog: SeedCatalog) -> TestApp {
    let db = test_store().await;
    let config = test_config(&db.database_url, admin_secret);
    let state = AppState::with_catalog(config, db.store.clone(), catalog);

    TestApp {
        router: build_router(state.clone()),
        state,
        store: db.store.clone(),
        _db: db,
    }
}

pub fn two_category_catalog() -> SeedCatalog {
    SeedCatalog {
        categories: vec![
            CategorySeed::new("plumbing", "Plumbing"),
            CategorySeed::new("electrical", "Electrical"),
        ],
        articles: vec![],
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body")
            .to_vec();
        (status, headers, body)
    }

    pub async fn get_json(&self, uri: &str) -> (StatusCode, Value) {
        let (status, _, body) = self
            .send(Request::get(uri).body(Body::empty()).unwrap())
            .await;
        (status, parse_json(&body))
    }

    pub async fn post_json(
        &self,
        uri: &str,
        body: Value,
        secret: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::post(uri).header("content-type", "application/json");
        if let Some(secret) = secret {
            builder = builder.header("x-admin-secret", secret);
        }
        let (status, _, body) = self
            .send(builder.body(Body::from(body.to_string())).unwrap())
            .await;
        (status, parse_json(&body))
    }
}

pub fn parse_json(body: &[u8]) -> Value {
    if body.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(body).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}
