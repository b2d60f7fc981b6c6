use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct KbConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub seed: SeedConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SeedConfig {
    /// Reconcile the catalog in the background after the listener is up.
    pub on_boot: bool,
    /// Boot-time fast path: skip the pass when categories already exist.
    pub skip_when_populated: bool,
    /// Overrides `skip_when_populated`.
    pub force: bool,
    /// Upper bound for every individual store call made while seeding.
    pub store_timeout: Duration,
    pub catalog_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Shared secret for `/api/admin`. Unset means admin routes answer 503.
    pub admin_secret: Option<Secret<String>>,
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Sqlite,
}

impl StoreBackend {
    pub fn from_url(url: &str) -> Result<Self, String> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(StoreBackend::Postgres)
        } else if url.starts_with("sqlite:") {
            Ok(StoreBackend::Sqlite)
        } else {
            Err(format!(
                "Unsupported DATABASE_URL scheme (expected postgres:// or sqlite:): {}",
                redact_url(url)
            ))
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Postgres => "postgres",
            StoreBackend::Sqlite => "sqlite",
        }
    }
}

impl DatabaseConfig {
    pub fn backend(&self) -> Result<StoreBackend, AppError> {
        StoreBackend::from_url(&self.url).map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))
    }
}

impl KbConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common = core_config::Config::load()?;

        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let database = DatabaseConfig {
            url: get_env("DATABASE_URL", Some("sqlite:data/fixgeni.db"), is_prod)?,
            max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 10)?,
            acquire_timeout: Duration::from_secs(parse_env("DATABASE_ACQUIRE_TIMEOUT_SECS", 5)?),
        };
        database.backend()?;

        let seed = SeedConfig {
            on_boot: parse_env("SEED_ON_BOOT", true)?,
            skip_when_populated: parse_env("SEED_SKIP_WHEN_POPULATED", false)?,
            force: parse_env("FORCE_SEED", false)?,
            store_timeout: Duration::from_secs(parse_env("SEED_STORE_TIMEOUT_SECS", 10)?),
            catalog_path: env::var("SEED_CATALOG_PATH").ok().map(PathBuf::from),
        };

        let security = SecurityConfig {
            admin_secret: env::var("SECURITY_SECRET_KEY")
                .ok()
                .filter(|s| !s.is_empty())
                .map(Secret::new),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|v| parse_origins(&v))
                .unwrap_or_default(),
        };

        Ok(KbConfig {
            common,
            service_name: get_env("SERVICE_NAME", Some("kb-service"), false)?,
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: get_env("LOG_LEVEL", Some("info"), false)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            database,
            seed,
            security,
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Strips credentials from a connection string before it reaches a log line.
pub fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val.trim().parse().map_err(|e: T::Err| {
            AppError::ConfigError(anyhow::anyhow!("Invalid value for {}: '{}' ({})", key, val, e))
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_from_url_scheme() {
        assert_eq!(
            StoreBackend::from_url("postgres://u:p@localhost/kb"),
            Ok(StoreBackend::Postgres)
        );
        assert_eq!(
            StoreBackend::from_url("postgresql://localhost/kb"),
            Ok(StoreBackend::Postgres)
        );
        assert_eq!(
            StoreBackend::from_url("sqlite:data/fixgeni.db"),
            Ok(StoreBackend::Sqlite)
        );
        assert!(StoreBackend::from_url("mysql://localhost/kb").is_err());
    }

    #[test]
    fn redacts_credentials() {
        assert_eq!(
            redact_url("postgres://admin:hunter2@db:5432/kb"),
            "postgres://***@db:5432/kb"
        );
        assert_eq!(redact_url("sqlite:data/fixgeni.db"), "sqlite:data/fixgeni.db");
    }

    #[test]
    fn origins_are_trimmed_and_split() {
        assert_eq!(
            parse_origins(" https://a.example , ,https://b.example"),
            vec!["https://a.example", "https://b.example"]
        );
    }
}
