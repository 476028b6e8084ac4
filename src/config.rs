use crate::error::{Error, Result};
use crate::services::audit_service::AuditPolicy;
use dotenvy::dotenv;
use http::Method;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;

const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:5173",
    "http://localhost:3002",
    "http://localhost:3001",
    "http://localhost:8080",
    "https://buildtrust.vercel.app",
    "https://build-trust-frontend.vercel.app",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub frontend_url: String,
    /// Public origin used when building document URLs; falls back to the request host.
    pub backend_url: Option<String>,
    /// Mail relay endpoint. When unset, outgoing mail is only logged.
    pub email_api_url: Option<String>,
    pub uploads_dir: String,
    pub max_upload_bytes: usize,
    pub allowed_origins: Vec<String>,
    pub audit: AuditPolicy,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env_or("SERVER_ADDRESS", "0.0.0.0:3001"),
            database_url: get_env("DATABASE_URL")?,
            db_max_connections: get_env_parse_or("DB_MAX_CONNECTIONS", 10)?,
            db_acquire_timeout: Duration::from_secs(get_env_parse_or(
                "DB_ACQUIRE_TIMEOUT_SECS",
                30,
            )?),
            jwt_secret: get_env("JWT_SECRET")?,
            jwt_ttl_hours: get_env_parse_or("JWT_TTL_HOURS", 24 * 7)?,
            frontend_url: get_env_or("FRONTEND_URL", "http://localhost:5173"),
            backend_url: get_optional_env("BACKEND_URL"),
            email_api_url: get_optional_env("EMAIL_API_URL"),
            uploads_dir: get_env_or("UPLOADS_DIR", "uploads"),
            max_upload_bytes: get_env_parse_or("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            allowed_origins: match get_optional_env("CORS_ALLOWED_ORIGINS") {
                Some(raw) => split_list(&raw),
                None => DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
            },
            audit: audit_policy_from_env()?,
        })
    }
}

fn audit_policy_from_env() -> Result<AuditPolicy> {
    let defaults = AuditPolicy::default();

    let skip_routes = get_optional_env("AUDIT_SKIP_ROUTES")
        .map(|raw| split_list(&raw))
        .unwrap_or(defaults.skip_routes);

    let methods = match get_optional_env("AUDIT_METHODS") {
        Some(raw) => {
            let parsed = split_list(&raw)
                .into_iter()
                .map(|m| {
                    Method::from_bytes(m.to_ascii_uppercase().as_bytes()).map_err(|e| {
                        Error::Config(format!("Invalid value for AUDIT_METHODS: {}", e))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Some(parsed)
        }
        None => defaults.methods,
    };

    let status_min: Option<u16> = get_optional_env_parse("AUDIT_STATUS_MIN")?;
    let status_max: Option<u16> = get_optional_env_parse("AUDIT_STATUS_MAX")?;
    let status_range = match (status_min, status_max) {
        (None, None) => defaults.status_range,
        (min, max) => {
            let min = min.unwrap_or(100);
            let max = max.unwrap_or(599);
            if min > max {
                return Err(Error::Config(format!(
                    "AUDIT_STATUS_MIN ({}) is greater than AUDIT_STATUS_MAX ({})",
                    min, max
                )));
            }
            Some(min..=max)
        }
    };

    Ok(AuditPolicy {
        version: defaults.version,
        skip_routes,
        methods,
        status_range,
        redact_fields: defaults.redact_fields,
        response_body_limit: get_env_parse_or(
            "AUDIT_RESPONSE_LIMIT",
            defaults.response_body_limit,
        )?,
        max_capture_bytes: get_env_parse_or("AUDIT_MAX_CAPTURE_BYTES", defaults.max_capture_bytes)?,
        drain_delay: Duration::from_millis(get_env_parse_or(
            "AUDIT_DRAIN_DELAY_MS",
            defaults.drain_delay.as_millis() as u64,
        )?),
        item_delay: Duration::from_millis(get_env_parse_or(
            "AUDIT_ITEM_DELAY_MS",
            defaults.item_delay.as_millis() as u64,
        )?),
    })
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_optional_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_or(name: &str, default: &str) -> String {
    get_optional_env(name).unwrap_or_else(|| default.to_string())
}

fn get_optional_env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(name)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
        })
        .transpose()
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    Ok(get_optional_env_parse(name)?.unwrap_or(default))
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
