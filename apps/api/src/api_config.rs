use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use hourglass_core::AppError;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Where fixed-window counters live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitStoreConfig {
    Memory,
    Redis,
    Postgres,
}

impl RateLimitStoreConfig {
    fn parse(value: &str) -> Result<Self, AppError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            "postgres" => Ok(Self::Postgres),
            other => Err(AppError::Validation(format!(
                "RATE_LIMIT_STORE must be one of 'memory', 'redis' or 'postgres', got '{other}'"
            ))),
        }
    }
}

/// How bearer tokens are turned into callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityProviderConfig {
    Development,
    Hosted { auth_url: Url, anon_key: String },
}

/// Quota size and window for one limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitSettings {
    pub max_requests: u32,
    pub window_ms: u64,
}

/// Sizing for the Postgres pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_host: String,
    pub api_port: u16,
    pub frontend_url: String,
    pub database_url: Option<String>,
    pub database_pool: PoolSettings,
    pub redis_url: Option<String>,
    pub rate_limit_store: RateLimitStoreConfig,
    pub rate_limit_backend_timeout: Duration,
    pub api_rate_limit: LimitSettings,
    pub rate_limit_headers: bool,
    pub api_rate_limit_skip_successful: bool,
    pub report_rate_limit: LimitSettings,
    pub rate_limit_sweep_interval: Option<Duration>,
    pub identity_provider: IdentityProviderConfig,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = parsed_env("API_PORT", 3001_u16)?;
        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());

        let database_url = optional_non_empty_env("DATABASE_URL");
        let database_pool = PoolSettings {
            max_connections: u32::try_from(positive_env("DATABASE_MAX_CONNECTIONS", 10)?)
                .map_err(|_| {
                    AppError::Validation("DATABASE_MAX_CONNECTIONS is too large".to_owned())
                })?,
            acquire_timeout: Duration::from_millis(positive_env(
                "DATABASE_ACQUIRE_TIMEOUT_MS",
                5_000,
            )?),
        };
        let redis_url = optional_non_empty_env("REDIS_URL");

        let rate_limit_store = RateLimitStoreConfig::parse(
            env::var("RATE_LIMIT_STORE")
                .unwrap_or_else(|_| "memory".to_owned())
                .as_str(),
        )?;
        match rate_limit_store {
            RateLimitStoreConfig::Redis if redis_url.is_none() => {
                return Err(AppError::Validation(
                    "REDIS_URL is required when RATE_LIMIT_STORE=redis".to_owned(),
                ));
            }
            RateLimitStoreConfig::Postgres if database_url.is_none() => {
                return Err(AppError::Validation(
                    "DATABASE_URL is required when RATE_LIMIT_STORE=postgres".to_owned(),
                ));
            }
            _ => {}
        }

        let rate_limit_backend_timeout =
            Duration::from_millis(parsed_env("RATE_LIMIT_BACKEND_TIMEOUT_MS", 250_u64)?);

        let api_rate_limit = LimitSettings {
            max_requests: parsed_env("API_RATE_LIMIT_MAX", 120_u32)?,
            window_ms: positive_env("API_RATE_LIMIT_WINDOW_MS", 60_000)?,
        };
        let rate_limit_headers = bool_env("RATE_LIMIT_HEADERS", true)?;
        let api_rate_limit_skip_successful = bool_env("API_RATE_LIMIT_SKIP_SUCCESSFUL", false)?;

        let report_rate_limit = LimitSettings {
            max_requests: parsed_env("REPORT_RATE_LIMIT_MAX", 10_u32)?,
            window_ms: positive_env("REPORT_RATE_LIMIT_WINDOW_MS", 3_600_000)?,
        };

        let sweep_secs = parsed_env("RATE_LIMIT_SWEEP_INTERVAL_SECS", 300_u64)?;
        let rate_limit_sweep_interval = (sweep_secs > 0).then(|| Duration::from_secs(sweep_secs));

        let identity_provider = match env::var("AUTH_PROVIDER")
            .unwrap_or_else(|_| "development".to_owned())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "development" => IdentityProviderConfig::Development,
            "hosted" => {
                let auth_url = required_non_empty_env("AUTH_URL")?;
                let auth_url = Url::parse(auth_url.as_str())
                    .map_err(|error| AppError::Validation(format!("invalid AUTH_URL: {error}")))?;
                IdentityProviderConfig::Hosted {
                    auth_url,
                    anon_key: required_non_empty_env("AUTH_ANON_KEY")?,
                }
            }
            other => {
                return Err(AppError::Validation(format!(
                    "AUTH_PROVIDER must be either 'hosted' or 'development', got '{other}'"
                )));
            }
        };

        Ok(Self {
            api_host,
            api_port,
            frontend_url,
            database_url,
            database_pool,
            redis_url,
            rate_limit_store,
            rate_limit_backend_timeout,
            api_rate_limit,
            rate_limit_headers,
            api_rate_limit_skip_successful,
            report_rate_limit,
            rate_limit_sweep_interval,
            identity_provider,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn required_non_empty_env(name: &str) -> Result<String, AppError> {
    let value = required_env(name)?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}

fn optional_non_empty_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn parsed_env<T>(name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_setting(name, optional_non_empty_env(name), default)
}

fn positive_env(name: &str, default: u64) -> Result<u64, AppError> {
    positive_setting(name, optional_non_empty_env(name), default)
}

fn bool_env(name: &str, default: bool) -> Result<bool, AppError> {
    bool_setting(name, optional_non_empty_env(name), default)
}

fn parse_setting<T>(name: &str, value: Option<String>, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name} '{value}': {error}"))),
        None => Ok(default),
    }
}

fn positive_setting(name: &str, value: Option<String>, default: u64) -> Result<u64, AppError> {
    let value = parse_setting(name, value, default)?;
    if value == 0 {
        return Err(AppError::Validation(format!(
            "{name} must be greater than zero"
        )));
    }

    Ok(value)
}

fn bool_setting(name: &str, value: Option<String>, default: bool) -> Result<bool, AppError> {
    let Some(value) = value else {
        return Ok(default);
    };

    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(AppError::Validation(format!(
            "{name} must be 'true' or 'false', got '{value}'"
        ))),
    }
}
