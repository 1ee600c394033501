use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    Supabase,
    Memory,
}

impl FromStr for BackendMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "supabase" => Ok(BackendMode::Supabase),
            "memory" => Ok(BackendMode::Memory),
            other => Err(format!("unknown backend '{other}', expected supabase or memory")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub backend: BackendMode,
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
    pub app_origin: String,
    pub cache_dir: PathBuf,
    pub snapshot_quota_bytes: usize,
    pub event_buffer_size: usize,
    pub driver_details_delay_ms: u64,
    pub static_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let config = Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            backend: parse_or_default("BACKEND", BackendMode::Supabase)?,
            supabase_url: env::var("SUPABASE_URL").ok().filter(|v| !v.trim().is_empty()),
            supabase_key: env::var("SUPABASE_KEY").ok().filter(|v| !v.trim().is_empty()),
            app_origin: env::var("APP_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:4200".to_string()),
            cache_dir: env::var("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".vantage-cache")),
            snapshot_quota_bytes: parse_or_default("SNAPSHOT_QUOTA_BYTES", 5 * 1024 * 1024)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            driver_details_delay_ms: parse_or_default("DRIVER_DETAILS_DELAY_MS", 500)?,
            static_dir: env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("static")),
        };

        if config.backend == BackendMode::Supabase
            && (config.supabase_url.is_none() || config.supabase_key.is_none())
        {
            return Err(AppError::Internal(
                "SUPABASE_URL and SUPABASE_KEY are required when BACKEND=supabase".to_string(),
            ));
        }

        Ok(config)
    }

    /// Settings for an in-process deployment, used by tests and demos.
    pub fn in_memory(cache_dir: PathBuf) -> Self {
        Self {
            http_port: 0,
            log_level: "info".to_string(),
            backend: BackendMode::Memory,
            supabase_url: None,
            supabase_key: None,
            app_origin: "http://localhost:4200".to_string(),
            cache_dir,
            snapshot_quota_bytes: 5 * 1024 * 1024,
            event_buffer_size: 1024,
            driver_details_delay_ms: 0,
            static_dir: PathBuf::from("static"),
        }
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
