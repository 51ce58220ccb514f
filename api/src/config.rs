use std::{env, time::Duration};

use anyhow::{Context, Result};
use axum_extra::extract::cookie::SameSite;

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub frontend_origins: Vec<String>,
    pub cookie_secure: bool,
    pub cookie_same_site: SameSite,
    pub session_ttl: Duration,
    pub binance_api_base: String,
    /// How far back price scans look when resolving "latest" rates. A query
    /// cost bound, not a data retention policy: anything older counts as no
    /// rate known.
    pub price_window_days: i64,
    pub scan_interval: Duration,
    pub enable_alert_worker: bool,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let session_ttl = parse_duration_seconds("SESSION_TTL_SECS", 1_209_600);
        let scan_interval = parse_duration_seconds("SCAN_INTERVAL_SECS", 60);
        let db_acquire_timeout = parse_duration_seconds("DB_ACQUIRE_TIMEOUT_SECS", 5);

        let cookie_secure = parse_bool("COOKIE_SECURE", false);
        if is_production_environment() && !cookie_secure {
            anyhow::bail!(
                "COOKIE_SECURE=false in production: session cookies would travel over plain HTTP. \
                Set COOKIE_SECURE=true when deploying behind HTTPS."
            );
        }

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set for API server")?,
            db_max_connections: parse_u32("DB_MAX_CONNECTIONS", 10),
            db_acquire_timeout,
            frontend_origins: parse_origins(),
            cookie_secure,
            cookie_same_site: parse_same_site(&env::var("COOKIE_SAMESITE").ok()),
            session_ttl,
            binance_api_base: env::var("BINANCE_API_BASE")
                .unwrap_or_else(|_| "https://api.binance.com".to_string()),
            price_window_days: parse_i64("PRICE_WINDOW_DAYS", 90),
            scan_interval,
            enable_alert_worker: parse_bool("ENABLE_ALERT_WORKER", false),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .context("PORT must be a valid u16")?,
        })
    }
}

fn is_production_environment() -> bool {
    env::var("ENVIRONMENT")
        .or_else(|_| env::var("ENV"))
        .map(|e| {
            let lower = e.to_lowercase();
            lower == "production" || lower == "prod"
        })
        .unwrap_or(false)
}

fn parse_origins() -> Vec<String> {
    let raw = env::var("FRONTEND_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000".to_string());
    raw.split(',')
        .filter_map(|item| {
            let trimmed = item.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

fn parse_duration_seconds(key: &str, default: u64) -> Duration {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(default))
}

fn parse_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn parse_i64(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn parse_same_site(value: &Option<String>) -> SameSite {
    match value.as_ref().map(|v| v.trim().to_lowercase()).as_deref() {
        Some("strict") => SameSite::Strict,
        Some("none") => SameSite::None,
        _ => SameSite::Lax,
    }
}

fn parse_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes" | "on"))
        .unwrap_or(default)
}
