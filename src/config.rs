// src/config.rs

use std::env;
use std::str::FromStr;
use dotenvy::dotenv;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    pub port: u16,
    pub max_connections: u32,
    /// Page size used by every paginated listing.
    pub per_page: i64,
    /// Offset of the pool calendar day from UTC, in minutes.
    pub pool_utc_offset_minutes: i32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        Self {
            database_url,
            jwt_secret,
            rust_log,
            port: env_or("PORT", 3000),
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", 5),
            per_page: env_or("PER_PAGE", 20),
            pool_utc_offset_minutes: env_or("POOL_UTC_OFFSET_MINUTES", 0),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}
