use crate::{config::Config, utils::clock::PoolClock};
use axum::extract::FromRef;
use sqlx::PgPool;

/// Shared handler state: the Postgres pool, configuration and the pool-day clock.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub clock: PoolClock,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        let clock = PoolClock::from_offset_minutes(config.pool_utc_offset_minutes);
        Self { pool, config, clock }
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for PoolClock {
    fn from_ref(state: &AppState) -> Self {
        state.clock
    }
}
