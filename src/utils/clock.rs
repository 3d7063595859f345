use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

/// Resolves "today" for the daily pool.
///
/// Pools are keyed by calendar date, so the day boundary is whatever local
/// midnight the deployment configures through `POOL_UTC_OFFSET_MINUTES`.
#[derive(Debug, Clone, Copy)]
pub struct PoolClock {
    offset: FixedOffset,
}

impl PoolClock {
    pub fn from_offset_minutes(minutes: i32) -> Self {
        // Out-of-range offsets fall back to UTC.
        let offset = FixedOffset::east_opt(minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix());
        Self { offset }
    }

    pub fn today(&self) -> NaiveDate {
        self.day_of(Utc::now())
    }

    pub fn day_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }
}
