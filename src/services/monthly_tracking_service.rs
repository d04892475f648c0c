use std::sync::Arc;

use rusqlite::Connection;
use tracing::info;

use crate::db::repositories::monthly_tracking_repository::MonthlyTrackingRepository;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::monthly::{MonthlyDayUpsert, MonthlyTrackingRecord};
use crate::services::period_utils::ensure_day;
use crate::services::settings_service::SettingsService;

/// Day-by-day monthly tracker. Derived score fields are left to the scoring engine.
#[derive(Clone)]
pub struct MonthlyTrackingService {
    db: DbPool,
    settings: Arc<SettingsService>,
}

impl MonthlyTrackingService {
    pub fn new(db: DbPool, settings: Arc<SettingsService>) -> Self {
        Self { db, settings }
    }

    pub fn set_day(&self, input: &MonthlyDayUpsert) -> AppResult<MonthlyTrackingRecord> {
        self.db.with_connection(|conn| self.set_day_on(conn, input))
    }

    /// Same as [`set_day`](Self::set_day) on a caller-provided connection or transaction.
    pub fn set_day_on(
        &self,
        conn: &Connection,
        input: &MonthlyDayUpsert,
    ) -> AppResult<MonthlyTrackingRecord> {
        ensure_day(input.day, input.month, input.year)?;

        let now = self.settings.now_rfc3339();
        let record = MonthlyTrackingRepository::set_day(conn, input, &now)?;

        info!(
            target: "app::monthly",
            record_id = %record.id,
            item_id = %record.item_id,
            staff_id = %record.staff_id,
            month = record.month,
            year = record.year,
            day = input.day,
            checked = input.checked,
            "monthly day updated"
        );
        Ok(record)
    }

    pub fn find(
        &self,
        item_id: &str,
        staff_id: &str,
        month: u32,
        year: i32,
    ) -> AppResult<Option<MonthlyTrackingRecord>> {
        self.db.with_connection(|conn| {
            MonthlyTrackingRepository::find_by_key(conn, item_id, staff_id, month, year)
        })
    }
}
