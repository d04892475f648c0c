use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use crate::db::repositories::approval_repository::ApprovalRepository;
use crate::db::repositories::catalog_repository::CatalogRepository;
use crate::db::repositories::employee_score_repository::EmployeeScoreRepository;
use crate::db::repositories::monthly_tracking_repository::MonthlyTrackingRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::approval::ChecklistItemView;
use crate::models::catalog::DetailCategory;
use crate::models::employee_score::EmployeeMonthlyScore;
use crate::models::monthly::{DetailItemView, MonthlyDayInput, MonthlyDayResponse, MonthlyDayUpsert};
use crate::models::role::Caller;
use crate::services::monthly_tracking_service::MonthlyTrackingService;
use crate::services::period_utils::{ensure_day, ensure_period, parse_optional_date};
use crate::services::scoring_service::ScoringService;
use crate::services::settings_service::SettingsService;

/// Caller-facing monthly writes plus the read views of both sheets.
#[derive(Clone)]
pub struct ChecklistService {
    db: DbPool,
    settings: Arc<SettingsService>,
    tracking: Arc<MonthlyTrackingService>,
    scoring: Arc<ScoringService>,
}

impl ChecklistService {
    pub fn new(
        db: DbPool,
        settings: Arc<SettingsService>,
        tracking: Arc<MonthlyTrackingService>,
        scoring: Arc<ScoringService>,
    ) -> Self {
        Self {
            db,
            settings,
            tracking,
            scoring,
        }
    }

    /// Sets one day of the tracker and rescores it in the same transaction.
    pub fn upsert_monthly_day(
        &self,
        caller: &Caller,
        input: MonthlyDayInput,
    ) -> AppResult<MonthlyDayResponse> {
        ensure_day(input.day, input.month, input.year)?;
        let item_id = input.item_id.trim().to_string();
        if item_id.is_empty() {
            return Err(AppError::validation("itemId must not be empty"));
        }
        let staff_id = caller.resolve_staff(input.staff_id.as_deref())?;
        let store_id = caller.resolve_store(input.store_id.as_deref())?;

        let upsert = MonthlyDayUpsert {
            item_id,
            staff_id,
            store_id,
            month: input.month,
            year: input.year,
            day: input.day,
            checked: input.checked,
        };

        let record = self.db.with_transaction(|conn| {
            if !CatalogRepository::item_exists(conn, &upsert.item_id)? {
                return Err(AppError::validation(format!(
                    "unknown checklist item {}",
                    upsert.item_id
                )));
            }

            let record = self.tracking.set_day_on(conn, &upsert)?;
            let rescored = self.scoring.recompute_on(
                conn,
                &upsert.item_id,
                &upsert.staff_id,
                &upsert.store_id,
                upsert.month,
                upsert.year,
            )?;
            Ok(rescored.map(|outcome| outcome.tracking).unwrap_or(record))
        })?;

        Ok(MonthlyDayResponse {
            success: true,
            record: Some(record),
        })
    }

    /// Every item with the staff member's approval for `date`, or their latest one when absent.
    pub fn items_for_date(
        &self,
        caller: &Caller,
        staff_id: Option<&str>,
        date: Option<&str>,
    ) -> AppResult<Vec<ChecklistItemView>> {
        let staff_id = caller.resolve_staff(staff_id)?;
        let date = parse_optional_date(date)?;

        self.db.with_connection(|conn| {
            let items = CatalogRepository::list_items_with_categories(conn)?;
            let records = match date {
                Some(date) => ApprovalRepository::list_for_staff_on(conn, &staff_id, date)?,
                None => ApprovalRepository::list_latest_for_staff(conn, &staff_id)?,
            };

            let mut by_item: HashMap<String, _> = records
                .into_iter()
                .map(|record| (record.item_id.clone(), record))
                .collect();

            let views: Vec<ChecklistItemView> = items
                .into_iter()
                .map(|(item, _)| {
                    let record = by_item.remove(&item.id);
                    ChecklistItemView { item, record }
                })
                .collect();

            debug!(
                target: "app::approval",
                %staff_id,
                items = views.len(),
                "approval sheet loaded"
            );
            Ok(views)
        })
    }

    pub fn assessment_dates(
        &self,
        caller: &Caller,
        staff_id: Option<&str>,
    ) -> AppResult<Vec<NaiveDate>> {
        let staff_id = caller.resolve_staff(staff_id)?;
        self.db
            .with_connection(|conn| ApprovalRepository::list_assessment_dates(conn, &staff_id))
    }

    /// Every item with its category and the staff member's tracker for the period.
    /// Month and year default to the current period in the store timezone.
    pub fn detail_items(
        &self,
        caller: &Caller,
        staff_id: Option<&str>,
        month: Option<u32>,
        year: Option<i32>,
    ) -> AppResult<Vec<DetailItemView>> {
        let staff_id = caller.resolve_staff(staff_id)?;
        let (current_month, current_year) = self.settings.current_period();
        let month = month.unwrap_or(current_month);
        let year = year.unwrap_or(current_year);
        ensure_period(month, year)?;

        self.db.with_connection(|conn| {
            let items = CatalogRepository::list_items_with_categories(conn)?;
            let mut by_item: HashMap<String, _> =
                MonthlyTrackingRepository::list_for_staff_period(conn, &staff_id, month, year)?
                    .into_iter()
                    .map(|record| (record.item_id.clone(), record))
                    .collect();

            Ok(items
                .into_iter()
                .map(|(item, category)| {
                    let record = by_item.remove(&item.id);
                    DetailItemView {
                        item,
                        category,
                        record,
                    }
                })
                .collect())
        })
    }

    pub fn categories(&self) -> AppResult<Vec<DetailCategory>> {
        self.db.with_connection(CatalogRepository::list_categories)
    }

    pub fn employee_score(
        &self,
        caller: &Caller,
        staff_id: Option<&str>,
        month: u32,
        year: i32,
    ) -> AppResult<Option<EmployeeMonthlyScore>> {
        ensure_period(month, year)?;
        let staff_id = caller.resolve_staff(staff_id)?;
        self.db.with_connection(|conn| {
            EmployeeScoreRepository::find_by_period(conn, &staff_id, month, year)
        })
    }
}
