use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use tracing::{debug, info};

use crate::db::repositories::approval_repository::ApprovalRepository;
use crate::db::repositories::catalog_repository::CatalogRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::approval::{
    ApprovalRecord, ApprovalUpsert, ApprovalWriteInput, ApprovalWriteResponse,
};
use crate::models::role::Caller;
use crate::services::column_access::ColumnAccessGate;
use crate::services::period_utils::{add_days, ensure_period, parse_date};
use crate::services::settings_service::SettingsService;

/// Daily approval sheet: per (item, staff, date) sign-off state and its countersign deadline.
#[derive(Clone)]
pub struct ApprovalService {
    db: DbPool,
    settings: Arc<SettingsService>,
}

impl ApprovalService {
    pub fn new(db: DbPool, settings: Arc<SettingsService>) -> Self {
        Self { db, settings }
    }

    pub fn deadline_for(&self, assessment_date: NaiveDate) -> AppResult<NaiveDate> {
        add_days(
            assessment_date,
            self.settings.settings().approval_deadline_days,
        )
    }

    /// Applies the supplied columns to the record for (item, staff, date), creating it if needed.
    pub fn upsert(&self, input: &ApprovalUpsert) -> AppResult<ApprovalRecord> {
        let deadline = self.deadline_for(input.assessment_date)?;
        let now = self.settings.now_rfc3339();

        let record = self
            .db
            .with_connection(|conn| ApprovalRepository::upsert(conn, input, deadline, &now))?;

        info!(
            target: "app::approval",
            record_id = %record.id,
            item_id = %record.item_id,
            staff_id = %record.staff_id,
            assessment_date = %record.assessment_date,
            "approval record upserted"
        );
        Ok(record)
    }

    pub fn find(
        &self,
        item_id: &str,
        staff_id: &str,
        assessment_date: NaiveDate,
    ) -> AppResult<Option<ApprovalRecord>> {
        self.db.with_connection(|conn| {
            ApprovalRepository::find_by_key(conn, item_id, staff_id, assessment_date)
        })
    }

    /// Caller-facing write: permission and input checks all run before anything is stored.
    pub fn upsert_for_caller(
        &self,
        caller: &Caller,
        input: ApprovalWriteInput,
    ) -> AppResult<ApprovalWriteResponse> {
        let requested = input.columns.requested_columns();
        ColumnAccessGate::ensure(caller.role, &requested)?;
        if requested.is_empty() {
            return Err(AppError::validation(
                "at least one approval column must be supplied",
            ));
        }

        let item_id = input.item_id.trim().to_string();
        if item_id.is_empty() {
            return Err(AppError::validation("itemId must not be empty"));
        }
        let assessment_date = parse_date(&input.assessment_date)?;
        // The monthly cascade only accepts tracked periods.
        ensure_period(assessment_date.month(), assessment_date.year())?;
        let staff_id = caller.resolve_staff(input.staff_id.as_deref())?;
        let store_id = caller.resolve_store(input.store_id.as_deref())?;

        let known = self
            .db
            .with_connection(|conn| CatalogRepository::item_exists(conn, &item_id))?;
        if !known {
            return Err(AppError::validation(format!(
                "unknown checklist item {item_id}"
            )));
        }

        debug!(
            target: "app::approval",
            role = %caller.role,
            caller = %caller.subject_id,
            %staff_id,
            %item_id,
            "approval write accepted"
        );

        let record = self.upsert(&ApprovalUpsert {
            item_id,
            staff_id,
            store_id,
            assessment_date,
            columns: input.columns,
        })?;

        Ok(ApprovalWriteResponse {
            success: true,
            record: Some(record),
        })
    }
}
