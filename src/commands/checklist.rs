use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use crate::models::approval::{ApprovalWriteInput, ApprovalWriteResponse, ChecklistItemView};
use crate::models::catalog::DetailCategory;
use crate::models::employee_score::EmployeeMonthlyScore;
use crate::models::monthly::{DetailItemView, MonthlyDayInput, MonthlyDayResponse};
use crate::models::role::Caller;

use super::{run_blocking, AppState, CommandResult};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemsForDateQuery {
    pub staff_id: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetailItemsQuery {
    pub staff_id: Option<String>,
    pub month: Option<u32>,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeScoreQuery {
    #[serde(default)]
    pub staff_id: Option<String>,
    pub month: u32,
    pub year: i32,
}

pub async fn checklist_upsert_approval(
    state: &AppState,
    caller: Caller,
    payload: ApprovalWriteInput,
) -> CommandResult<ApprovalWriteResponse> {
    debug!(target: "app::command", role = %caller.role, item_id = %payload.item_id, "upsert approval");
    let service = state.approvals();
    run_blocking(move || service.upsert_for_caller(&caller, payload)).await
}

pub async fn checklist_upsert_monthly_day(
    state: &AppState,
    caller: Caller,
    payload: MonthlyDayInput,
) -> CommandResult<MonthlyDayResponse> {
    debug!(target: "app::command", role = %caller.role, item_id = %payload.item_id, "upsert monthly day");
    let service = state.checklist();
    run_blocking(move || service.upsert_monthly_day(&caller, payload)).await
}

pub async fn checklist_items_for_date(
    state: &AppState,
    caller: Caller,
    query: Option<ItemsForDateQuery>,
) -> CommandResult<Vec<ChecklistItemView>> {
    let service = state.checklist();
    let query = query.unwrap_or_default();
    run_blocking(move || {
        service.items_for_date(&caller, query.staff_id.as_deref(), query.date.as_deref())
    })
    .await
}

pub async fn checklist_assessment_dates(
    state: &AppState,
    caller: Caller,
    staff_id: Option<String>,
) -> CommandResult<Vec<NaiveDate>> {
    let service = state.checklist();
    run_blocking(move || service.assessment_dates(&caller, staff_id.as_deref())).await
}

pub async fn checklist_detail_items(
    state: &AppState,
    caller: Caller,
    query: Option<DetailItemsQuery>,
) -> CommandResult<Vec<DetailItemView>> {
    let service = state.checklist();
    let query = query.unwrap_or_default();
    run_blocking(move || {
        service.detail_items(&caller, query.staff_id.as_deref(), query.month, query.year)
    })
    .await
}

pub async fn checklist_categories(state: &AppState) -> CommandResult<Vec<DetailCategory>> {
    let service = state.checklist();
    run_blocking(move || service.categories()).await
}

pub async fn checklist_employee_score(
    state: &AppState,
    caller: Caller,
    query: EmployeeScoreQuery,
) -> CommandResult<Option<EmployeeMonthlyScore>> {
    let service = state.checklist();
    run_blocking(move || {
        service.employee_score(&caller, query.staff_id.as_deref(), query.month, query.year)
    })
    .await
}
