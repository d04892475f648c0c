use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::catalog::ChecklistItem;
use crate::models::role::ChecklistColumn;

/// Daily approval state of one item for one staff member on one date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRecord {
    pub id: String,
    pub item_id: String,
    pub staff_id: String,
    pub store_id: String,
    pub assessment_date: NaiveDate,
    pub employee_checked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_checked_at: Option<String>,
    pub cht_checked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cht_checked_at: Option<String>,
    pub asm_checked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asm_checked_at: Option<String>,
    pub deadline_date: NaiveDate,
    pub is_locked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Column values supplied by a write. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_checked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cht_checked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asm_checked: Option<bool>,
}

impl ColumnValues {
    pub fn single(column: ChecklistColumn, value: bool) -> Self {
        let mut values = Self::default();
        values.set(column, value);
        values
    }

    pub fn set(&mut self, column: ChecklistColumn, value: bool) {
        match column {
            ChecklistColumn::EmployeeChecked => self.employee_checked = Some(value),
            ChecklistColumn::ChtChecked => self.cht_checked = Some(value),
            ChecklistColumn::AsmChecked => self.asm_checked = Some(value),
        }
    }

    pub fn get(&self, column: ChecklistColumn) -> Option<bool> {
        match column {
            ChecklistColumn::EmployeeChecked => self.employee_checked,
            ChecklistColumn::ChtChecked => self.cht_checked,
            ChecklistColumn::AsmChecked => self.asm_checked,
        }
    }

    pub fn requested_columns(&self) -> Vec<ChecklistColumn> {
        ChecklistColumn::ALL
            .into_iter()
            .filter(|column| self.get(*column).is_some())
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ApprovalUpsert {
    pub item_id: String,
    pub staff_id: String,
    pub store_id: String,
    pub assessment_date: NaiveDate,
    pub columns: ColumnValues,
}

/// Write request as received from the API layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalWriteInput {
    pub item_id: String,
    #[serde(default)]
    pub staff_id: Option<String>,
    #[serde(default)]
    pub store_id: Option<String>,
    pub assessment_date: String,
    pub columns: ColumnValues,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalWriteResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<ApprovalRecord>,
}

/// Identity of a record the deadline sweep has just locked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedApproval {
    pub id: String,
    pub item_id: String,
    pub staff_id: String,
    pub store_id: String,
    pub assessment_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItemView {
    pub item: ChecklistItem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<ApprovalRecord>,
}
