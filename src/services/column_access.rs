use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::models::role::{allowed_columns, ChecklistColumn, Role};

/// Result of checking a write against the role's column ownership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnAccess {
    pub allowed: bool,
    pub denied_columns: Vec<ChecklistColumn>,
}

/// Column-level write permissions of the daily approval sheet.
pub struct ColumnAccessGate;

impl ColumnAccessGate {
    pub fn validate(role: Role, requested: &[ChecklistColumn]) -> ColumnAccess {
        let permitted = allowed_columns(role);
        let mut denied_columns: Vec<ChecklistColumn> = Vec::new();
        for column in requested {
            if !permitted.contains(column) && !denied_columns.contains(column) {
                denied_columns.push(*column);
            }
        }

        ColumnAccess {
            allowed: denied_columns.is_empty(),
            denied_columns,
        }
    }

    pub fn ensure(role: Role, requested: &[ChecklistColumn]) -> AppResult<()> {
        let access = Self::validate(role, requested);
        if access.allowed {
            Ok(())
        } else {
            Err(AppError::column_denied(role, access.denied_columns))
        }
    }
}
