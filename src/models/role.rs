use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AppError, AppResult};

/// Reviewer tier of an authenticated caller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Employee,
    Cht,
    Asm,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Cht => "cht",
            Role::Asm => "asm",
        }
    }

    /// Supervisors and area managers review other staff; employees only see themselves.
    pub fn is_reviewer(&self) -> bool {
        matches!(self, Role::Cht | Role::Asm)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Role {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "employee" => Ok(Role::Employee),
            "cht" => Ok(Role::Cht),
            "asm" => Ok(Role::Asm),
            other => Err(format!("unsupported role: {other}")),
        }
    }
}

/// Approval column of the daily sheet. Each role owns exactly one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ChecklistColumn {
    EmployeeChecked,
    ChtChecked,
    AsmChecked,
}

impl ChecklistColumn {
    pub const ALL: [ChecklistColumn; 3] = [
        ChecklistColumn::EmployeeChecked,
        ChecklistColumn::ChtChecked,
        ChecklistColumn::AsmChecked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChecklistColumn::EmployeeChecked => "employeeChecked",
            ChecklistColumn::ChtChecked => "chtChecked",
            ChecklistColumn::AsmChecked => "asmChecked",
        }
    }

    pub fn owner(&self) -> Role {
        match self {
            ChecklistColumn::EmployeeChecked => Role::Employee,
            ChecklistColumn::ChtChecked => Role::Cht,
            ChecklistColumn::AsmChecked => Role::Asm,
        }
    }
}

impl fmt::Display for ChecklistColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ChecklistColumn {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "employeeChecked" | "employee_checked" => Ok(ChecklistColumn::EmployeeChecked),
            "chtChecked" | "cht_checked" => Ok(ChecklistColumn::ChtChecked),
            "asmChecked" | "asm_checked" => Ok(ChecklistColumn::AsmChecked),
            other => Err(format!("unknown checklist column: {other}")),
        }
    }
}

/// Columns a role may write.
pub fn allowed_columns(role: Role) -> &'static [ChecklistColumn] {
    match role {
        Role::Employee => &[ChecklistColumn::EmployeeChecked],
        Role::Cht => &[ChecklistColumn::ChtChecked],
        Role::Asm => &[ChecklistColumn::AsmChecked],
    }
}

/// Authenticated identity handed over by the session layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Caller {
    pub role: Role,
    pub subject_id: String,
    #[serde(default)]
    pub store_ids: Vec<String>,
}

impl Caller {
    pub fn new(role: Role, subject_id: impl Into<String>, store_ids: Vec<String>) -> Self {
        Self {
            role,
            subject_id: subject_id.into(),
            store_ids,
        }
    }

    /// Builds a caller from raw token claims, normalising the role string once.
    pub fn from_claims(
        role: &str,
        subject_id: impl Into<String>,
        store_ids: Vec<String>,
    ) -> AppResult<Self> {
        let role = Role::try_from(role).map_err(AppError::validation)?;
        let subject_id = subject_id.into().trim().to_string();
        if subject_id.is_empty() {
            return Err(AppError::validation("caller subject id must not be empty"));
        }
        let store_ids = store_ids
            .into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        Ok(Self::new(role, subject_id, store_ids))
    }

    /// Resolves whose records a request targets, enforcing that employees only act on themselves.
    pub fn resolve_staff(&self, requested: Option<&str>) -> AppResult<String> {
        let requested = requested.map(str::trim).filter(|value| !value.is_empty());
        match requested {
            None => Ok(self.subject_id.clone()),
            Some(staff_id) if staff_id == self.subject_id => Ok(staff_id.to_string()),
            Some(staff_id) if self.role.is_reviewer() => Ok(staff_id.to_string()),
            Some(staff_id) => Err(AppError::forbidden(format!(
                "employee {} may not act on records of {staff_id}",
                self.subject_id
            ))),
        }
    }

    /// Resolves the store a write is attributed to. It must be one of the caller's stores.
    pub fn resolve_store(&self, requested: Option<&str>) -> AppResult<String> {
        let requested = requested.map(str::trim).filter(|value| !value.is_empty());
        match requested {
            Some(store_id) if self.store_ids.iter().any(|id| id == store_id) => {
                Ok(store_id.to_string())
            }
            Some(store_id) => Err(AppError::forbidden(format!(
                "caller {} is not a member of store {store_id}",
                self.subject_id
            ))),
            None => self.store_ids.first().cloned().ok_or_else(|| {
                AppError::validation(format!("caller {} has no store membership", self.subject_id))
            }),
        }
    }
}
