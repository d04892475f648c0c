pub mod checklist;
pub mod sweep;

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use tracing::{error, warn};

use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::services::approval_service::ApprovalService;
use crate::services::checklist_service::ChecklistService;
use crate::services::deadline_sweeper::DeadlineSweeper;
use crate::services::monthly_tracking_service::MonthlyTrackingService;
use crate::services::scoring_service::ScoringService;
use crate::services::settings_service::SettingsService;

const PERSISTENCE_MESSAGE: &str = "failed to save";

#[derive(Clone)]
pub struct AppState {
    db_pool: DbPool,
    settings_service: Arc<SettingsService>,
    approval_service: Arc<ApprovalService>,
    tracking_service: Arc<MonthlyTrackingService>,
    scoring_service: Arc<ScoringService>,
    checklist_service: Arc<ChecklistService>,
    sweeper: Arc<DeadlineSweeper>,
}

impl AppState {
    pub fn new(db_pool: DbPool, settings: SettingsService) -> Self {
        let settings_service = Arc::new(settings);
        let approval_service = Arc::new(ApprovalService::new(
            db_pool.clone(),
            Arc::clone(&settings_service),
        ));
        let tracking_service = Arc::new(MonthlyTrackingService::new(
            db_pool.clone(),
            Arc::clone(&settings_service),
        ));
        let scoring_service = Arc::new(ScoringService::new(
            db_pool.clone(),
            Arc::clone(&settings_service),
        ));
        let checklist_service = Arc::new(ChecklistService::new(
            db_pool.clone(),
            Arc::clone(&settings_service),
            Arc::clone(&tracking_service),
            Arc::clone(&scoring_service),
        ));
        let sweeper = Arc::new(DeadlineSweeper::new(
            db_pool.clone(),
            Arc::clone(&tracking_service),
            Arc::clone(&scoring_service),
            Arc::clone(&settings_service),
        ));

        Self {
            db_pool,
            settings_service,
            approval_service,
            tracking_service,
            scoring_service,
            checklist_service,
            sweeper,
        }
    }

    /// Opens the database named by the settings and wires every service onto it.
    pub fn from_settings(settings: SettingsService) -> AppResult<Self> {
        let db_pool = DbPool::new(&settings.settings().database_path)?;
        Ok(Self::new(db_pool, settings))
    }

    pub fn start_background_jobs(&self) -> AppResult<()> {
        self.sweeper.ensure_sweep_job()
    }

    pub fn db(&self) -> DbPool {
        self.db_pool.clone()
    }

    pub fn settings(&self) -> Arc<SettingsService> {
        Arc::clone(&self.settings_service)
    }

    pub fn approvals(&self) -> Arc<ApprovalService> {
        Arc::clone(&self.approval_service)
    }

    pub fn tracking(&self) -> Arc<MonthlyTrackingService> {
        Arc::clone(&self.tracking_service)
    }

    pub fn scoring(&self) -> Arc<ScoringService> {
        Arc::clone(&self.scoring_service)
    }

    pub fn checklist(&self) -> Arc<ChecklistService> {
        Arc::clone(&self.checklist_service)
    }

    pub fn sweeper(&self) -> Arc<DeadlineSweeper> {
        Arc::clone(&self.sweeper)
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl CommandError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<JsonValue>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details,
        }
    }
}

impl From<AppError> for CommandError {
    fn from(error: AppError) -> Self {
        let summary = error.to_string();
        match error {
            AppError::Validation {
                message, details, ..
            } => CommandError::new("VALIDATION_ERROR", message, details),
            AppError::ColumnDenied {
                role,
                denied_columns,
            } => {
                let details = json!({
                    "role": role,
                    "deniedColumns": denied_columns,
                });
                CommandError::new("COLUMN_DENIED", summary, Some(details))
            }
            AppError::Forbidden { message } => CommandError::new("FORBIDDEN", message, None),
            AppError::NotFound => CommandError::new("NOT_FOUND", "record not found", None),
            AppError::Conflict { message } => {
                warn!(target: "app::command", %message, "conflict in command");
                CommandError::new("PERSISTENCE_ERROR", PERSISTENCE_MESSAGE, None)
            }
            AppError::Database { message } => {
                error!(target: "app::command", %message, "database error in command");
                CommandError::new("PERSISTENCE_ERROR", PERSISTENCE_MESSAGE, None)
            }
            AppError::Serialization(error) => {
                error!(target: "app::command", error = %error, "serialization error in command");
                CommandError::new("PERSISTENCE_ERROR", PERSISTENCE_MESSAGE, None)
            }
            AppError::Io(error) => {
                error!(target: "app::command", error = %error, "io error in command");
                CommandError::new("UNKNOWN", "file system access failed", None)
            }
            AppError::Other(message) => {
                error!(target: "app::command", %message, "unexpected error in command");
                CommandError::new("UNKNOWN", message, None)
            }
        }
    }
}

/// Runs a synchronous service call on the blocking pool.
pub(crate) async fn run_blocking<T: Send + 'static>(
    task: impl FnOnce() -> Result<T, AppError> + Send + 'static,
) -> CommandResult<T> {
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| CommandError::new("UNKNOWN", format!("task execution failed: {err}"), None))?
        .map_err(CommandError::from)
}
