use serde::{Deserialize, Serialize};

use crate::models::catalog::Thresholds;

pub const DEFAULT_DATABASE_PATH: &str = "checklist.sqlite";
pub const DEFAULT_TIMEZONE: &str = "Asia/Ho_Chi_Minh";
pub const DEFAULT_APPROVAL_DEADLINE_DAYS: i64 = 3;
pub const DEFAULT_DAILY_BASELINE: f64 = 26.0;
pub const DEFAULT_SWEEP_INTERVAL_MINUTES: u64 = 60;
pub const DEFAULT_LOG_DIRECTIVES: &str = "info,app::db=info,app::sweep=info";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", default)]
pub struct EngineSettings {
    pub database_path: String,
    pub timezone: String,
    pub approval_deadline_days: i64,
    pub default_daily_baseline: f64,
    pub default_thresholds: Thresholds,
    pub sweep_interval_minutes: u64,
    pub logging: LoggingSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            approval_deadline_days: DEFAULT_APPROVAL_DEADLINE_DAYS,
            default_daily_baseline: DEFAULT_DAILY_BASELINE,
            default_thresholds: Thresholds::default(),
            sweep_interval_minutes: DEFAULT_SWEEP_INTERVAL_MINUTES,
            logging: LoggingSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", default)]
pub struct LoggingSettings {
    pub directives: String,
    /// Daily rolling log files are written here when set.
    pub log_dir: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directives: DEFAULT_LOG_DIRECTIVES.to_string(),
            log_dir: None,
        }
    }
}
