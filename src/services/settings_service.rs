use std::path::Path;

use chrono::{Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use serde_json::json;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::settings::EngineSettings;

const ENV_DB_PATH: &str = "CHECKLIST_DB_PATH";
const ENV_TIMEZONE: &str = "CHECKLIST_TIMEZONE";
const ENV_SWEEP_INTERVAL: &str = "CHECKLIST_SWEEP_INTERVAL_MINUTES";

/// Resolved engine configuration plus the store timezone used for "today".
#[derive(Debug, Clone)]
pub struct SettingsService {
    settings: EngineSettings,
    timezone: Tz,
}

impl SettingsService {
    pub fn new(settings: EngineSettings) -> AppResult<Self> {
        let timezone = validate(&settings)?;
        Ok(Self { settings, timezone })
    }

    /// Reads the YAML file when given and present, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let mut settings = match path {
            Some(path) if path.exists() => {
                let raw = std::fs::read_to_string(path)?;
                let parsed = parse_yaml(&raw)?;
                info!(target: "app::settings", path = %path.display(), "loaded settings file");
                parsed
            }
            Some(path) => {
                debug!(target: "app::settings", path = %path.display(), "settings file missing, using defaults");
                EngineSettings::default()
            }
            None => EngineSettings::default(),
        };

        apply_overrides(&mut settings, |key| std::env::var(key).ok())?;
        Self::new(settings)
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Current calendar date in the store timezone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }

    /// (month, year) of today in the store timezone.
    pub fn current_period(&self) -> (u32, i32) {
        let today = self.today();
        (today.month(), today.year())
    }

    pub fn now_rfc3339(&self) -> String {
        Utc::now().to_rfc3339()
    }
}

impl Default for SettingsService {
    fn default() -> Self {
        Self {
            settings: EngineSettings::default(),
            timezone: chrono_tz::Asia::Ho_Chi_Minh,
        }
    }
}

pub fn parse_yaml(raw: &str) -> AppResult<EngineSettings> {
    serde_yaml::from_str(raw).map_err(|err| AppError::Validation {
        message: format!("invalid settings file: {err}"),
        source: Some(Box::new(err)),
        details: None,
    })
}

pub fn apply_overrides<F>(settings: &mut EngineSettings, lookup: F) -> AppResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = lookup(ENV_DB_PATH).filter(|value| !value.trim().is_empty()) {
        settings.database_path = path.trim().to_string();
    }

    if let Some(timezone) = lookup(ENV_TIMEZONE).filter(|value| !value.trim().is_empty()) {
        settings.timezone = timezone.trim().to_string();
    }

    if let Some(raw) = lookup(ENV_SWEEP_INTERVAL) {
        settings.sweep_interval_minutes = raw.trim().parse().map_err(|_| {
            AppError::validation_with_details(
                format!("{ENV_SWEEP_INTERVAL} must be a positive integer"),
                json!({"value": raw}),
            )
        })?;
    }

    Ok(())
}

fn validate(settings: &EngineSettings) -> AppResult<Tz> {
    if settings.database_path.trim().is_empty() {
        return Err(AppError::validation("database_path must not be empty"));
    }

    if settings.approval_deadline_days <= 0 {
        return Err(AppError::validation(
            "approval_deadline_days must be greater than zero",
        ));
    }

    if settings.default_daily_baseline < 0.0 {
        return Err(AppError::validation(
            "default_daily_baseline must not be negative",
        ));
    }

    let thresholds = settings.default_thresholds;
    if !(thresholds.a >= thresholds.b && thresholds.b >= thresholds.c) {
        return Err(AppError::validation_with_details(
            "default_thresholds must satisfy A >= B >= C",
            json!({"A": thresholds.a, "B": thresholds.b, "C": thresholds.c}),
        ));
    }

    if settings.sweep_interval_minutes == 0 {
        return Err(AppError::validation(
            "sweep_interval_minutes must be greater than zero",
        ));
    }

    settings
        .timezone
        .parse::<Tz>()
        .map_err(|err| AppError::validation(format!("unknown timezone {}: {err}", settings.timezone)))
}
