pub mod commands;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use std::path::PathBuf;

use tracing::info;

use crate::commands::AppState;
use crate::error::AppResult;
use crate::services::settings_service::SettingsService;

/// How the sweeper process should run.
#[derive(Debug, Clone, Default)]
pub struct SweeperOptions {
    pub config_path: Option<PathBuf>,
    pub once: bool,
}

pub fn run(options: SweeperOptions) -> AppResult<()> {
    let settings = SettingsService::load(options.config_path.as_deref())?;
    crate::utils::logger::init_logging(&settings.settings().logging)?;

    info!(
        target: "app::sweep",
        db_path = %settings.settings().database_path,
        timezone = %settings.timezone(),
        once = options.once,
        "starting checklist sweeper"
    );

    let state = AppState::from_settings(settings)?;

    if options.once {
        let report = state.sweeper().sweep()?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    state.start_background_jobs()?;
    loop {
        std::thread::park();
    }
}
