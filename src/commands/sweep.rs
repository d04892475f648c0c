use tracing::info;

use crate::models::sweep::SweepReport;

use super::{run_blocking, AppState, CommandResult};

pub async fn sweep_run(state: &AppState) -> CommandResult<SweepReport> {
    let sweeper = state.sweeper();
    let report = run_blocking(move || sweeper.sweep()).await?;
    info!(
        target: "app::command",
        invalidated = report.invalidated_count,
        cascaded = report.cascaded_count,
        skipped = report.skipped,
        "deadline sweep requested"
    );
    Ok(report)
}
