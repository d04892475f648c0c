use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{debug, error, info, warn};

use crate::db::repositories::approval_repository::ApprovalRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::approval::LockedApproval;
use crate::models::monthly::MonthlyDayUpsert;
use crate::models::sweep::SweepReport;
use crate::services::monthly_tracking_service::MonthlyTrackingService;
use crate::services::period_utils::period_of;
use crate::services::scoring_service::ScoringService;
use crate::services::settings_service::SettingsService;

/// Discards self-reports that were not countersigned in time and pulls them out of the
/// monthly tracker and scores.
pub struct DeadlineSweeper {
    db: DbPool,
    tracking: Arc<MonthlyTrackingService>,
    scoring: Arc<ScoringService>,
    settings: Arc<SettingsService>,
    running: AtomicBool,
    job_started: AtomicBool,
}

/// Releases the single-flight flag however the sweep exits.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl DeadlineSweeper {
    pub fn new(
        db: DbPool,
        tracking: Arc<MonthlyTrackingService>,
        scoring: Arc<ScoringService>,
        settings: Arc<SettingsService>,
    ) -> Self {
        Self {
            db,
            tracking,
            scoring,
            settings,
            running: AtomicBool::new(false),
            job_started: AtomicBool::new(false),
        }
    }

    pub fn sweep(&self) -> AppResult<SweepReport> {
        self.sweep_at(self.settings.today())
    }

    /// Sweeps as if the store calendar were at `today`.
    pub fn sweep_at(&self, today: NaiveDate) -> AppResult<SweepReport> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!(target: "app::sweep", "deadline sweep already running, skipping");
            return Ok(SweepReport::skipped());
        }
        let _guard = RunningGuard(&self.running);

        let now = self.settings.now_rfc3339();
        let locked = self
            .db
            .with_connection(|conn| ApprovalRepository::lock_overdue(conn, today, &now))?;
        info!(
            target: "app::sweep",
            %today,
            invalidated = locked.len(),
            "overdue approvals locked"
        );

        // Includes records whose cascade failed on an earlier run.
        let pending = self
            .db
            .with_connection(ApprovalRepository::list_cascade_pending)?;

        let mut report = SweepReport {
            invalidated_count: locked.len(),
            ..SweepReport::default()
        };

        for record in &pending {
            match self.cascade(record) {
                Ok(()) => report.cascaded_count += 1,
                Err(err) => {
                    error!(
                        target: "app::sweep",
                        record_id = %record.id,
                        item_id = %record.item_id,
                        staff_id = %record.staff_id,
                        error = %err,
                        "monthly cascade failed"
                    );
                    report.failed_records.push(record.id.clone());
                }
            }
        }

        info!(
            target: "app::sweep",
            invalidated = report.invalidated_count,
            cascaded = report.cascaded_count,
            failed = report.failed_records.len(),
            "deadline sweep finished"
        );
        Ok(report)
    }

    /// Clears the record's day in the monthly tracker and rescores, all in one transaction.
    fn cascade(&self, record: &LockedApproval) -> AppResult<()> {
        let (month, year, day) = period_of(record.assessment_date);

        self.db.with_transaction(|conn| {
            self.tracking.set_day_on(
                conn,
                &MonthlyDayUpsert {
                    item_id: record.item_id.clone(),
                    staff_id: record.staff_id.clone(),
                    store_id: record.store_id.clone(),
                    month,
                    year,
                    day,
                    checked: false,
                },
            )?;
            self.scoring.recompute_on(
                conn,
                &record.item_id,
                &record.staff_id,
                &record.store_id,
                month,
                year,
            )?;
            ApprovalRepository::clear_cascade_pending(conn, &record.id)
        })?;

        debug!(
            target: "app::sweep",
            record_id = %record.id,
            %month,
            %year,
            %day,
            "monthly cascade applied"
        );
        Ok(())
    }

    /// Starts the periodic sweep thread once per sweeper.
    pub fn ensure_sweep_job(self: &Arc<Self>) -> AppResult<()> {
        if self
            .job_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let runner = Arc::clone(self);
            if let Err(err) = thread::Builder::new()
                .name("deadline-sweep-job".to_string())
                .spawn(move || {
                    runner.run_loop();
                })
            {
                self.job_started.store(false, Ordering::SeqCst);
                error!(
                    target: "app::sweep",
                    error = %err,
                    "failed to start deadline sweep thread"
                );
                return Err(AppError::other(format!(
                    "failed to start deadline sweep job: {err}"
                )));
            }
        }

        Ok(())
    }

    /// Sweeps immediately, then once per configured interval. Never returns.
    fn run_loop(self: Arc<Self>) {
        let interval = Duration::from_secs(self.settings.settings().sweep_interval_minutes * 60);
        info!(
            target: "app::sweep",
            interval_minutes = self.settings.settings().sweep_interval_minutes,
            "deadline sweep loop started"
        );

        loop {
            if let Err(err) = self.sweep() {
                error!(
                    target: "app::sweep",
                    error = %err,
                    "scheduled deadline sweep failed"
                );
            }
            thread::sleep(interval);
        }
    }
}
