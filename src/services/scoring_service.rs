use std::sync::Arc;

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::db::repositories::catalog_repository::CatalogRepository;
use crate::db::repositories::employee_score_repository::EmployeeScoreRepository;
use crate::db::repositories::monthly_tracking_repository::MonthlyTrackingRepository;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::catalog::{CategoryType, ScoringItem, Thresholds};
use crate::models::employee_score::{
    EmployeeScoreUpsert, FinalClassification, ScoreRecomputation,
};
use crate::models::monthly::{Classification, DailyChecks, TrackingScore};
use crate::services::period_utils::{days_in_month, round2};
use crate::services::settings_service::SettingsService;

const FINAL_A_MIN: f64 = 90.0;
const FINAL_B_MIN: f64 = 70.0;
/// Exclusive: a total of exactly 50 is still a D.
const FINAL_C_ABOVE: f64 = 50.0;

/// Expected monthly occurrences the score is measured against.
///
/// Daily items use the category override or the configured default; weekly and monthly items
/// use their own baseline, and a missing one counts as zero.
pub fn effective_baseline(item: &ScoringItem, default_daily_baseline: f64) -> f64 {
    match item.category_type {
        CategoryType::Daily => item.criteria.baseline.unwrap_or(default_daily_baseline),
        CategoryType::Weekly | CategoryType::Monthly => item.item.baseline.unwrap_or(0.0),
    }
}

pub fn classify_item(score_achieved: f64, thresholds: &Thresholds) -> Classification {
    if score_achieved >= thresholds.a {
        Classification::A
    } else if score_achieved >= thresholds.b {
        Classification::B
    } else if score_achieved >= thresholds.c {
        Classification::C
    } else {
        Classification::KhongDat
    }
}

pub fn classify_total(total_score: f64) -> FinalClassification {
    if total_score >= FINAL_A_MIN {
        FinalClassification::A
    } else if total_score >= FINAL_B_MIN {
        FinalClassification::B
    } else if total_score > FINAL_C_ABOVE {
        FinalClassification::C
    } else {
        FinalClassification::D
    }
}

/// Derived fields of one tracking record. Classification is taken before rounding.
pub fn score_tracking(
    item: &ScoringItem,
    checks: &DailyChecks,
    days_in_month: u32,
    default_daily_baseline: f64,
    default_thresholds: &Thresholds,
) -> TrackingScore {
    let baseline = effective_baseline(item, default_daily_baseline);
    let completions = checks.count_checked(days_in_month);

    let (percentage, score) = if baseline > 0.0 {
        let ratio = f64::from(completions) / baseline;
        (ratio * 100.0, ratio * item.item.score)
    } else {
        (0.0, 0.0)
    };

    let thresholds = item.criteria.thresholds.as_ref().unwrap_or(default_thresholds);

    TrackingScore {
        successful_completions: i64::from(completions),
        achievement_percentage: round2(percentage),
        score_achieved: round2(score),
        classification: classify_item(score, thresholds),
    }
}

/// Recomputes item scores and the monthly aggregate of a staff member.
#[derive(Clone)]
pub struct ScoringService {
    db: DbPool,
    settings: Arc<SettingsService>,
}

impl ScoringService {
    pub fn new(db: DbPool, settings: Arc<SettingsService>) -> Self {
        Self { db, settings }
    }

    /// Runs [`recompute_on`](Self::recompute_on) in its own IMMEDIATE transaction.
    pub fn recompute(
        &self,
        item_id: &str,
        staff_id: &str,
        store_id: &str,
        month: u32,
        year: i32,
    ) -> AppResult<Option<ScoreRecomputation>> {
        self.db.with_transaction(|conn| {
            self.recompute_on(conn, item_id, staff_id, store_id, month, year)
        })
    }

    /// Refreshes the tracking record's derived fields, then re-derives the staff aggregate
    /// from every live record of the period. Returns `None` when there is nothing to score.
    pub fn recompute_on(
        &self,
        conn: &Connection,
        item_id: &str,
        staff_id: &str,
        store_id: &str,
        month: u32,
        year: i32,
    ) -> AppResult<Option<ScoreRecomputation>> {
        let month_length = days_in_month(month, year)?;

        let Some(item) = CatalogRepository::find_scoring_item(conn, item_id)? else {
            warn!(target: "app::scoring", %item_id, "recompute skipped: item not in catalog");
            return Ok(None);
        };

        let Some(mut tracking) =
            MonthlyTrackingRepository::find_by_key(conn, item_id, staff_id, month, year)?
        else {
            debug!(
                target: "app::scoring",
                %item_id,
                %staff_id,
                month,
                year,
                "recompute skipped: no tracking record"
            );
            return Ok(None);
        };

        let settings = self.settings.settings();
        let score = score_tracking(
            &item,
            &tracking.daily_checks,
            month_length,
            settings.default_daily_baseline,
            &settings.default_thresholds,
        );

        let now = self.settings.now_rfc3339();
        MonthlyTrackingRepository::update_score(conn, &tracking.id, &score, &now)?;
        tracking.successful_completions = score.successful_completions;
        tracking.achievement_percentage = score.achievement_percentage;
        tracking.score_achieved = score.score_achieved;
        tracking.classification = Some(score.classification);
        tracking.updated_at = now.clone();

        // Stored item scores are already rounded; rounding the sum again only strips float noise.
        let total_score = round2(MonthlyTrackingRepository::sum_scores(
            conn, staff_id, month, year,
        )?);
        let aggregate = EmployeeScoreRepository::upsert(
            conn,
            &EmployeeScoreUpsert {
                staff_id: staff_id.to_string(),
                store_id: store_id.to_string(),
                month,
                year,
                total_score,
                final_classification: classify_total(total_score),
            },
            &now,
        )?;

        info!(
            target: "app::scoring",
            %item_id,
            %staff_id,
            month,
            year,
            score_achieved = score.score_achieved,
            classification = score.classification.as_str(),
            total_score = aggregate.total_score,
            final_classification = aggregate.final_classification.as_str(),
            "scores recomputed"
        );

        Ok(Some(ScoreRecomputation {
            tracking,
            aggregate,
        }))
    }
}
