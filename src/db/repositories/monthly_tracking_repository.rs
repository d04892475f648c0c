use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::monthly::{
    Classification, DailyChecks, MonthlyDayUpsert, MonthlyTrackingRecord, TrackingScore,
};

const RECORD_COLUMNS: &str = r#"
        id,
        item_id,
        staff_id,
        store_id,
        month,
        year,
        daily_checks,
        successful_completions,
        achievement_percentage,
        score_achieved,
        classification,
        notes,
        created_at,
        updated_at
"#;

#[derive(Debug, Clone)]
pub struct MonthlyTrackingRow {
    pub id: String,
    pub item_id: String,
    pub staff_id: String,
    pub store_id: String,
    pub month: u32,
    pub year: i32,
    pub daily_checks: String,
    pub successful_completions: i64,
    pub achievement_percentage: f64,
    pub score_achieved: f64,
    pub classification: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl MonthlyTrackingRow {
    pub fn into_record(self) -> AppResult<MonthlyTrackingRecord> {
        let classification = match self.classification {
            Some(value) => Some(
                Classification::try_from(value.as_str()).map_err(AppError::validation)?,
            ),
            None => None,
        };

        Ok(MonthlyTrackingRecord {
            id: self.id,
            item_id: self.item_id,
            staff_id: self.staff_id,
            store_id: self.store_id,
            month: self.month,
            year: self.year,
            daily_checks: deserialize_checks(&self.daily_checks)?,
            successful_completions: self.successful_completions,
            achievement_percentage: self.achievement_percentage,
            score_achieved: self.score_achieved,
            classification,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl TryFrom<&Row<'_>> for MonthlyTrackingRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            item_id: row.get("item_id")?,
            staff_id: row.get("staff_id")?,
            store_id: row.get("store_id")?,
            month: row.get("month")?,
            year: row.get("year")?,
            daily_checks: row.get("daily_checks")?,
            successful_completions: row.get("successful_completions")?,
            achievement_percentage: row.get("achievement_percentage")?,
            score_achieved: row.get("score_achieved")?,
            classification: row.get("classification")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct MonthlyTrackingRepository;

impl MonthlyTrackingRepository {
    /// Sets one day of the tracker, creating an all-false record first when none exists.
    ///
    /// The day is patched inside SQLite with `json_set`, so concurrent writers touching other
    /// days of the same record cannot overwrite each other. `day` must already be validated.
    pub fn set_day(
        conn: &Connection,
        input: &MonthlyDayUpsert,
        now: &str,
    ) -> AppResult<MonthlyTrackingRecord> {
        let id = uuid::Uuid::new_v4().to_string();
        let initial = DailyChecks::default().with_day(input.day, input.checked);
        let initial = serde_json::to_string(&initial)?;
        let path = format!("$[{}]", input.day.saturating_sub(1));
        let value = if input.checked { "true" } else { "false" };

        let sql = format!(
            r#"
                INSERT INTO monthly_tracking_records (
                    id,
                    item_id,
                    staff_id,
                    store_id,
                    month,
                    year,
                    daily_checks,
                    created_at,
                    updated_at
                ) VALUES (
                    :id,
                    :item_id,
                    :staff_id,
                    :store_id,
                    :month,
                    :year,
                    :daily_checks,
                    :now,
                    :now
                )
                ON CONFLICT(item_id, staff_id, month, year) WHERE is_deleted = 0 DO UPDATE SET
                    daily_checks = json_set(
                        monthly_tracking_records.daily_checks,
                        :path,
                        json(:value)
                    ),
                    updated_at = :now
                RETURNING {RECORD_COLUMNS}
            "#
        );

        let row = conn.query_row(
            &sql,
            named_params! {
                ":id": &id,
                ":item_id": &input.item_id,
                ":staff_id": &input.staff_id,
                ":store_id": &input.store_id,
                ":month": input.month,
                ":year": input.year,
                ":daily_checks": &initial,
                ":path": &path,
                ":value": value,
                ":now": now,
            },
            |row| MonthlyTrackingRow::try_from(row),
        )?;

        row.into_record()
    }

    pub fn find_by_key(
        conn: &Connection,
        item_id: &str,
        staff_id: &str,
        month: u32,
        year: i32,
    ) -> AppResult<Option<MonthlyTrackingRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM monthly_tracking_records
             WHERE item_id = :item_id
               AND staff_id = :staff_id
               AND month = :month
               AND year = :year
               AND is_deleted = 0"
        );
        let mut stmt = conn.prepare(&sql)?;

        let row = stmt
            .query_row(
                named_params! {
                    ":item_id": item_id,
                    ":staff_id": staff_id,
                    ":month": month,
                    ":year": year,
                },
                |row| MonthlyTrackingRow::try_from(row),
            )
            .optional()?;

        row.map(|row| row.into_record()).transpose()
    }

    pub fn list_for_staff_period(
        conn: &Connection,
        staff_id: &str,
        month: u32,
        year: i32,
    ) -> AppResult<Vec<MonthlyTrackingRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM monthly_tracking_records
             WHERE staff_id = :staff_id
               AND month = :month
               AND year = :year
               AND is_deleted = 0"
        );
        let mut stmt = conn.prepare(&sql)?;

        let records = stmt
            .query_map(
                named_params! {
                    ":staff_id": staff_id,
                    ":month": month,
                    ":year": year,
                },
                |row| MonthlyTrackingRow::try_from(row),
            )?
            .map(|row| {
                row.map_err(AppError::from)
                    .and_then(|row| row.into_record())
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(records)
    }

    pub fn update_score(
        conn: &Connection,
        id: &str,
        score: &TrackingScore,
        now: &str,
    ) -> AppResult<()> {
        let affected = conn.execute(
            r#"
                UPDATE monthly_tracking_records SET
                    successful_completions = :successful_completions,
                    achievement_percentage = :achievement_percentage,
                    score_achieved = :score_achieved,
                    classification = :classification,
                    updated_at = :now
                WHERE id = :id
            "#,
            named_params! {
                ":id": id,
                ":successful_completions": score.successful_completions,
                ":achievement_percentage": score.achievement_percentage,
                ":score_achieved": score.score_achieved,
                ":classification": score.classification.as_str(),
                ":now": now,
            },
        )?;

        if affected == 0 {
            return Err(AppError::not_found());
        }

        Ok(())
    }

    /// Sum of `score_achieved` over every live record of the staff member for the period.
    pub fn sum_scores(conn: &Connection, staff_id: &str, month: u32, year: i32) -> AppResult<f64> {
        let total: f64 = conn.query_row(
            r#"
                SELECT COALESCE(SUM(score_achieved), 0.0)
                FROM monthly_tracking_records
                WHERE staff_id = :staff_id
                  AND month = :month
                  AND year = :year
                  AND is_deleted = 0
            "#,
            named_params! {
                ":staff_id": staff_id,
                ":month": month,
                ":year": year,
            },
            |row| row.get(0),
        )?;

        Ok(total)
    }
}

fn deserialize_checks(raw: &str) -> AppResult<DailyChecks> {
    let values: Vec<bool> = serde_json::from_str(raw)?;
    Ok(DailyChecks::from_lenient(&values))
}
