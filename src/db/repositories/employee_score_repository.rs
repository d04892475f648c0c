use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::employee_score::{
    EmployeeMonthlyScore, EmployeeScoreUpsert, FinalClassification,
};

#[derive(Debug, Clone)]
pub struct EmployeeScoreRow {
    pub id: String,
    pub staff_id: String,
    pub store_id: String,
    pub month: u32,
    pub year: i32,
    pub total_score: f64,
    pub final_classification: String,
    pub created_at: String,
    pub updated_at: String,
}

impl EmployeeScoreRow {
    pub fn into_record(self) -> AppResult<EmployeeMonthlyScore> {
        let final_classification = FinalClassification::try_from(
            self.final_classification.as_str(),
        )
        .map_err(AppError::validation)?;

        Ok(EmployeeMonthlyScore {
            id: self.id,
            staff_id: self.staff_id,
            store_id: self.store_id,
            month: self.month,
            year: self.year,
            total_score: self.total_score,
            final_classification,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl TryFrom<&Row<'_>> for EmployeeScoreRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            staff_id: row.get("staff_id")?,
            store_id: row.get("store_id")?,
            month: row.get("month")?,
            year: row.get("year")?,
            total_score: row.get("total_score")?,
            final_classification: row.get("final_classification")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct EmployeeScoreRepository;

impl EmployeeScoreRepository {
    pub fn upsert(
        conn: &Connection,
        input: &EmployeeScoreUpsert,
        now: &str,
    ) -> AppResult<EmployeeMonthlyScore> {
        let id = uuid::Uuid::new_v4().to_string();

        let row = conn.query_row(
            r#"
                INSERT INTO employee_monthly_scores (
                    id,
                    staff_id,
                    store_id,
                    month,
                    year,
                    total_score,
                    final_classification,
                    created_at,
                    updated_at
                ) VALUES (
                    :id,
                    :staff_id,
                    :store_id,
                    :month,
                    :year,
                    :total_score,
                    :final_classification,
                    :now,
                    :now
                )
                ON CONFLICT(staff_id, month, year) WHERE is_deleted = 0 DO UPDATE SET
                    total_score = excluded.total_score,
                    final_classification = excluded.final_classification,
                    updated_at = excluded.updated_at
                RETURNING
                    id,
                    staff_id,
                    store_id,
                    month,
                    year,
                    total_score,
                    final_classification,
                    created_at,
                    updated_at
            "#,
            named_params! {
                ":id": &id,
                ":staff_id": &input.staff_id,
                ":store_id": &input.store_id,
                ":month": input.month,
                ":year": input.year,
                ":total_score": input.total_score,
                ":final_classification": input.final_classification.as_str(),
                ":now": now,
            },
            |row| EmployeeScoreRow::try_from(row),
        )?;

        row.into_record()
    }

    pub fn find_by_period(
        conn: &Connection,
        staff_id: &str,
        month: u32,
        year: i32,
    ) -> AppResult<Option<EmployeeMonthlyScore>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT
                    id,
                    staff_id,
                    store_id,
                    month,
                    year,
                    total_score,
                    final_classification,
                    created_at,
                    updated_at
                FROM employee_monthly_scores
                WHERE staff_id = :staff_id
                  AND month = :month
                  AND year = :year
                  AND is_deleted = 0
            "#,
        )?;

        let row = stmt
            .query_row(
                named_params! {
                    ":staff_id": staff_id,
                    ":month": month,
                    ":year": year,
                },
                |row| EmployeeScoreRow::try_from(row),
            )
            .optional()?;

        row.map(|row| row.into_record()).transpose()
    }
}
