use std::convert::TryFrom;

use chrono::NaiveDate;
use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::approval::{ApprovalRecord, ApprovalUpsert, LockedApproval};

const RECORD_COLUMNS: &str = r#"
        id,
        item_id,
        staff_id,
        store_id,
        assessment_date,
        employee_checked,
        employee_checked_at,
        cht_checked,
        cht_checked_at,
        asm_checked,
        asm_checked_at,
        deadline_date,
        is_locked,
        locked_at,
        created_at,
        updated_at
"#;

#[derive(Debug, Clone)]
pub struct ApprovalRow {
    pub id: String,
    pub item_id: String,
    pub staff_id: String,
    pub store_id: String,
    pub assessment_date: String,
    pub employee_checked: bool,
    pub employee_checked_at: Option<String>,
    pub cht_checked: bool,
    pub cht_checked_at: Option<String>,
    pub asm_checked: bool,
    pub asm_checked_at: Option<String>,
    pub deadline_date: Option<String>,
    pub is_locked: bool,
    pub locked_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ApprovalRow {
    pub fn into_record(self) -> AppResult<ApprovalRecord> {
        let assessment_date = parse_stored_date(&self.assessment_date)?;
        // Rows without a stored deadline count as due on their assessment date.
        let deadline_date = match self.deadline_date.as_deref() {
            Some(raw) => parse_stored_date(raw)?,
            None => assessment_date,
        };

        Ok(ApprovalRecord {
            id: self.id,
            item_id: self.item_id,
            staff_id: self.staff_id,
            store_id: self.store_id,
            assessment_date,
            employee_checked: self.employee_checked,
            employee_checked_at: self.employee_checked_at,
            cht_checked: self.cht_checked,
            cht_checked_at: self.cht_checked_at,
            asm_checked: self.asm_checked,
            asm_checked_at: self.asm_checked_at,
            deadline_date,
            is_locked: self.is_locked,
            locked_at: self.locked_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl TryFrom<&Row<'_>> for ApprovalRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            item_id: row.get("item_id")?,
            staff_id: row.get("staff_id")?,
            store_id: row.get("store_id")?,
            assessment_date: row.get("assessment_date")?,
            employee_checked: row.get("employee_checked")?,
            employee_checked_at: row.get("employee_checked_at")?,
            cht_checked: row.get("cht_checked")?,
            cht_checked_at: row.get("cht_checked_at")?,
            asm_checked: row.get("asm_checked")?,
            asm_checked_at: row.get("asm_checked_at")?,
            deadline_date: row.get("deadline_date")?,
            is_locked: row.get("is_locked")?,
            locked_at: row.get("locked_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct ApprovalRepository;

impl ApprovalRepository {
    /// Insert-or-update keyed on (item, staff, date) in one statement.
    ///
    /// Only columns present in `input.columns` change. A `checked_at` stamp is written when a
    /// column moves to true, `deadline_date` is kept once set, and `is_locked` is never touched.
    pub fn upsert(
        conn: &Connection,
        input: &ApprovalUpsert,
        deadline_date: NaiveDate,
        now: &str,
    ) -> AppResult<ApprovalRecord> {
        let id = uuid::Uuid::new_v4().to_string();
        let sql = format!(
            r#"
                INSERT INTO approval_records (
                    id,
                    item_id,
                    staff_id,
                    store_id,
                    assessment_date,
                    employee_checked,
                    employee_checked_at,
                    cht_checked,
                    cht_checked_at,
                    asm_checked,
                    asm_checked_at,
                    deadline_date,
                    is_locked,
                    created_at,
                    updated_at
                ) VALUES (
                    :id,
                    :item_id,
                    :staff_id,
                    :store_id,
                    :assessment_date,
                    COALESCE(:employee_checked, 0),
                    CASE WHEN :employee_checked = 1 THEN :now END,
                    COALESCE(:cht_checked, 0),
                    CASE WHEN :cht_checked = 1 THEN :now END,
                    COALESCE(:asm_checked, 0),
                    CASE WHEN :asm_checked = 1 THEN :now END,
                    :deadline_date,
                    0,
                    :now,
                    :now
                )
                ON CONFLICT(item_id, staff_id, assessment_date) WHERE is_deleted = 0 DO UPDATE SET
                    employee_checked = COALESCE(:employee_checked, approval_records.employee_checked),
                    employee_checked_at = CASE
                        WHEN :employee_checked = 1 AND approval_records.employee_checked = 0 THEN :now
                        ELSE approval_records.employee_checked_at
                    END,
                    cht_checked = COALESCE(:cht_checked, approval_records.cht_checked),
                    cht_checked_at = CASE
                        WHEN :cht_checked = 1 AND approval_records.cht_checked = 0 THEN :now
                        ELSE approval_records.cht_checked_at
                    END,
                    asm_checked = COALESCE(:asm_checked, approval_records.asm_checked),
                    asm_checked_at = CASE
                        WHEN :asm_checked = 1 AND approval_records.asm_checked = 0 THEN :now
                        ELSE approval_records.asm_checked_at
                    END,
                    deadline_date = COALESCE(approval_records.deadline_date, excluded.deadline_date),
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
                ":assessment_date": format_stored_date(input.assessment_date),
                ":employee_checked": input.columns.employee_checked,
                ":cht_checked": input.columns.cht_checked,
                ":asm_checked": input.columns.asm_checked,
                ":deadline_date": format_stored_date(deadline_date),
                ":now": now,
            },
            |row| ApprovalRow::try_from(row),
        )?;

        row.into_record()
    }

    pub fn find_by_key(
        conn: &Connection,
        item_id: &str,
        staff_id: &str,
        assessment_date: NaiveDate,
    ) -> AppResult<Option<ApprovalRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM approval_records
             WHERE item_id = :item_id
               AND staff_id = :staff_id
               AND assessment_date = :assessment_date
               AND is_deleted = 0"
        );
        let mut stmt = conn.prepare(&sql)?;

        let row = stmt
            .query_row(
                named_params! {
                    ":item_id": item_id,
                    ":staff_id": staff_id,
                    ":assessment_date": format_stored_date(assessment_date),
                },
                |row| ApprovalRow::try_from(row),
            )
            .optional()?;

        row.map(|row| row.into_record()).transpose()
    }

    pub fn list_for_staff_on(
        conn: &Connection,
        staff_id: &str,
        assessment_date: NaiveDate,
    ) -> AppResult<Vec<ApprovalRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM approval_records
             WHERE staff_id = :staff_id
               AND assessment_date = :assessment_date
               AND is_deleted = 0"
        );
        let mut stmt = conn.prepare(&sql)?;

        let records = stmt
            .query_map(
                named_params! {
                    ":staff_id": staff_id,
                    ":assessment_date": format_stored_date(assessment_date),
                },
                |row| ApprovalRow::try_from(row),
            )?
            .map(|row| {
                row.map_err(AppError::from)
                    .and_then(|row| row.into_record())
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(records)
    }

    /// Most recent record per item for one staff member.
    pub fn list_latest_for_staff(
        conn: &Connection,
        staff_id: &str,
    ) -> AppResult<Vec<ApprovalRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM approval_records AS a
             WHERE a.staff_id = :staff_id
               AND a.is_deleted = 0
               AND a.assessment_date = (
                   SELECT MAX(b.assessment_date) FROM approval_records AS b
                   WHERE b.item_id = a.item_id
                     AND b.staff_id = a.staff_id
                     AND b.is_deleted = 0
               )"
        );
        let mut stmt = conn.prepare(&sql)?;

        let records = stmt
            .query_map(named_params! {":staff_id": staff_id}, |row| {
                ApprovalRow::try_from(row)
            })?
            .map(|row| {
                row.map_err(AppError::from)
                    .and_then(|row| row.into_record())
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(records)
    }

    pub fn list_assessment_dates(conn: &Connection, staff_id: &str) -> AppResult<Vec<NaiveDate>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT DISTINCT assessment_date
                FROM approval_records
                WHERE staff_id = :staff_id AND is_deleted = 0
                ORDER BY assessment_date DESC
            "#,
        )?;

        let dates = stmt
            .query_map(named_params! {":staff_id": staff_id}, |row| {
                row.get::<_, String>(0)
            })?
            .map(|raw| {
                raw.map_err(AppError::from)
                    .and_then(|raw| parse_stored_date(&raw))
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(dates)
    }

    /// Un-approves and locks every self-report whose countersign deadline passed before `today`.
    ///
    /// Records already countersigned or already locked never match, so re-running is a no-op.
    /// Locked rows are flagged `cascade_pending` until their monthly cascade succeeds.
    pub fn lock_overdue(
        conn: &Connection,
        today: NaiveDate,
        now: &str,
    ) -> AppResult<Vec<LockedApproval>> {
        let mut stmt = conn.prepare(
            r#"
                UPDATE approval_records SET
                    employee_checked = 0,
                    is_locked = 1,
                    locked_at = :now,
                    updated_at = :now,
                    cascade_pending = 1
                WHERE is_deleted = 0
                  AND deadline_date < :today
                  AND employee_checked = 1
                  AND cht_checked = 0
                  AND is_locked = 0
                RETURNING id, item_id, staff_id, store_id, assessment_date
            "#,
        )?;

        let locked = stmt
            .query_map(
                named_params! {
                    ":today": format_stored_date(today),
                    ":now": now,
                },
                locked_from_row,
            )?
            .map(|row| row.map_err(AppError::from).and_then(|row| row.into_locked()))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(locked)
    }

    /// Locked records whose monthly cascade has not been applied yet.
    pub fn list_cascade_pending(conn: &Connection) -> AppResult<Vec<LockedApproval>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT id, item_id, staff_id, store_id, assessment_date
                FROM approval_records
                WHERE cascade_pending = 1 AND is_deleted = 0
                ORDER BY assessment_date, id
            "#,
        )?;

        let pending = stmt
            .query_map([], locked_from_row)?
            .map(|row| row.map_err(AppError::from).and_then(|row| row.into_locked()))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(pending)
    }

    pub fn clear_cascade_pending(conn: &Connection, id: &str) -> AppResult<()> {
        conn.execute(
            "UPDATE approval_records SET cascade_pending = 0 WHERE id = :id",
            named_params! {":id": id},
        )?;
        Ok(())
    }
}

struct LockedRow {
    id: String,
    item_id: String,
    staff_id: String,
    store_id: String,
    assessment_date: String,
}

impl LockedRow {
    fn into_locked(self) -> AppResult<LockedApproval> {
        Ok(LockedApproval {
            assessment_date: parse_stored_date(&self.assessment_date)?,
            id: self.id,
            item_id: self.item_id,
            staff_id: self.staff_id,
            store_id: self.store_id,
        })
    }
}

fn locked_from_row(row: &Row<'_>) -> Result<LockedRow, rusqlite::Error> {
    Ok(LockedRow {
        id: row.get("id")?,
        item_id: row.get("item_id")?,
        staff_id: row.get("staff_id")?,
        store_id: row.get("store_id")?,
        assessment_date: row.get("assessment_date")?,
    })
}

fn format_stored_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_stored_date(raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|err| AppError::database(format!("corrupt stored date {raw}: {err}")))
}
