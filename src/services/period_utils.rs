use chrono::{Datelike, Duration, NaiveDate};
use serde_json::json;

use crate::error::{AppError, AppResult};

pub const MIN_YEAR: i32 = 2000;
pub const MAX_YEAR: i32 = 2100;

pub fn parse_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|err| {
        AppError::validation_with_details(
            "invalid date, expected YYYY-MM-DD",
            json!({"value": value, "error": err.to_string()}),
        )
    })
}

pub fn parse_optional_date(value: Option<&str>) -> AppResult<Option<NaiveDate>> {
    match value.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => Ok(Some(parse_date(raw)?)),
        None => Ok(None),
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn add_days(date: NaiveDate, days: i64) -> AppResult<NaiveDate> {
    date.checked_add_signed(Duration::days(days))
        .ok_or_else(|| AppError::validation("date arithmetic out of range"))
}

pub fn ensure_period(month: u32, year: i32) -> AppResult<()> {
    if !(1..=12).contains(&month) {
        return Err(AppError::validation_with_details(
            "month must be between 1 and 12",
            json!({"month": month}),
        ));
    }
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(AppError::validation_with_details(
            format!("year must be between {MIN_YEAR} and {MAX_YEAR}"),
            json!({"year": year}),
        ));
    }
    Ok(())
}

/// Calendar length of a month, leap years included.
pub fn days_in_month(month: u32, year: i32) -> AppResult<u32> {
    ensure_period(month, year)?;
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::validation("invalid month"))?;
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let next = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .ok_or_else(|| AppError::validation("invalid month"))?;
    Ok(next.signed_duration_since(first).num_days() as u32)
}

pub fn ensure_day(day: u32, month: u32, year: i32) -> AppResult<()> {
    let limit = days_in_month(month, year)?;
    if day == 0 || day > limit {
        return Err(AppError::validation_with_details(
            format!("day must be between 1 and {limit} for {year}-{month:02}"),
            json!({"day": day, "month": month, "year": year}),
        ));
    }
    Ok(())
}

/// (month, year, day) of a date.
pub fn period_of(date: NaiveDate) -> (u32, i32, u32) {
    (date.month(), date.year(), date.day())
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
