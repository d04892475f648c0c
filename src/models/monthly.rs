use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::catalog::{ChecklistItem, DetailCategory};

pub const TRACKING_SLOTS: usize = 31;

/// One flag per calendar day, index `d` standing for day `d + 1`.
/// Slots past the month's length are padding and never counted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct DailyChecks([bool; TRACKING_SLOTS]);

impl Default for DailyChecks {
    fn default() -> Self {
        Self([false; TRACKING_SLOTS])
    }
}

impl DailyChecks {
    pub fn from_slots(slots: [bool; TRACKING_SLOTS]) -> Self {
        Self(slots)
    }

    /// Accepts stored sequences of any length, padding or truncating to 31 slots.
    pub fn from_lenient(values: &[bool]) -> Self {
        let mut slots = [false; TRACKING_SLOTS];
        for (slot, value) in slots.iter_mut().zip(values.iter()) {
            *slot = *value;
        }
        Self(slots)
    }

    /// Copy with the 1-based `day` set. Callers validate the day against the month first.
    pub fn with_day(mut self, day: u32, checked: bool) -> Self {
        if let Some(slot) = (day as usize)
            .checked_sub(1)
            .and_then(|index| self.0.get_mut(index))
        {
            *slot = checked;
        }
        self
    }

    pub fn is_checked(&self, day: u32) -> bool {
        (day as usize)
            .checked_sub(1)
            .and_then(|index| self.0.get(index))
            .copied()
            .unwrap_or(false)
    }

    /// Number of checked days within the first `days_in_month` slots.
    pub fn count_checked(&self, days_in_month: u32) -> u32 {
        let limit = (days_in_month as usize).min(TRACKING_SLOTS);
        self.0[..limit].iter().filter(|checked| **checked).count() as u32
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }
}

/// Per-item outcome of a month. `KhongDat` means the item was not met.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Classification {
    A,
    B,
    C,
    #[serde(rename = "KHONG_DAT")]
    KhongDat,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::A => "A",
            Classification::B => "B",
            Classification::C => "C",
            Classification::KhongDat => "KHONG_DAT",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Classification {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "A" => Ok(Classification::A),
            "B" => Ok(Classification::B),
            "C" => Ok(Classification::C),
            "KHONG_DAT" => Ok(Classification::KhongDat),
            other => Err(format!("unsupported classification: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTrackingRecord {
    pub id: String,
    pub item_id: String,
    pub staff_id: String,
    pub store_id: String,
    pub month: u32,
    pub year: i32,
    pub daily_checks: DailyChecks,
    pub successful_completions: i64,
    pub achievement_percentage: f64,
    pub score_achieved: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct MonthlyDayUpsert {
    pub item_id: String,
    pub staff_id: String,
    pub store_id: String,
    pub month: u32,
    pub year: i32,
    pub day: u32,
    pub checked: bool,
}

/// Derived fields written back by the scoring engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackingScore {
    pub successful_completions: i64,
    pub achievement_percentage: f64,
    pub score_achieved: f64,
    pub classification: Classification,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyDayInput {
    pub item_id: String,
    #[serde(default)]
    pub staff_id: Option<String>,
    #[serde(default)]
    pub store_id: Option<String>,
    pub month: u32,
    pub year: i32,
    pub day: u32,
    pub checked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyDayResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<MonthlyTrackingRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailItemView {
    pub item: ChecklistItem,
    pub category: DetailCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<MonthlyTrackingRecord>,
}
