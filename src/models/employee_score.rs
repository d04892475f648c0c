use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::monthly::MonthlyTrackingRecord;

/// Overall grade of a staff member for one month.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FinalClassification {
    A,
    B,
    C,
    D,
}

impl FinalClassification {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinalClassification::A => "A",
            FinalClassification::B => "B",
            FinalClassification::C => "C",
            FinalClassification::D => "D",
        }
    }
}

impl fmt::Display for FinalClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for FinalClassification {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "A" => Ok(FinalClassification::A),
            "B" => Ok(FinalClassification::B),
            "C" => Ok(FinalClassification::C),
            "D" => Ok(FinalClassification::D),
            other => Err(format!("unsupported final classification: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeMonthlyScore {
    pub id: String,
    pub staff_id: String,
    pub store_id: String,
    pub month: u32,
    pub year: i32,
    pub total_score: f64,
    pub final_classification: FinalClassification,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct EmployeeScoreUpsert {
    pub staff_id: String,
    pub store_id: String,
    pub month: u32,
    pub year: i32,
    pub total_score: f64,
    pub final_classification: FinalClassification,
}

/// What one recompute wrote: the refreshed tracking record and the staff aggregate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecomputation {
    pub tracking: MonthlyTrackingRecord,
    pub aggregate: EmployeeMonthlyScore,
}
