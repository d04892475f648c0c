use serde::{Deserialize, Serialize};

/// Outcome of one deadline sweep.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub invalidated_count: usize,
    pub cascaded_count: usize,
    /// Approval ids whose monthly cascade failed. They stay flagged and are picked up again
    /// by the next sweep.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_records: Vec<String>,
    /// Set when another sweep was already in flight and this call did nothing.
    #[serde(default)]
    pub skipped: bool,
}

impl SweepReport {
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}
