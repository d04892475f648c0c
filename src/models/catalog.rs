use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CategoryType {
    Daily,
    Weekly,
    Monthly,
}

impl CategoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryType::Daily => "daily",
            CategoryType::Weekly => "weekly",
            CategoryType::Monthly => "monthly",
        }
    }
}

impl fmt::Display for CategoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for CategoryType {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "daily" => Ok(CategoryType::Daily),
            "weekly" => Ok(CategoryType::Weekly),
            "monthly" => Ok(CategoryType::Monthly),
            other => Err(format!("unsupported category type: {other}")),
        }
    }
}

/// Which tier an item is evaluated for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ItemOwner {
    Employee,
    Cht,
}

impl ItemOwner {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemOwner::Employee => "employee",
            ItemOwner::Cht => "cht",
        }
    }
}

impl TryFrom<&str> for ItemOwner {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "employee" => Ok(ItemOwner::Employee),
            "cht" => Ok(ItemOwner::Cht),
            other => Err(format!("unsupported item owner: {other}")),
        }
    }
}

/// Score cut-points for the per-item classification, compared high to low.
/// Cut-points missing from stored criteria keep their default.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Thresholds {
    #[serde(rename = "A")]
    pub a: f64,
    #[serde(rename = "B")]
    pub b: f64,
    #[serde(rename = "C")]
    pub c: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            a: 8.0,
            b: 5.0,
            c: 3.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<Thresholds>,
    /// Expected occurrences per month for daily items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetailCategory {
    pub id: String,
    pub name: String,
    pub category_type: CategoryType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub classification_criteria: ClassificationCriteria,
    pub sort_order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_number: Option<String>,
    pub name: String,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline: Option<f64>,
    pub category_id: String,
    pub owner: ItemOwner,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    pub sort_order: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// An item joined with the category fields the scoring engine needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoringItem {
    pub item: ChecklistItem,
    pub category_type: CategoryType,
    pub criteria: ClassificationCriteria,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInsert {
    pub name: String,
    pub category_type: CategoryType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub classification_criteria: ClassificationCriteria,
    #[serde(default)]
    pub sort_order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemInsert {
    #[serde(default)]
    pub item_number: Option<String>,
    pub name: String,
    pub score: f64,
    #[serde(default)]
    pub baseline: Option<f64>,
    pub category_id: String,
    pub owner: ItemOwner,
    #[serde(default)]
    pub task_type: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub notes: Option<String>,
}
