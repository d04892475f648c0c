use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::catalog::{
    CategoryInsert, CategoryType, ChecklistItem, ClassificationCriteria, DetailCategory,
    ItemInsert, ItemOwner, ScoringItem,
};

const ITEM_COLUMNS: &str = r#"
        i.id AS item_id,
        i.item_number,
        i.name AS item_name,
        i.score,
        i.baseline,
        i.category_id AS item_category_id,
        i.owner,
        i.task_type,
        i.sort_order AS item_sort_order,
        i.notes
"#;

const CATEGORY_COLUMNS: &str = r#"
        c.id AS category_id,
        c.name AS category_name,
        c.category_type,
        c.description,
        c.classification_criteria,
        c.sort_order AS category_sort_order
"#;

#[derive(Debug, Clone)]
pub struct ItemRow {
    pub id: String,
    pub item_number: Option<String>,
    pub name: String,
    pub score: f64,
    pub baseline: Option<f64>,
    pub category_id: String,
    pub owner: String,
    pub task_type: Option<String>,
    pub sort_order: i64,
    pub notes: Option<String>,
}

impl ItemRow {
    pub fn into_record(self) -> AppResult<ChecklistItem> {
        let owner = ItemOwner::try_from(self.owner.as_str()).map_err(AppError::validation)?;
        Ok(ChecklistItem {
            id: self.id,
            item_number: self.item_number,
            name: self.name,
            score: self.score,
            baseline: self.baseline,
            category_id: self.category_id,
            owner,
            task_type: self.task_type,
            sort_order: self.sort_order,
            notes: self.notes,
        })
    }
}

impl TryFrom<&Row<'_>> for ItemRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("item_id")?,
            item_number: row.get("item_number")?,
            name: row.get("item_name")?,
            score: row.get("score")?,
            baseline: row.get("baseline")?,
            category_id: row.get("item_category_id")?,
            owner: row.get("owner")?,
            task_type: row.get("task_type")?,
            sort_order: row.get("item_sort_order")?,
            notes: row.get("notes")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CategoryRow {
    pub id: String,
    pub name: String,
    pub category_type: String,
    pub description: Option<String>,
    pub classification_criteria: String,
    pub sort_order: i64,
}

impl CategoryRow {
    pub fn into_record(self) -> AppResult<DetailCategory> {
        let category_type =
            CategoryType::try_from(self.category_type.as_str()).map_err(AppError::validation)?;
        Ok(DetailCategory {
            id: self.id,
            name: self.name,
            category_type,
            description: self.description,
            classification_criteria: deserialize_criteria(&self.classification_criteria)?,
            sort_order: self.sort_order,
        })
    }
}

impl TryFrom<&Row<'_>> for CategoryRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("category_id")?,
            name: row.get("category_name")?,
            category_type: row.get("category_type")?,
            description: row.get("description")?,
            classification_criteria: row.get("classification_criteria")?,
            sort_order: row.get("category_sort_order")?,
        })
    }
}

pub struct CatalogRepository;

impl CatalogRepository {
    pub fn insert_category(conn: &Connection, input: &CategoryInsert) -> AppResult<DetailCategory> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let criteria = serde_json::to_string(&input.classification_criteria)?;

        conn.execute(
            r#"
                INSERT INTO detail_categories (
                    id,
                    name,
                    category_type,
                    description,
                    classification_criteria,
                    sort_order,
                    created_at,
                    updated_at
                ) VALUES (
                    :id,
                    :name,
                    :category_type,
                    :description,
                    :classification_criteria,
                    :sort_order,
                    :now,
                    :now
                )
            "#,
            named_params! {
                ":id": &id,
                ":name": input.name.trim(),
                ":category_type": input.category_type.as_str(),
                ":description": &input.description,
                ":classification_criteria": &criteria,
                ":sort_order": input.sort_order,
                ":now": &now,
            },
        )?;

        Ok(DetailCategory {
            id,
            name: input.name.trim().to_string(),
            category_type: input.category_type,
            description: input.description.clone(),
            classification_criteria: input.classification_criteria.clone(),
            sort_order: input.sort_order,
        })
    }

    pub fn insert_item(conn: &Connection, input: &ItemInsert) -> AppResult<ChecklistItem> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        conn.execute(
            r#"
                INSERT INTO checklist_items (
                    id,
                    item_number,
                    name,
                    score,
                    baseline,
                    category_id,
                    owner,
                    task_type,
                    sort_order,
                    notes,
                    created_at,
                    updated_at
                ) VALUES (
                    :id,
                    :item_number,
                    :name,
                    :score,
                    :baseline,
                    :category_id,
                    :owner,
                    :task_type,
                    :sort_order,
                    :notes,
                    :now,
                    :now
                )
            "#,
            named_params! {
                ":id": &id,
                ":item_number": &input.item_number,
                ":name": input.name.trim(),
                ":score": input.score,
                ":baseline": input.baseline,
                ":category_id": &input.category_id,
                ":owner": input.owner.as_str(),
                ":task_type": &input.task_type,
                ":sort_order": input.sort_order,
                ":notes": &input.notes,
                ":now": &now,
            },
        )?;

        Ok(ChecklistItem {
            id,
            item_number: input.item_number.clone(),
            name: input.name.trim().to_string(),
            score: input.score,
            baseline: input.baseline,
            category_id: input.category_id.clone(),
            owner: input.owner,
            task_type: input.task_type.clone(),
            sort_order: input.sort_order,
            notes: input.notes.clone(),
        })
    }

    /// Item plus the category fields the scoring engine reads.
    pub fn find_scoring_item(conn: &Connection, item_id: &str) -> AppResult<Option<ScoringItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS}, {CATEGORY_COLUMNS}
             FROM checklist_items i
             JOIN detail_categories c ON c.id = i.category_id
             WHERE i.id = :item_id AND i.is_deleted = 0"
        );
        let mut stmt = conn.prepare(&sql)?;

        let row = stmt
            .query_row(named_params! {":item_id": item_id}, |row| {
                Ok((ItemRow::try_from(row)?, CategoryRow::try_from(row)?))
            })
            .optional()?;

        row.map(|(item, category)| {
            let category = category.into_record()?;
            Ok(ScoringItem {
                item: item.into_record()?,
                category_type: category.category_type,
                criteria: category.classification_criteria,
            })
        })
        .transpose()
    }

    pub fn item_exists(conn: &Connection, item_id: &str) -> AppResult<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM checklist_items WHERE id = :item_id AND is_deleted = 0",
            named_params! {":item_id": item_id},
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Items ordered by category order, then item order, then item number.
    pub fn list_items_with_categories(
        conn: &Connection,
    ) -> AppResult<Vec<(ChecklistItem, DetailCategory)>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS}, {CATEGORY_COLUMNS}
             FROM checklist_items i
             JOIN detail_categories c ON c.id = i.category_id
             WHERE i.is_deleted = 0 AND c.is_deleted = 0
             ORDER BY c.sort_order, i.sort_order, i.item_number"
        );
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt
            .query_map([], |row| {
                Ok((ItemRow::try_from(row)?, CategoryRow::try_from(row)?))
            })?
            .map(|row| {
                row.map_err(AppError::from).and_then(|(item, category)| {
                    Ok((item.into_record()?, category.into_record()?))
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(rows)
    }

    pub fn list_categories(conn: &Connection) -> AppResult<Vec<DetailCategory>> {
        let sql = format!(
            "SELECT {CATEGORY_COLUMNS}
             FROM detail_categories c
             WHERE c.is_deleted = 0
             ORDER BY c.sort_order, c.name"
        );
        let mut stmt = conn.prepare(&sql)?;

        let categories = stmt
            .query_map([], |row| CategoryRow::try_from(row))?
            .map(|row| {
                row.map_err(AppError::from)
                    .and_then(|row| row.into_record())
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(categories)
    }
}

fn deserialize_criteria(raw: &str) -> AppResult<ClassificationCriteria> {
    if raw.trim().is_empty() {
        return Ok(ClassificationCriteria::default());
    }
    serde_json::from_str(raw).map_err(AppError::from)
}
