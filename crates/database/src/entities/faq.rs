//! FAQ entity definitions

use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use crate::types::CategoryCount;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Faq {
    #[serde(skip_serializing)]
    pub id: i64,
    #[serde(rename = "id")]
    pub public_id: String,
    pub question: String,
    pub answer: String,
    pub category: String,
    pub tags: Vec<String>,
    pub alternative_questions: Vec<String>,
    pub keywords: Vec<String>,
    pub priority: i64,
    pub is_active: bool,
    pub is_public: bool,
    #[serde(skip_serializing)]
    pub created_by: i64,
    #[serde(rename = "createdBy")]
    pub created_by_public_id: String,
    #[serde(rename = "updatedBy")]
    pub updated_by_public_id: Option<String>,
    pub view_count: i64,
    pub useful_count: i64,
    pub not_useful_count: i64,
    pub last_used_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

fn json_list(row: &SqliteRow, column: &str) -> Result<Vec<String>, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    serde_json::from_str(&raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

impl<'r> FromRow<'r, SqliteRow> for Faq {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            public_id: row.try_get("public_id")?,
            question: row.try_get("question")?,
            answer: row.try_get("answer")?,
            category: row.try_get("category")?,
            tags: json_list(row, "tags")?,
            alternative_questions: json_list(row, "alternative_questions")?,
            keywords: json_list(row, "keywords")?,
            priority: row.try_get("priority")?,
            is_active: row.try_get("is_active")?,
            is_public: row.try_get("is_public")?,
            created_by: row.try_get("created_by")?,
            created_by_public_id: row.try_get("created_by_public_id")?,
            updated_by_public_id: row.try_get("updated_by_public_id")?,
            view_count: row.try_get("view_count")?,
            useful_count: row.try_get("useful_count")?,
            not_useful_count: row.try_get("not_useful_count")?,
            last_used_at: row.try_get("last_used_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Public listing projection: no counters or authorship.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicFaq {
    #[serde(rename = "id")]
    pub public_id: String,
    pub question: String,
    pub answer: String,
    pub category: String,
    pub tags: Vec<String>,
}

impl<'r> FromRow<'r, SqliteRow> for PublicFaq {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            public_id: row.try_get("public_id")?,
            question: row.try_get("question")?,
            answer: row.try_get("answer")?,
            category: row.try_get("category")?,
            tags: json_list(row, "tags")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CreateFaqRequest {
    pub question: String,
    pub answer: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub keywords: Vec<String>,
    pub alternative_questions: Vec<String>,
    pub priority: i64,
    pub is_public: bool,
    pub created_by: i64,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateFaqRequest {
    pub question: Option<String>,
    pub answer: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub keywords: Option<Vec<String>>,
    pub alternative_questions: Option<Vec<String>>,
    pub priority: Option<i64>,
    pub is_active: Option<bool>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct FaqFilter {
    pub category: Option<String>,
    pub search: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FaqViews {
    #[serde(rename = "id")]
    pub public_id: String,
    pub question: String,
    pub view_count: i64,
    pub useful_count: i64,
    pub not_useful_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FaqFeedbackStats {
    pub total_views: i64,
    pub total_useful: i64,
    pub total_not_useful: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaqAnalytics {
    #[serde(rename = "totalFAQs")]
    pub total_faqs: i64,
    #[serde(rename = "publicFAQs")]
    pub public_faqs: i64,
    #[serde(rename = "faqsByCategory")]
    pub faqs_by_category: Vec<CategoryCount>,
    #[serde(rename = "topViewedFAQs")]
    pub top_viewed_faqs: Vec<FaqViews>,
    pub feedback_stats: FaqFeedbackStats,
}
