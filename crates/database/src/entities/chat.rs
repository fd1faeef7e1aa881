//! Chat entity definitions

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use crate::types::DailyCount;

pub const DEFAULT_CHAT_TITLE: &str = "New Conversation";

/// A support conversation owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    #[serde(skip_serializing)]
    pub id: i64,
    #[serde(rename = "id")]
    pub public_id: String,
    #[serde(skip_serializing)]
    pub user_id: i64,
    /// Owner's public id, exposed as `userId`.
    #[serde(rename = "userId")]
    pub user_public_id: String,
    pub title: String,
    pub status: ChatStatus,
    pub message_count: i64,
    pub last_message_at: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatOwner {
    #[serde(rename = "id")]
    pub public_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Chat joined with its owner, used by the admin listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatWithOwner {
    #[serde(flatten)]
    pub chat: Chat,
    pub user: ChatOwner,
}

impl<'r> FromRow<'r, SqliteRow> for ChatWithOwner {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            chat: Chat::from_row(row)?,
            user: ChatOwner {
                public_id: row.try_get("user_public_id")?,
                first_name: row.try_get("owner_first_name")?,
                last_name: row.try_get("owner_last_name")?,
                email: row.try_get("owner_email")?,
            },
        })
    }
}

/// Dashboard projection of a recently active chat.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentChat {
    pub id: String,
    pub title: String,
    pub created_at: String,
    pub user: ChatOwner,
}

impl From<ChatWithOwner> for RecentChat {
    fn from(value: ChatWithOwner) -> Self {
        Self {
            id: value.chat.public_id,
            title: value.chat.title,
            created_at: value.chat.created_at,
            user: value.user,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChatFilter {
    /// Owner public id.
    pub user_id: Option<String>,
    pub status: Option<ChatStatus>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatAnalytics {
    pub total_chats: i64,
    pub active_chats: i64,
    pub total_messages: i64,
    pub messages_today: i64,
    pub avg_messages_per_chat: f64,
    pub chats_by_day: Vec<DailyCount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum ChatStatus {
    Active,
    Archived,
    Deleted,
}

impl ChatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatStatus::Active => "active",
            ChatStatus::Archived => "archived",
            ChatStatus::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ChatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChatStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ChatStatus::Active),
            "archived" => Ok(ChatStatus::Archived),
            "deleted" => Ok(ChatStatus::Deleted),
            other => Err(format!("unknown chat status '{other}'")),
        }
    }
}
