//! Message entity definitions

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(skip_serializing)]
    pub id: i64,
    #[serde(rename = "id")]
    pub public_id: String,
    #[serde(skip_serializing)]
    pub chat_id: i64,
    #[serde(rename = "chatId")]
    pub chat_public_id: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub content: String,
    pub metadata: MessageMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<MessageFeedback>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<TokenCounts>,
    #[serde(rename = "responseTime", skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<i64>,
    pub context_sources: Vec<ContextSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<MessageError>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCounts {
    pub prompt: i64,
    pub completion: i64,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageError {
    pub code: String,
    pub message: String,
}

/// A document or FAQ that was placed in the prompt for an AI reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSource {
    #[serde(rename = "type")]
    pub kind: ContextSourceKind,
    pub source_id: String,
    pub title: String,
    pub relevance_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextSourceKind {
    Document,
    Faq,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageFeedback {
    pub helpful: bool,
    pub feedback_text: Option<String>,
    pub feedback_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum MessageType {
    User,
    Ai,
    System,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::User => "user",
            MessageType::Ai => "ai",
            MessageType::System => "system",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct CreateMessageRequest {
    pub chat_id: i64,
    pub message_type: MessageType,
    pub content: String,
    pub metadata: MessageMetadata,
}

impl CreateMessageRequest {
    pub fn user(chat_id: i64, content: impl Into<String>) -> Self {
        Self {
            chat_id,
            message_type: MessageType::User,
            content: content.into(),
            metadata: MessageMetadata::default(),
        }
    }
}

impl<'r> FromRow<'r, SqliteRow> for Message {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let sources_json: String = row.try_get("context_sources")?;
        let context_sources: Vec<ContextSource> =
            serde_json::from_str(&sources_json).map_err(|e| sqlx::Error::ColumnDecode {
                index: "context_sources".into(),
                source: Box::new(e),
            })?;

        let prompt: Option<i64> = row.try_get("prompt_tokens")?;
        let completion: Option<i64> = row.try_get("completion_tokens")?;
        let total: Option<i64> = row.try_get("total_tokens")?;
        let tokens_used = match (prompt, completion, total) {
            (None, None, None) => None,
            (p, c, t) => Some(TokenCounts {
                prompt: p.unwrap_or_default(),
                completion: c.unwrap_or_default(),
                total: t.unwrap_or_default(),
            }),
        };

        let error_code: Option<String> = row.try_get("error_code")?;
        let error_message: Option<String> = row.try_get("error_message")?;
        let error = error_code.map(|code| MessageError {
            code,
            message: error_message.unwrap_or_default(),
        });

        let helpful: Option<bool> = row.try_get("feedback_helpful")?;
        let feedback = match helpful {
            Some(helpful) => Some(MessageFeedback {
                helpful,
                feedback_text: row.try_get("feedback_text")?,
                feedback_at: row.try_get("feedback_at")?,
            }),
            None => None,
        };

        Ok(Self {
            id: row.try_get("id")?,
            public_id: row.try_get("public_id")?,
            chat_id: row.try_get("chat_id")?,
            chat_public_id: row.try_get("chat_public_id")?,
            message_type: row.try_get("message_type")?,
            content: row.try_get("content")?,
            metadata: MessageMetadata {
                model: row.try_get("model")?,
                provider: row.try_get("provider")?,
                tokens_used,
                response_time_ms: row.try_get("response_time_ms")?,
                context_sources,
                error,
            },
            feedback,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_serialises_in_camel_case() {
        let metadata = MessageMetadata {
            model: Some("gpt-4".into()),
            provider: Some("openai".into()),
            tokens_used: Some(TokenCounts {
                prompt: 10,
                completion: 5,
                total: 15,
            }),
            response_time_ms: Some(120),
            context_sources: vec![ContextSource {
                kind: ContextSourceKind::Faq,
                source_id: "f1".into(),
                title: "How do refunds work?".into(),
                relevance_score: 1.0,
            }],
            error: None,
        };

        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["tokensUsed"]["total"], 15);
        assert_eq!(json["responseTime"], 120);
        assert_eq!(json["contextSources"][0]["type"], "faq");
        assert_eq!(json["contextSources"][0]["sourceId"], "f1");
        assert!(json.get("error").is_none());
    }
}
