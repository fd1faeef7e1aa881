use std::time::Duration;

use serde::Serialize;
use supportdesk_database::time::now_timestamp;
use supportdesk_database::{
    ChatAnalytics, DocumentAnalytics, FaqAnalytics, RecentChat, TopDocument, UserStats,
};
use tracing::debug;

use super::error::ServiceError;
use super::{chat, document, faq, user};
use crate::AppState;

const DASHBOARD_LIST_LIMIT: i64 = 5;
const STATM_PATH: &str = "/proc/self/statm";
// statm reports pages; 4 KiB covers the platforms we deploy on.
const PAGE_SIZE_BYTES: u64 = 4096;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardOverview {
    pub total_users: i64,
    pub active_users: i64,
    pub total_chats: i64,
    pub total_messages: i64,
    pub total_documents: i64,
    #[serde(rename = "totalFAQs")]
    pub total_faqs: i64,
    pub active_users_today: i64,
    pub messages_today: i64,
    pub recent_chats: Vec<RecentChat>,
    pub top_documents: Vec<TopDocument>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub overview: DashboardOverview,
    pub users: UserStats,
    pub chats: ChatAnalytics,
    pub documents: DocumentAnalytics,
    pub faqs: FaqAnalytics,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemoryUsage {
    pub rss: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemHealth {
    pub status: &'static str,
    pub uptime: u64,
    pub uptime_formatted: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryUsage>,
    pub environment: String,
    pub version: &'static str,
    pub timestamp: String,
}

pub async fn dashboard(state: &AppState) -> Result<Dashboard, ServiceError> {
    let (chats, users, documents, faqs, recent_chats, top_documents) = tokio::try_join!(
        chat::analytics(state),
        user::stats(state),
        document::analytics(state),
        faq::analytics(state),
        chat::recent_chats(state, DASHBOARD_LIST_LIMIT),
        document::top_documents(state, DASHBOARD_LIST_LIMIT),
    )?;

    Ok(Dashboard {
        overview: DashboardOverview {
            total_users: users.total_users,
            active_users: users.active_users,
            total_chats: chats.total_chats,
            total_messages: chats.total_messages,
            total_documents: documents.total_documents,
            total_faqs: faqs.total_faqs,
            active_users_today: users.active_users_today,
            messages_today: chats.messages_today,
            recent_chats,
            top_documents,
        },
        users,
        chats,
        documents,
        faqs,
    })
}

pub async fn system_health(state: &AppState) -> SystemHealth {
    let uptime = state.uptime();
    SystemHealth {
        status: "healthy",
        uptime: uptime.as_secs(),
        uptime_formatted: format_uptime(uptime),
        memory: resident_memory().await.map(|bytes| MemoryUsage {
            rss: format_bytes(bytes),
        }),
        environment: state.config().http.environment.clone(),
        version: env!("CARGO_PKG_VERSION"),
        timestamp: now_timestamp(),
    }
}

async fn resident_memory() -> Option<u64> {
    let statm = match tokio::fs::read_to_string(STATM_PATH).await {
        Ok(statm) => statm,
        Err(err) => {
            debug!(error = %err, "process memory unavailable");
            return None;
        }
    };
    let pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
    Some(pages * PAGE_SIZE_BYTES)
}

/// Human readable size with two decimals, e.g. `1.50 KB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

/// `1d 2h 3m 4s`, leaving out zero days, hours and minutes.
pub fn format_uptime(uptime: Duration) -> String {
    let total = uptime.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    parts.push(format!("{seconds}s"));
    parts.join(" ")
}
