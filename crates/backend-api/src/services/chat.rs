use serde::Serialize;
use supportdesk_database::{
    Chat, ChatAnalytics, ChatFilter, ChatStatus, ChatWithOwner, ContextSource, ContextSourceKind,
    CreateMessageRequest, Document, Faq, Message, MessageError, MessageMetadata, MessageType,
    PageRequest, RecentChat, TokenCounts, User,
};
use supportdesk_orchestrator::{
    build_system_prompt, Completion, ConversationMessage, PromptContext, PromptDocument,
    PromptFaq,
};
use tracing::{error, info, warn};

use super::error::ServiceError;
use crate::AppState;

pub const APOLOGY_MESSAGE: &str = "I apologize, but I encountered an error processing your request. Please try again or contact human support.";
pub const AI_ERROR_CODE: &str = "AI_ERROR";

/// Messages of history sent to the model, including the new one.
pub const HISTORY_WINDOW: i64 = 10;
const TITLE_PREVIEW_CHARS: usize = 50;
const CONTEXT_DOCUMENTS: i64 = 3;
const CONTEXT_FAQS: i64 = 5;

/// Documents and FAQs handed to the prompt builder. `sources` lists only the
/// records that matched the full-text search.
#[derive(Debug, Clone, Default)]
pub struct RetrievedContext {
    pub documents: Vec<Document>,
    pub faqs: Vec<Faq>,
    pub sources: Vec<ContextSource>,
}

impl RetrievedContext {
    fn prompt_context(&self) -> PromptContext {
        PromptContext {
            documents: self
                .documents
                .iter()
                .map(|document| PromptDocument {
                    title: document.title.clone(),
                    content: document.content.clone().unwrap_or_default(),
                })
                .collect(),
            faqs: self
                .faqs
                .iter()
                .map(|faq| PromptFaq {
                    question: faq.question.clone(),
                    answer: faq.answer.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSummary {
    pub id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl MessageSummary {
    fn plain(message: Message) -> Self {
        Self {
            id: message.public_id,
            content: message.content,
            message_type: message.message_type,
            created_at: message.created_at,
            metadata: None,
            is_error: None,
        }
    }

    fn with_metadata(message: Message) -> Self {
        let metadata = message.metadata.clone();
        Self {
            metadata: Some(metadata),
            ..Self::plain(message)
        }
    }

    fn failed(message: Message) -> Self {
        Self {
            is_error: Some(true),
            ..Self::plain(message)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResult {
    pub chat_id: String,
    pub user_message: MessageSummary,
    pub ai_message: MessageSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatDetail {
    #[serde(flatten)]
    pub chat: Chat,
    pub messages: Vec<Message>,
}

/// Fetch an active chat owned by `user`, or start a new one when no id is given.
pub async fn create_or_get_chat(
    state: &AppState,
    user: &User,
    chat_id: Option<&str>,
) -> Result<Chat, ServiceError> {
    if let Some(chat_id) = chat_id {
        return state
            .chats()
            .find_for_user(chat_id, user.id, Some(ChatStatus::Active))
            .await?
            .ok_or_else(|| ServiceError::not_found("Chat not found"));
    }

    let chat = state.chats().create(user.id, None).await?;
    info!(chat_id = %chat.public_id, user_id = %user.public_id, "created new chat");
    Ok(chat)
}

/// Store the user's message, ask the model for a reply and store that too.
///
/// A failed generation is not an error for the caller: an apology is stored
/// in place of the reply and flagged with `isError`.
pub async fn send_message(
    state: &AppState,
    user: &User,
    content: &str,
    chat_id: Option<&str>,
) -> Result<SendMessageResult, ServiceError> {
    let chat = create_or_get_chat(state, user, chat_id).await?;

    let user_message = state
        .messages()
        .create(&CreateMessageRequest::user(chat.id, content))
        .await?;
    let message_count = state.chats().record_message(chat.id).await?;

    if message_count == 1 {
        state.chats().set_title(chat.id, &title_from_message(content)).await?;
    }

    let generated = generate_reply(state, &chat, content).await;

    let ai_message = match generated {
        Ok((completion, context)) => {
            let metadata = MessageMetadata {
                model: Some(completion.model),
                provider: Some(completion.provider),
                tokens_used: Some(TokenCounts {
                    prompt: completion.usage.prompt,
                    completion: completion.usage.completion,
                    total: completion.usage.total,
                }),
                response_time_ms: Some(completion.response_time_ms),
                context_sources: context.sources.clone(),
                error: None,
            };
            let message = state
                .messages()
                .create(&CreateMessageRequest {
                    chat_id: chat.id,
                    message_type: MessageType::Ai,
                    content: completion.content,
                    metadata,
                })
                .await?;
            state.chats().record_message(chat.id).await?;

            if let Err(err) = update_context_usage(state, &context.sources).await {
                warn!(chat_id = %chat.public_id, error = %err, "failed to update context usage");
            }
            MessageSummary::with_metadata(message)
        }
        Err(failure) => {
            error!(
                chat_id = %chat.public_id,
                code = %failure.code,
                error = %failure.message,
                "ai response generation failed"
            );
            let metadata = MessageMetadata {
                error: Some(failure),
                ..MessageMetadata::default()
            };
            let message = state
                .messages()
                .create(&CreateMessageRequest {
                    chat_id: chat.id,
                    message_type: MessageType::Ai,
                    content: APOLOGY_MESSAGE.to_string(),
                    metadata,
                })
                .await?;
            state.chats().record_message(chat.id).await?;
            MessageSummary::failed(message)
        }
    };

    Ok(SendMessageResult {
        chat_id: chat.public_id,
        user_message: MessageSummary::plain(user_message),
        ai_message,
    })
}

/// Retrieve context, assemble the prompt and ask the model. Every failure on
/// the way is reported as the error stored with the apology.
async fn generate_reply(
    state: &AppState,
    chat: &Chat,
    content: &str,
) -> Result<(Completion, RetrievedContext), MessageError> {
    let context = get_context_for_ai(state, content)
        .await
        .map_err(|err| reply_failure(AI_ERROR_CODE, err))?;
    let history = state
        .messages()
        .recent_for_chat(chat.id, HISTORY_WINDOW)
        .await
        .map_err(|err| reply_failure(AI_ERROR_CODE, err))?;
    let system_prompt = build_system_prompt(&context.prompt_context(), &state.config().support);

    let completion = state
        .orchestrator()
        .generate(conversation(&history), &system_prompt, None)
        .await
        .map_err(|err| {
            let code = err.provider_code().unwrap_or(AI_ERROR_CODE).to_string();
            reply_failure(&code, err)
        })?;
    Ok((completion, context))
}

fn reply_failure(code: &str, err: impl std::fmt::Display) -> MessageError {
    MessageError {
        code: code.to_string(),
        message: err.to_string(),
    }
}

/// First 50 characters of the opening message, with `...` when cut.
pub fn title_from_message(content: &str) -> String {
    let mut title: String = content.chars().take(TITLE_PREVIEW_CHARS).collect();
    if content.chars().count() > TITLE_PREVIEW_CHARS {
        title.push_str("...");
    }
    title
}

fn conversation(history: &[Message]) -> Vec<ConversationMessage> {
    history
        .iter()
        .filter_map(|message| match message.message_type {
            MessageType::User => Some(ConversationMessage::user(message.content.clone())),
            MessageType::Ai => Some(ConversationMessage::assistant(message.content.clone())),
            MessageType::System => None,
        })
        .collect()
}

/// Search documents and FAQs for `query`, falling back to the most used
/// documents and the highest priority FAQs when nothing matches.
pub async fn get_context_for_ai(
    state: &AppState,
    query: &str,
) -> Result<RetrievedContext, ServiceError> {
    let mut sources = Vec::new();

    let mut documents = state.documents().search(query, CONTEXT_DOCUMENTS).await?;
    sources.extend(documents.iter().map(|document| ContextSource {
        kind: ContextSourceKind::Document,
        source_id: document.public_id.clone(),
        title: document.title.clone(),
        relevance_score: 1.0,
    }));
    if documents.is_empty() {
        documents = state.documents().top_by_usage(CONTEXT_DOCUMENTS).await?;
    }

    let mut faqs = state.faqs().search(query, CONTEXT_FAQS).await?;
    sources.extend(faqs.iter().map(|faq| ContextSource {
        kind: ContextSourceKind::Faq,
        source_id: faq.public_id.clone(),
        title: faq.question.clone(),
        relevance_score: 1.0,
    }));
    if faqs.is_empty() {
        faqs = state.faqs().top_by_priority(CONTEXT_FAQS).await?;
    }

    Ok(RetrievedContext {
        documents,
        faqs,
        sources,
    })
}

pub async fn update_context_usage(
    state: &AppState,
    sources: &[ContextSource],
) -> Result<(), ServiceError> {
    for source in sources {
        match source.kind {
            ContextSourceKind::Document => {
                state.documents().increment_usage(&source.source_id).await?
            }
            ContextSourceKind::Faq => state.faqs().increment_views(&source.source_id).await?,
        }
    }
    Ok(())
}

pub async fn chat_history(
    state: &AppState,
    user: &User,
    page: PageRequest,
) -> Result<(Vec<Chat>, i64), ServiceError> {
    Ok(state.chats().list_for_user(user.id, page).await?)
}

/// A chat with its messages in order. Pass `None` as owner to skip the
/// ownership check.
pub async fn chat_by_id(
    state: &AppState,
    chat_id: &str,
    owner: Option<&User>,
) -> Result<ChatDetail, ServiceError> {
    let chat = find_chat(state, chat_id, owner).await?;
    let messages = state.messages().list_for_chat(chat.id).await?;
    Ok(ChatDetail { chat, messages })
}

pub async fn delete_chat(
    state: &AppState,
    chat_id: &str,
    user: &User,
    is_admin: bool,
) -> Result<(), ServiceError> {
    let owner = (!is_admin).then_some(user);
    let chat = find_chat(state, chat_id, owner).await?;
    state.chats().delete(chat.id).await?;
    info!(chat_id = %chat_id, user_id = %user.public_id, "chat deleted");
    Ok(())
}

async fn find_chat(
    state: &AppState,
    chat_id: &str,
    owner: Option<&User>,
) -> Result<Chat, ServiceError> {
    match owner {
        Some(user) => state.chats().find_for_user(chat_id, user.id, None).await?,
        None => state.chats().find_by_public_id(chat_id).await?,
    }
    .ok_or_else(|| ServiceError::not_found("Chat not found"))
}

pub async fn add_message_feedback(
    state: &AppState,
    message_id: &str,
    user: &User,
    helpful: bool,
    feedback: Option<&str>,
) -> Result<(), ServiceError> {
    let (message, owner_id) = state
        .messages()
        .find_by_public_id_with_owner(message_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Message not found"))?;

    if owner_id != user.id {
        return Err(ServiceError::forbidden("Access denied"));
    }

    state.messages().set_feedback(message.id, helpful, feedback).await?;
    Ok(())
}

pub async fn all_chats(
    state: &AppState,
    filter: &ChatFilter,
    page: PageRequest,
) -> Result<(Vec<ChatWithOwner>, i64), ServiceError> {
    Ok(state.chats().list_all(filter, page).await?)
}

pub async fn analytics(state: &AppState) -> Result<ChatAnalytics, ServiceError> {
    Ok(state.chats().analytics().await?)
}

pub async fn recent_chats(state: &AppState, limit: i64) -> Result<Vec<RecentChat>, ServiceError> {
    let chats = state.chats().recent(limit).await?;
    Ok(chats.into_iter().map(RecentChat::from).collect())
}
