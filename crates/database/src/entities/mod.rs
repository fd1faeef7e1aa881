//! Domain entities for the database layer

pub mod chat;
pub mod document;
pub mod faq;
pub mod message;
pub mod user;

pub use chat::{Chat, ChatAnalytics, ChatFilter, ChatOwner, ChatStatus, ChatWithOwner, RecentChat};
pub use document::{
    CreateDocumentRequest, Document, DocumentAnalytics, DocumentFilter, DocumentStatus,
    DocumentType, DocumentUsage, TopDocument, UpdateDocumentRequest,
};
pub use faq::{
    CreateFaqRequest, Faq, FaqAnalytics, FaqFeedbackStats, FaqFilter, FaqViews, PublicFaq,
    UpdateFaqRequest,
};
pub use message::{
    ContextSource, ContextSourceKind, CreateMessageRequest, Message, MessageError,
    MessageFeedback, MessageMetadata, MessageType, TokenCounts,
};
pub use user::{
    AdminUserUpdate, CreateUserRequest, UpdateProfileRequest, User, UserCredentials, UserFilter,
    UserRole, UserStats, UserSummary,
};
