use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(title = "Supportdesk API", description = "Customer support chat backend"),
    paths(
        crate::routes::health::health_check,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::refresh,
        crate::routes::auth::logout,
        crate::routes::auth::me,
        crate::routes::auth::update_profile,
        crate::routes::auth::change_password,
        crate::routes::chat::send_message,
        crate::routes::chat::create_chat,
        crate::routes::chat::chat_history,
        crate::routes::chat::get_chat,
        crate::routes::chat::delete_chat,
        crate::routes::chat::message_feedback,
        crate::routes::documents::upload_document,
        crate::routes::documents::upload_multiple,
        crate::routes::documents::list_documents,
        crate::routes::documents::get_document,
        crate::routes::documents::update_document,
        crate::routes::documents::delete_document,
        crate::routes::documents::categories,
        crate::routes::documents::reprocess_document,
        crate::routes::documents::analytics,
        crate::routes::faqs::public_faqs,
        crate::routes::faqs::categories,
        crate::routes::faqs::get_faq,
        crate::routes::faqs::feedback,
        crate::routes::faqs::all_faqs,
        crate::routes::faqs::analytics,
        crate::routes::faqs::create_faq,
        crate::routes::faqs::bulk_import,
        crate::routes::faqs::update_faq,
        crate::routes::faqs::delete_faq,
        crate::routes::admin::dashboard,
        crate::routes::admin::list_chats,
        crate::routes::admin::get_chat,
        crate::routes::admin::delete_chat,
        crate::routes::admin::list_users,
        crate::routes::admin::update_user,
        crate::routes::admin::update_user_role,
        crate::routes::admin::update_user_status,
        crate::routes::admin::delete_user,
        crate::routes::admin::system_health,
        crate::routes::users::search_users,
        crate::routes::users::get_user
    ),
    components(
        schemas(
            crate::error::ErrorResponse,
            crate::error::ErrorBody,
            crate::error::FieldError,
            crate::util::Pagination,
            crate::routes::health::HealthResponse,
            crate::routes::auth::RegisterRequest,
            crate::routes::auth::LoginRequest,
            crate::routes::auth::RefreshRequest,
            crate::routes::auth::ProfileUpdateRequest,
            crate::routes::auth::ChangePasswordRequest,
            crate::routes::chat::SendMessageRequest,
            crate::routes::chat::FeedbackRequest,
            crate::routes::documents::DocumentUpdateRequest,
            crate::routes::faqs::FaqFeedbackRequest,
            crate::routes::faqs::BulkImportRequest,
            crate::routes::admin::RoleUpdateRequest,
            crate::routes::admin::StatusUpdateRequest,
            crate::services::faq::FaqInput,
            crate::services::faq::FaqUpdate,
            crate::services::user::UserUpdate
        )
    ),
    tags(
        (name = "Health", description = "Service health endpoints"),
        (name = "Auth", description = "Registration, sessions and profile"),
        (name = "Chat", description = "Support conversations with the assistant"),
        (name = "Documents", description = "Knowledge base documents"),
        (name = "FAQs", description = "Frequently asked questions"),
        (name = "Admin", description = "Dashboard, moderation and account management"),
        (name = "Users", description = "User lookup")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        let schemes = &mut components.security_schemes;

        let mut scheme = SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer));
        if let SecurityScheme::Http(http) = &mut scheme {
            http.bearer_format = Some("JWT".to_string());
        }

        schemes.insert("bearerAuth".to_string(), scheme);
    }
}
