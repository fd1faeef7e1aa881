mod docs;
pub mod error;
pub mod rate_limit;
pub mod routes;
pub mod services;
mod state;
pub mod util;

pub use docs::ApiDoc;
pub use error::ApiError;
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{HeaderName, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method, Uri,
    },
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Json, Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{warn, Level};
use utoipa::OpenApi;

/// Browser hardening headers added to every response that does not set them.
const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "SAMEORIGIN"),
    ("referrer-policy", "no-referrer"),
    ("x-dns-prefetch-control", "off"),
    ("x-xss-protection", "0"),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "cross-origin"),
];

/// Room for multipart framing and text fields on top of the file payloads.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let uploads = &state.config().uploads;
    let body_limit = (uploads.max_file_size_bytes as usize)
        .saturating_mul(uploads.max_files.max(1))
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let auth_limited = Router::new()
        .route("/api/auth/register", post(routes::auth::register))
        .route("/api/auth/login", post(routes::auth::login))
        .route_layer(from_fn_with_state(state.clone(), rate_limit::limit_auth));

    let chat_limited = Router::new()
        .route("/api/chat/message", post(routes::chat::send_message))
        .route_layer(from_fn_with_state(state.clone(), rate_limit::limit_chat));

    let api = Router::new()
        .route("/api/health", get(routes::health::health_check))
        // Auth
        .route("/api/auth/refresh", post(routes::auth::refresh))
        .route("/api/auth/logout", post(routes::auth::logout))
        .route("/api/auth/me", get(routes::auth::me))
        .route("/api/auth/profile", put(routes::auth::update_profile))
        .route("/api/auth/password", put(routes::auth::change_password))
        // Chat
        .route("/api/chat/new", post(routes::chat::create_chat))
        .route("/api/chat/history", get(routes::chat::chat_history))
        .route(
            "/api/chat/:chat_id",
            get(routes::chat::get_chat).delete(routes::chat::delete_chat),
        )
        .route(
            "/api/chat/feedback/:message_id",
            post(routes::chat::message_feedback),
        )
        // Documents
        .route("/api/documents", get(routes::documents::list_documents))
        .route("/api/documents/categories", get(routes::documents::categories))
        .route("/api/documents/analytics", get(routes::documents::analytics))
        .route("/api/documents/upload", post(routes::documents::upload_document))
        .route(
            "/api/documents/upload-multiple",
            post(routes::documents::upload_multiple),
        )
        .route(
            "/api/documents/:id",
            get(routes::documents::get_document)
                .put(routes::documents::update_document)
                .delete(routes::documents::delete_document),
        )
        .route(
            "/api/documents/:id/reprocess",
            post(routes::documents::reprocess_document),
        )
        // FAQs
        .route(
            "/api/faqs",
            get(routes::faqs::public_faqs).post(routes::faqs::create_faq),
        )
        .route("/api/faqs/categories", get(routes::faqs::categories))
        .route("/api/faqs/bulk-import", post(routes::faqs::bulk_import))
        .route("/api/faqs/admin/all", get(routes::faqs::all_faqs))
        .route("/api/faqs/admin/analytics", get(routes::faqs::analytics))
        .route(
            "/api/faqs/:id",
            get(routes::faqs::get_faq)
                .put(routes::faqs::update_faq)
                .delete(routes::faqs::delete_faq),
        )
        .route("/api/faqs/:id/feedback", post(routes::faqs::feedback))
        // Admin
        .route("/api/admin/dashboard", get(routes::admin::dashboard))
        .route("/api/admin/chats", get(routes::admin::list_chats))
        .route(
            "/api/admin/chats/:chat_id",
            get(routes::admin::get_chat).delete(routes::admin::delete_chat),
        )
        .route("/api/admin/users", get(routes::admin::list_users))
        .route(
            "/api/admin/users/:id",
            put(routes::admin::update_user).delete(routes::admin::delete_user),
        )
        .route("/api/admin/users/:id/role", put(routes::admin::update_user_role))
        .route(
            "/api/admin/users/:id/status",
            put(routes::admin::update_user_status),
        )
        .route("/api/admin/system/health", get(routes::admin::system_health))
        // Users
        .route("/api/users/search", get(routes::users::search_users))
        .route("/api/users/:id", get(routes::users::get_user))
        .merge(auth_limited)
        .merge(chat_limited)
        .route_layer(from_fn_with_state(state.clone(), rate_limit::limit_api));

    let cors = cors_layer(&state.config().http.cors_origins);
    let uploads_dir = ServeDir::new(&state.config().uploads.directory);

    let mut router = Router::new()
        .merge(api)
        .route("/api-docs/openapi.json", get(openapi_json))
        .nest_service("/uploads", uploads_dir)
        .fallback(route_not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit));

    for &(name, value) in SECURITY_HEADERS {
        router = router.layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ));
    }

    router
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

async fn route_not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::not_found(format!("Route not found: {method} {}", uri.path()))
}

/// Any origin when none are configured, otherwise exactly the listed ones.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(allowed))
    }
}
