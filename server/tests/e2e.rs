use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method, Request, StatusCode,
    },
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use supportdesk_backend_api::{build_router, AppState};
use supportdesk_backend_runtime::{seed, BackendServices};
use supportdesk_config::AppConfig;
use supportdesk_orchestrator::{
    Completion, CompletionProvider, CompletionRequest, Orchestrator, OrchestratorError, TokenUsage,
};
use tempfile::TempDir;
use tower::ServiceExt;

/// Answers with the system prompt so the test can check what context was retrieved.
struct PromptMirror;

#[async_trait]
impl CompletionProvider for PromptMirror {
    fn name(&self) -> &str {
        "mirror"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, OrchestratorError> {
        Ok(Completion {
            content: request.system_prompt,
            model: "mirror-1".to_string(),
            provider: "mirror".to_string(),
            usage: TokenUsage::default(),
            response_time_ms: 0,
        })
    }
}

struct TestApp {
    router: Router,
    _dir: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");

        let mut config = AppConfig::default();
        config.database.url = format!("sqlite://{}", dir.path().join("e2e.db").to_string_lossy());
        config.database.max_connections = 5;
        config.uploads.directory = dir.path().join("uploads").display().to_string();
        config.rate_limit.auth_max_requests = 100;

        let services = BackendServices::initialise(&config)
            .await
            .expect("initialise backend services");
        seed::seed_database(&services.db_pool)
            .await
            .expect("seed database");

        let orchestrator = Arc::new(Orchestrator::new(&config).with_provider("mirror", Arc::new(PromptMirror)));
        let state = AppState::new(services.db_pool.clone(), config, orchestrator);

        Self {
            router: build_router(state),
            _dir: dir,
        }
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json_body) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&json_body).expect("serialize request body"))
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("build request"))
            .await
            .expect("dispatch request");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect response body")
            .to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn login(&self, email: &str, password: &str) -> String {
        let (status, json) = self
            .request(
                Method::POST,
                "/api/auth/login",
                Some(json!({ "email": email, "password": password })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {json}");
        json["data"]["accessToken"]
            .as_str()
            .expect("access token")
            .to_string()
    }
}

#[tokio::test]
async fn health_check_returns_ok() {
    let app = TestApp::new().await;
    let (status, json) = app.request(Method::GET, "/api/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "OK");
}

#[tokio::test]
async fn seeded_accounts_can_sign_in() {
    let app = TestApp::new().await;

    let admin = app.login(seed::ADMIN_EMAIL, seed::ADMIN_PASSWORD).await;
    let (status, json) = app
        .request(Method::GET, "/api/auth/me", None, Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["role"], "admin");

    let user = app.login(seed::USER_EMAIL, seed::USER_PASSWORD).await;
    let (status, _) = app
        .request(Method::GET, "/api/admin/dashboard", None, Some(&user))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn public_faqs_are_ordered_by_priority() {
    let app = TestApp::new().await;
    let (status, json) = app.request(Method::GET, "/api/faqs", None, None).await;

    assert_eq!(status, StatusCode::OK);
    let faqs = json["data"].as_array().expect("faq list");
    assert_eq!(faqs.len(), 8);
    assert!(faqs
        .iter()
        .take(2)
        .all(|faq| faq["category"] == "General"));
}

#[tokio::test]
async fn chat_reply_uses_matching_faq_as_context() {
    let app = TestApp::new().await;
    let token = app.login(seed::USER_EMAIL, seed::USER_PASSWORD).await;

    let (status, json) = app
        .request(
            Method::POST,
            "/api/chat/message",
            Some(json!({ "message": "How do I reset my password?" })),
            Some(&token),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{json}");
    let prompt = json["data"]["aiMessage"]["content"].as_str().unwrap_or_default();
    assert!(prompt.contains("How do I reset my password?"));

    let sources = json["data"]["aiMessage"]["metadata"]["contextSources"]
        .as_array()
        .cloned()
        .unwrap_or_default();
    assert!(sources.iter().any(|source| source["type"] == "faq"));

    let (status, json) = app
        .request(Method::GET, "/api/chat/history", None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["pagination"]["total"], 1);
}
