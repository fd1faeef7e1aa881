use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{endpoint, ensure_success, http_client};
use crate::provider::{
    Completion, CompletionProvider, CompletionRequest, ConversationRole, TokenUsage,
};
use crate::OrchestratorError;

/// Adapter for the Gemini `generateContent` endpoint.
pub struct GoogleProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GoogleProvider {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, OrchestratorError> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into(),
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Instruction<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Instruction<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: i64,
    #[serde(default)]
    candidates_token_count: i64,
    #[serde(default)]
    total_token_count: i64,
}

#[async_trait]
impl CompletionProvider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, OrchestratorError> {
        let system_prompt = request.system_prompt.trim();
        let body = GenerateRequest {
            // Gemini rejects a conversation that opens with a model turn.
            contents: request
                .messages
                .iter()
                .skip_while(|message| message.role == ConversationRole::Assistant)
                .map(|message| Content {
                    role: match message.role {
                        ConversationRole::User => "user",
                        ConversationRole::Assistant => "model",
                    },
                    parts: vec![Part {
                        text: &message.content,
                    }],
                })
                .collect(),
            system_instruction: (!system_prompt.is_empty()).then(|| Instruction {
                parts: vec![Part {
                    text: system_prompt,
                }],
            }),
            generation_config: GenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: request.temperature,
            },
        };

        debug!(model = %self.model, "sending gemini generateContent request");
        let url = endpoint(&self.base_url, &format!("models/{}:generateContent", self.model));
        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;
        let response = ensure_success(self.name(), response).await?;
        let parsed: GenerateResponse = serde_json::from_slice(&response.bytes().await?)?;

        let content: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();
        if content.is_empty() {
            return Err(OrchestratorError::EmptyResponse(self.name().to_string()));
        }

        let usage = parsed.usage_metadata.unwrap_or_default();
        Ok(Completion {
            content,
            model: self.model.clone(),
            provider: self.name().to_string(),
            usage: TokenUsage {
                prompt: usage.prompt_token_count,
                completion: usage.candidates_token_count,
                total: usage.total_token_count,
            },
            response_time_ms: 0,
        })
    }
}
