//! AI provider orchestration: adapters for the upstream completion APIs,
//! default provider selection and system prompt assembly.

mod prompt;
mod provider;
pub mod providers;

use std::{collections::HashMap, str::FromStr, sync::Arc, time::Duration, time::Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use supportdesk_config::{AiConfig, AiProviderKind, AppConfig};

pub use prompt::{
    build_system_prompt, PromptContext, PromptDocument, PromptFaq, DOCUMENT_EXCERPT_CHARS,
};
pub use provider::{
    Completion, CompletionProvider, CompletionRequest, ConversationMessage, ConversationRole,
    TokenUsage,
};
use providers::{AnthropicProvider, GoogleProvider, OpenAiProvider};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("No AI provider available. Please configure API keys.")]
    NoProviderAvailable,
    #[error("provider {0} is not registered")]
    ProviderNotFound(String),
    #[error("provider http request failed: {0}")]
    ProviderHttp(#[from] reqwest::Error),
    #[error("invalid provider response: {0}")]
    ProviderResponse(#[from] serde_json::Error),
    #[error("{provider} returned {status}: {message}")]
    ProviderStatus {
        provider: String,
        status: u16,
        code: Option<String>,
        message: String,
    },
    #[error("{0} returned an empty completion")]
    EmptyResponse(String),
}

impl OrchestratorError {
    /// Error code reported by the upstream provider, if any.
    pub fn provider_code(&self) -> Option<&str> {
        match self {
            OrchestratorError::ProviderStatus { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMetadata {
    pub identifier: String,
    pub model: Option<String>,
    pub is_default: bool,
}

#[derive(Default)]
struct ProviderIndex {
    order: Vec<String>,
    handles: HashMap<String, Arc<dyn CompletionProvider>>,
    models: HashMap<String, String>,
}

impl ProviderIndex {
    fn len(&self) -> usize {
        self.handles.len()
    }

    fn register(&mut self, identifier: String, model: Option<String>, provider: Arc<dyn CompletionProvider>) {
        if !self.handles.contains_key(&identifier) {
            self.order.push(identifier.clone());
        }
        if let Some(model) = model {
            self.models.insert(identifier.clone(), model);
        }
        self.handles.insert(identifier, provider);
    }

    fn get(&self, identifier: &str) -> Option<Arc<dyn CompletionProvider>> {
        self.handles.get(identifier).cloned()
    }
}

pub struct Orchestrator {
    config: AiConfig,
    providers: ProviderIndex,
    default_provider: Option<String>,
}

impl Orchestrator {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            config: config.ai.clone(),
            providers: ProviderIndex::default(),
            default_provider: None,
        }
    }

    /// Register every provider that has an API key and pick the default.
    pub fn bootstrap(mut self) -> Result<Self, OrchestratorError> {
        let timeout = Duration::from_secs(self.config.request_timeout_seconds);

        for kind in AiProviderKind::ALL {
            let settings = self.config.provider_config(kind);
            let Some(api_key) = settings.api_key() else {
                debug!(provider = %kind, "no api key configured, skipping");
                continue;
            };

            let provider: Arc<dyn CompletionProvider> = match kind {
                AiProviderKind::OpenAi | AiProviderKind::DeepSeek => Arc::new(OpenAiProvider::new(
                    kind.as_str(),
                    api_key,
                    settings.model.clone(),
                    settings.base_url.clone(),
                    timeout,
                )?),
                AiProviderKind::Anthropic => Arc::new(AnthropicProvider::new(
                    api_key,
                    settings.model.clone(),
                    settings.base_url.clone(),
                    timeout,
                )?),
                AiProviderKind::Google => Arc::new(GoogleProvider::new(
                    api_key,
                    settings.model.clone(),
                    settings.base_url.clone(),
                    timeout,
                )?),
            };

            self.providers
                .register(kind.as_str().to_string(), Some(settings.model.clone()), provider);
        }

        self.default_provider = self.select_default();
        match &self.default_provider {
            Some(name) => info!(
                count = self.providers.len(),
                default = %name,
                "ai providers initialised"
            ),
            None => warn!("no ai provider configured, chat replies will fail"),
        }
        Ok(self)
    }

    /// Register a provider under `identifier`. The first registered provider
    /// becomes the default when none is set.
    pub fn with_provider(
        mut self,
        identifier: impl Into<String>,
        provider: Arc<dyn CompletionProvider>,
    ) -> Self {
        let identifier = identifier.into();
        self.providers.register(identifier.clone(), None, provider);
        if self.default_provider.is_none() {
            self.default_provider = Some(identifier);
        }
        self
    }

    pub fn default_provider(&self) -> Option<&str> {
        self.default_provider.as_deref()
    }

    pub fn is_available(&self) -> bool {
        self.default_provider.is_some()
    }

    pub fn providers(&self) -> Vec<ProviderMetadata> {
        self.providers
            .order
            .iter()
            .map(|identifier| ProviderMetadata {
                identifier: identifier.clone(),
                model: self.providers.models.get(identifier).cloned(),
                is_default: self.default_provider.as_deref() == Some(identifier.as_str()),
            })
            .collect()
    }

    /// Named provider when registered, otherwise the default.
    pub fn provider(&self, identifier: Option<&str>) -> Result<Arc<dyn CompletionProvider>, OrchestratorError> {
        if let Some(provider) = identifier.and_then(|name| self.providers.get(name)) {
            return Ok(provider);
        }
        self.default_provider
            .as_deref()
            .and_then(|name| self.providers.get(name))
            .ok_or(OrchestratorError::NoProviderAvailable)
    }

    pub async fn generate(
        &self,
        messages: Vec<ConversationMessage>,
        system_prompt: &str,
        provider: Option<&str>,
    ) -> Result<Completion, OrchestratorError> {
        let provider = self.provider(provider)?;
        let request = CompletionRequest {
            system_prompt: system_prompt.to_string(),
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let started = Instant::now();
        let result = provider.complete(request).await;
        let elapsed = started.elapsed().as_millis() as i64;

        match result {
            Ok(mut completion) => {
                completion.response_time_ms = elapsed;
                debug!(
                    provider = %completion.provider,
                    tokens = completion.usage.total,
                    response_time_ms = elapsed,
                    "completion received"
                );
                Ok(completion)
            }
            Err(err) => {
                error!(provider = %provider.name(), error = %err, "ai generation failed");
                Err(err)
            }
        }
    }

    fn select_default(&self) -> Option<String> {
        let configured = AiProviderKind::from_str(&self.config.provider)
            .map_err(|err| warn!(error = %err, "ignoring configured ai provider"))
            .ok();

        if let Some(kind) = configured {
            if self.providers.get(kind.as_str()).is_some() {
                return Some(kind.as_str().to_string());
            }
            warn!(provider = %kind, "configured ai provider has no api key, falling back");
        }

        self.providers.order.first().cloned()
    }
}
