use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, warn};

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "supportdesk.toml",
    "config/supportdesk.toml",
    "crates/config/supportdesk.toml",
    "../supportdesk.toml",
    "../config/supportdesk.toml",
    "backend/supportdesk.toml",
    "backend/config/supportdesk.toml",
];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub support: SupportConfig,
    #[serde(default)]
    pub uploads: UploadConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
    #[serde(default = "HttpConfig::default_environment")]
    pub environment: String,
}

impl HttpConfig {
    pub fn is_production(&self) -> bool {
        self.environment.trim().eq_ignore_ascii_case("production")
    }

    fn default_environment() -> String {
        "development".to_string()
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 5000,
            cors_origins: Vec::new(),
            environment: Self::default_environment(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://supportdesk.db".to_string(),
            max_connections: 10,
        }
    }
}

/// Token signing settings. Access and refresh tokens use separate secrets.
///
/// ```
/// use supportdesk_config::AuthConfig;
///
/// let auth = AuthConfig::default();
/// assert_eq!(auth.access_token_ttl_seconds, 7 * 24 * 60 * 60);
/// assert_eq!(auth.refresh_token_ttl_seconds, 30 * 24 * 60 * 60);
/// assert_ne!(auth.jwt_secret, auth.jwt_refresh_secret);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "AuthConfig::default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "AuthConfig::default_jwt_refresh_secret")]
    pub jwt_refresh_secret: String,
    #[serde(default = "AuthConfig::default_access_ttl")]
    pub access_token_ttl_seconds: u64,
    #[serde(default = "AuthConfig::default_refresh_ttl")]
    pub refresh_token_ttl_seconds: u64,
    #[serde(default = "AuthConfig::default_issuer")]
    pub issuer: String,
}

/// Shortest signing secret accepted in production.
pub const MIN_SECRET_BYTES: usize = 32;

impl AuthConfig {
    /// Problems with the signing secrets: a built-in default or a value
    /// shorter than [`MIN_SECRET_BYTES`].
    pub fn secret_problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let checks = [
            ("auth.jwt_secret", &self.jwt_secret, Self::default_jwt_secret()),
            (
                "auth.jwt_refresh_secret",
                &self.jwt_refresh_secret,
                Self::default_jwt_refresh_secret(),
            ),
        ];
        for (key, value, default) in checks {
            if *value == default {
                problems.push(format!("{key} is the built-in development default"));
            } else if value.len() < MIN_SECRET_BYTES {
                problems.push(format!("{key} is shorter than {MIN_SECRET_BYTES} bytes"));
            }
        }
        problems
    }

    fn default_jwt_secret() -> String {
        "supportdesk-dev-access-secret-change-me".to_string()
    }

    fn default_jwt_refresh_secret() -> String {
        "supportdesk-dev-refresh-secret-change-me".to_string()
    }

    const fn default_access_ttl() -> u64 {
        7 * 24 * 60 * 60
    }

    const fn default_refresh_ttl() -> u64 {
        30 * 24 * 60 * 60
    }

    fn default_issuer() -> String {
        "supportdesk".to_string()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: Self::default_jwt_secret(),
            jwt_refresh_secret: Self::default_jwt_refresh_secret(),
            access_token_ttl_seconds: Self::default_access_ttl(),
            refresh_token_ttl_seconds: Self::default_refresh_ttl(),
            issuer: Self::default_issuer(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProviderKind {
    OpenAi,
    Anthropic,
    Google,
    DeepSeek,
}

impl AiProviderKind {
    /// Registration order used when the configured provider has no key.
    pub const ALL: [AiProviderKind; 4] = [
        AiProviderKind::OpenAi,
        AiProviderKind::Anthropic,
        AiProviderKind::Google,
        AiProviderKind::DeepSeek,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AiProviderKind::OpenAi => "openai",
            AiProviderKind::Anthropic => "anthropic",
            AiProviderKind::Google => "google",
            AiProviderKind::DeepSeek => "deepseek",
        }
    }
}

impl fmt::Display for AiProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AiProviderKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(AiProviderKind::OpenAi),
            "anthropic" => Ok(AiProviderKind::Anthropic),
            "google" | "gemini" => Ok(AiProviderKind::Google),
            "deepseek" => Ok(AiProviderKind::DeepSeek),
            other => Err(format!("unknown AI provider: {other}")),
        }
    }
}

/// Connection settings for one upstream AI provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl ProviderConfig {
    fn new(model: &str, base_url: &str) -> Self {
        Self {
            api_key: None,
            model: model.to_string(),
            base_url: base_url.to_string(),
        }
    }

    /// Returns the key when one is configured and not blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

/// Provider selection and generation parameters.
///
/// ```
/// use supportdesk_config::{AiConfig, AiProviderKind};
///
/// let ai = AiConfig::default();
/// assert_eq!(ai.provider, "openai");
/// assert_eq!(ai.max_tokens, 2048);
/// assert_eq!(ai.provider_config(AiProviderKind::DeepSeek).model, "deepseek-chat");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "AiConfig::default_provider")]
    pub provider: String,
    #[serde(default = "AiConfig::default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "AiConfig::default_temperature")]
    pub temperature: f32,
    #[serde(default = "AiConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "AiConfig::default_openai")]
    pub openai: ProviderConfig,
    #[serde(default = "AiConfig::default_anthropic")]
    pub anthropic: ProviderConfig,
    #[serde(default = "AiConfig::default_google")]
    pub google: ProviderConfig,
    #[serde(default = "AiConfig::default_deepseek")]
    pub deepseek: ProviderConfig,
}

impl AiConfig {
    fn default_provider() -> String {
        AiProviderKind::OpenAi.as_str().to_string()
    }

    const fn default_max_tokens() -> u32 {
        2048
    }

    const fn default_temperature() -> f32 {
        0.7
    }

    const fn default_request_timeout() -> u64 {
        60
    }

    fn default_openai() -> ProviderConfig {
        ProviderConfig::new("gpt-4-turbo-preview", "https://api.openai.com/v1")
    }

    fn default_anthropic() -> ProviderConfig {
        ProviderConfig::new("claude-3-opus-20240229", "https://api.anthropic.com/v1")
    }

    fn default_google() -> ProviderConfig {
        ProviderConfig::new(
            "gemini-pro",
            "https://generativelanguage.googleapis.com/v1beta",
        )
    }

    fn default_deepseek() -> ProviderConfig {
        ProviderConfig::new("deepseek-chat", "https://api.deepseek.com/v1")
    }

    pub fn provider_config(&self, kind: AiProviderKind) -> &ProviderConfig {
        match kind {
            AiProviderKind::OpenAi => &self.openai,
            AiProviderKind::Anthropic => &self.anthropic,
            AiProviderKind::Google => &self.google,
            AiProviderKind::DeepSeek => &self.deepseek,
        }
    }

    pub fn provider_config_mut(&mut self, kind: AiProviderKind) -> &mut ProviderConfig {
        match kind {
            AiProviderKind::OpenAi => &mut self.openai,
            AiProviderKind::Anthropic => &mut self.anthropic,
            AiProviderKind::Google => &mut self.google,
            AiProviderKind::DeepSeek => &mut self.deepseek,
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: Self::default_provider(),
            max_tokens: Self::default_max_tokens(),
            temperature: Self::default_temperature(),
            request_timeout_seconds: Self::default_request_timeout(),
            openai: Self::default_openai(),
            anthropic: Self::default_anthropic(),
            google: Self::default_google(),
            deepseek: Self::default_deepseek(),
        }
    }
}

/// Branding and contact details rendered into the assistant's system prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportConfig {
    #[serde(default = "SupportConfig::default_company_name")]
    pub company_name: String,
    #[serde(default)]
    pub contact_email: Vec<String>,
    #[serde(default)]
    pub contact_phone: Vec<String>,
}

impl SupportConfig {
    fn default_company_name() -> String {
        "AI Support".to_string()
    }
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            company_name: Self::default_company_name(),
            contact_email: Vec::new(),
            contact_phone: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "UploadConfig::default_directory")]
    pub directory: String,
    #[serde(default = "UploadConfig::default_max_file_size")]
    pub max_file_size_bytes: u64,
    #[serde(default = "UploadConfig::default_max_files")]
    pub max_files: usize,
}

impl UploadConfig {
    fn default_directory() -> String {
        "uploads/documents".to_string()
    }

    const fn default_max_file_size() -> u64 {
        10 * 1024 * 1024
    }

    const fn default_max_files() -> usize {
        5
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            directory: Self::default_directory(),
            max_file_size_bytes: Self::default_max_file_size(),
            max_files: Self::default_max_files(),
        }
    }
}

/// Fixed-window limits applied per client address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "RateLimitConfig::default_window")]
    pub window_seconds: u64,
    #[serde(default = "RateLimitConfig::default_max")]
    pub max_requests: u32,
    #[serde(default = "RateLimitConfig::default_auth_window")]
    pub auth_window_seconds: u64,
    #[serde(default = "RateLimitConfig::default_auth_max")]
    pub auth_max_requests: u32,
    #[serde(default = "RateLimitConfig::default_chat_window")]
    pub chat_window_seconds: u64,
    #[serde(default = "RateLimitConfig::default_chat_max")]
    pub chat_max_requests: u32,
}

impl RateLimitConfig {
    const fn default_window() -> u64 {
        15 * 60
    }

    const fn default_max() -> u32 {
        100
    }

    const fn default_auth_window() -> u64 {
        60 * 60
    }

    const fn default_auth_max() -> u32 {
        10
    }

    const fn default_chat_window() -> u64 {
        60
    }

    const fn default_chat_max() -> u32 {
        20
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_seconds: Self::default_window(),
            max_requests: Self::default_max(),
            auth_window_seconds: Self::default_auth_window(),
            auth_max_requests: Self::default_auth_max(),
            chat_window_seconds: Self::default_chat_window(),
            chat_max_requests: Self::default_chat_max(),
        }
    }
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use supportdesk_config::load;
///
/// std::env::remove_var("SUPPORTDESK_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let mut builder = config::Config::builder()
        .set_default("http.address", defaults.http.address.clone())?
        .set_default("http.port", i64::from(defaults.http.port))?
        .set_default("http.environment", defaults.http.environment.clone())?
        .set_default("database.url", defaults.database.url.clone())?
        .set_default(
            "database.max_connections",
            i64::from(defaults.database.max_connections),
        )?;

    let environment_overrides = config::Environment::with_prefix("SUPPORTDESK")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("http.cors_origins")
        .with_list_parse_key("support.contact_email")
        .with_list_parse_key("support.contact_phone")
        .try_parsing(true);

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("SUPPORTDESK_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via SUPPORTDESK_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    config
        .ai
        .provider
        .parse::<AiProviderKind>()
        .map_err(anyhow::Error::msg)
        .context("invalid ai.provider")?;

    let problems = config.auth.secret_problems();
    if !problems.is_empty() {
        if config.http.is_production() {
            anyhow::bail!("insecure auth configuration: {}", problems.join("; "));
        }
        for problem in &problems {
            warn!(environment = %config.http.environment, "{problem}");
        }
    }

    debug!(
        environment = %config.http.environment,
        provider = %config.ai.provider,
        "loaded backend configuration"
    );
    Ok(config)
}
