//! Test plan for the `supportdesk-config` crate.
//!
//! These tests exercise the configuration loader across default handling,
//! file discovery, environment overrides, and validation behaviour.

use std::fs;
use std::path::{Path, PathBuf};

use serial_test::serial;
use tempfile::TempDir;

use supportdesk_config::{
    load, AiConfig, AiProviderKind, AppConfig, AuthConfig, HttpConfig, RateLimitConfig,
    UploadConfig,
};

const ENV_VARS_TO_RESET: &[&str] = &[
    "SUPPORTDESK_CONFIG",
    "SUPPORTDESK__AI__PROVIDER",
    "SUPPORTDESK__AI__OPENAI__API_KEY",
    "SUPPORTDESK__AI__ANTHROPIC__API_KEY",
    "SUPPORTDESK__AI__GOOGLE__API_KEY",
    "SUPPORTDESK__AI__DEEPSEEK__API_KEY",
    "SUPPORTDESK__AUTH__JWT_SECRET",
    "SUPPORTDESK__AUTH__JWT_REFRESH_SECRET",
    "SUPPORTDESK__DATABASE__MAX_CONNECTIONS",
    "SUPPORTDESK__DATABASE__URL",
    "SUPPORTDESK__HTTP__ADDRESS",
    "SUPPORTDESK__HTTP__PORT",
    "SUPPORTDESK__HTTP__ENVIRONMENT",
    "SUPPORTDESK__SUPPORT__COMPANY_NAME",
    "SUPPORTDESK__SUPPORT__CONTACT_EMAIL",
];

struct TestContext {
    vars: Vec<(String, Option<String>)>,
    original_dir: Option<PathBuf>,
}

impl TestContext {
    fn new() -> Self {
        Self {
            vars: Vec::new(),
            original_dir: None,
        }
    }

    fn reset_environment(&mut self) {
        for key in ENV_VARS_TO_RESET {
            self.remove_var(key);
        }
    }

    fn set_var(&mut self, key: &str, value: impl AsRef<str>) {
        let previous = std::env::var(key).ok();
        std::env::set_var(key, value.as_ref());
        self.vars.push((key.to_string(), previous));
    }

    fn remove_var(&mut self, key: &str) {
        let previous = std::env::var(key).ok();
        std::env::remove_var(key);
        self.vars.push((key.to_string(), previous));
    }

    fn set_current_dir(&mut self, dir: &Path) {
        if self.original_dir.is_none() {
            self.original_dir =
                Some(std::env::current_dir().expect("failed to capture current directory"));
        }
        std::env::set_current_dir(dir).expect("failed to set current directory");
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if let Some(original) = self.original_dir.take() {
            let _ = std::env::set_current_dir(original);
        }

        while let Some((key, value)) = self.vars.pop() {
            match value {
                Some(val) => std::env::set_var(&key, val),
                None => std::env::remove_var(&key),
            }
        }
    }
}

fn write_config_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create config directories");
    }
    fs::write(path, contents).expect("failed to write config file");
}

fn isolated() -> (TempDir, TestContext) {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());
    (temp_dir, ctx)
}

#[test]
#[serial]
fn load_uses_default_values_when_no_files_found() {
    let (_temp_dir, _ctx) = isolated();

    let config = load().expect("configuration load should succeed without files");
    let defaults = AppConfig::default();

    assert_eq!(config.http.address, defaults.http.address);
    assert_eq!(config.http.port, defaults.http.port);
    assert_eq!(config.database.url, defaults.database.url);
    assert_eq!(config.ai.provider, "openai");
    assert_eq!(config.ai.openai.model, "gpt-4-turbo-preview");
    assert!(config.ai.openai.api_key.is_none());
    assert_eq!(config.support.company_name, "AI Support");
    assert_eq!(config.uploads.max_files, 5);
    assert_eq!(config.rate_limit.max_requests, 100);
}

#[test]
#[serial]
fn load_picks_first_available_file_in_search_order() {
    let (temp_dir, _ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "supportdesk.toml",
        r#"
        [http]
        port = 4242
        "#,
    );
    write_config_file(
        temp_dir.path(),
        "config/supportdesk.toml",
        r#"
        [http]
        port = 5151
        "#,
    );

    let config = load().expect("configuration load should pick the first file");
    assert_eq!(config.http.port, 4242);
}

#[test]
#[serial]
fn load_merges_partial_file_with_defaults() {
    let (temp_dir, _ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "supportdesk.toml",
        r#"
        [http]
        port = 8181

        [ai]
        provider = "anthropic"

        [ai.anthropic]
        api_key = "sk-ant"
        model = "claude-3-haiku-20240307"
        base_url = "https://api.anthropic.com/v1"

        [support]
        company_name = "Acme"
        contact_email = ["help@acme.test"]
        "#,
    );

    let config = load().expect("configuration load should succeed");
    let defaults = AppConfig::default();

    assert_eq!(config.http.port, 8181);
    assert_eq!(config.http.address, defaults.http.address);
    assert_eq!(config.ai.provider, "anthropic");
    assert_eq!(config.ai.anthropic.api_key(), Some("sk-ant"));
    assert_eq!(config.ai.anthropic.model, "claude-3-haiku-20240307");
    assert_eq!(config.ai.openai.model, defaults.ai.openai.model);
    assert_eq!(config.support.company_name, "Acme");
    assert_eq!(config.support.contact_email, vec!["help@acme.test"]);
    assert_eq!(config.uploads.directory, defaults.uploads.directory);
}

#[test]
#[serial]
fn load_applies_environment_overrides() {
    let (temp_dir, mut ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "supportdesk.toml",
        r#"
        [http]
        port = 3030
        "#,
    );

    ctx.set_var("SUPPORTDESK__HTTP__PORT", "8080");
    ctx.set_var("SUPPORTDESK__AI__OPENAI__API_KEY", "sk-test-key");
    ctx.set_var(
        "SUPPORTDESK__SUPPORT__CONTACT_EMAIL",
        "one@example.com,two@example.com",
    );

    let config = load().expect("configuration load should honour env overrides");
    assert_eq!(config.http.port, 8080);
    assert_eq!(config.ai.openai.api_key(), Some("sk-test-key"));
    assert_eq!(
        config.support.contact_email,
        vec!["one@example.com", "two@example.com"]
    );
}

#[test]
#[serial]
fn load_reads_explicit_config_path() {
    let (temp_dir, mut ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "elsewhere/custom.toml",
        r#"
        [database]
        url = "sqlite://custom.db"
        max_connections = 3
        "#,
    );
    let path = temp_dir.path().join("elsewhere/custom.toml");
    ctx.set_var("SUPPORTDESK_CONFIG", path.display().to_string());

    let config = load().expect("explicit config file should load");
    assert_eq!(config.database.url, "sqlite://custom.db");
    assert_eq!(config.database.max_connections, 3);
}

#[test]
#[serial]
fn load_rejects_unknown_ai_provider() {
    let (_temp_dir, mut ctx) = isolated();
    ctx.set_var("SUPPORTDESK__AI__PROVIDER", "watson");

    let error = load().expect_err("unknown provider should fail");
    assert!(error.to_string().contains("invalid ai.provider"));
}

#[test]
#[serial]
fn load_errors_on_invalid_toml_contents() {
    let (temp_dir, _ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "supportdesk.toml",
        r#"
        [http]
        port = "not-a-number
        "#,
    );

    let error = load().expect_err("invalid TOML should cause load to fail");
    let message = error.to_string();
    assert!(
        message.contains("invalid configuration")
            || message.contains("unable to build configuration"),
        "unexpected error message: {message}"
    );
}

#[test]
#[serial]
fn load_refuses_default_secrets_in_production() {
    let (_temp_dir, mut ctx) = isolated();
    ctx.set_var("SUPPORTDESK__HTTP__ENVIRONMENT", "production");

    let error = load().expect_err("default secrets must not load in production");
    let message = format!("{error:#}");
    assert!(message.contains("auth.jwt_secret"), "unexpected error: {message}");
    assert!(message.contains("auth.jwt_refresh_secret"), "unexpected error: {message}");
}

#[test]
#[serial]
fn load_refuses_short_secrets_in_production() {
    let (_temp_dir, mut ctx) = isolated();
    ctx.set_var("SUPPORTDESK__HTTP__ENVIRONMENT", "production");
    ctx.set_var("SUPPORTDESK__AUTH__JWT_SECRET", "too-short");
    ctx.set_var(
        "SUPPORTDESK__AUTH__JWT_REFRESH_SECRET",
        "a-refresh-secret-that-is-long-enough-0123456789",
    );

    let error = load().expect_err("short secret must not load in production");
    let message = format!("{error:#}");
    assert!(message.contains("shorter than 32 bytes"), "unexpected error: {message}");
    assert!(!message.contains("auth.jwt_refresh_secret"), "unexpected error: {message}");
}

#[test]
#[serial]
fn load_accepts_strong_secrets_in_production() {
    let (_temp_dir, mut ctx) = isolated();
    ctx.set_var("SUPPORTDESK__HTTP__ENVIRONMENT", "production");
    ctx.set_var(
        "SUPPORTDESK__AUTH__JWT_SECRET",
        "an-access-secret-that-is-long-enough-0123456789",
    );
    ctx.set_var(
        "SUPPORTDESK__AUTH__JWT_REFRESH_SECRET",
        "a-refresh-secret-that-is-long-enough-0123456789",
    );

    let config = load().expect("strong secrets should load in production");
    assert!(config.http.is_production());
    assert!(config.auth.secret_problems().is_empty());
}

#[test]
#[serial]
fn load_keeps_default_secrets_outside_production() {
    let (_temp_dir, _ctx) = isolated();

    let config = load().expect("development accepts default secrets with a warning");
    assert!(!config.http.is_production());
    assert_eq!(config.auth.secret_problems().len(), 2);
}

#[test]
fn default_auth_config_reports_both_secrets() {
    let problems = AuthConfig::default().secret_problems();
    assert_eq!(problems.len(), 2);
    assert!(problems.iter().all(|p| p.contains("development default")));
}

#[test]
fn provider_kind_parses_case_insensitively() {
    assert_eq!("OpenAI".parse::<AiProviderKind>(), Ok(AiProviderKind::OpenAi));
    assert_eq!("gemini".parse::<AiProviderKind>(), Ok(AiProviderKind::Google));
    assert_eq!(" deepseek ".parse::<AiProviderKind>(), Ok(AiProviderKind::DeepSeek));
    assert!("".parse::<AiProviderKind>().is_err());
}

#[test]
fn blank_api_keys_count_as_missing() {
    let mut ai = AiConfig::default();
    ai.google.api_key = Some("   ".into());
    assert!(ai.provider_config(AiProviderKind::Google).api_key().is_none());
}

#[test]
fn defaults_match_documented_limits() {
    let http = HttpConfig::default();
    assert_eq!(http.address, "127.0.0.1");
    assert_eq!(http.port, 5000);

    let uploads = UploadConfig::default();
    assert_eq!(uploads.max_file_size_bytes, 10 * 1024 * 1024);

    let limits = RateLimitConfig::default();
    assert_eq!((limits.window_seconds, limits.max_requests), (900, 100));
    assert_eq!((limits.auth_window_seconds, limits.auth_max_requests), (3600, 10));
    assert_eq!((limits.chat_window_seconds, limits.chat_max_requests), (60, 20));
}
