use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum LlmProvider {
    #[default]
    Deepseek,
    Openai,
    Openrouter,
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProvider::Deepseek => write!(f, "deepseek"),
            LlmProvider::Openai => write!(f, "openai"),
            LlmProvider::Openrouter => write!(f, "openrouter"),
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deepseek" => Ok(LlmProvider::Deepseek),
            "openai" => Ok(LlmProvider::Openai),
            "openrouter" => Ok(LlmProvider::Openrouter),
            other => anyhow::bail!("Unknown LLM provider: {}", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub base_url: String,
    pub api_key: String,
    pub max_tokens: Option<u32>,
    pub system_prompt: String,
}

impl LlmConfig {
    /// Returns the effective base_url: if the stored value is empty,
    /// fall back to the canonical URL for the configured provider.
    pub fn effective_base_url(&self) -> &str {
        if !self.base_url.is_empty() {
            return self.base_url.trim_end_matches('/');
        }
        match self.provider {
            LlmProvider::Deepseek => "https://api.deepseek.com/v1",
            LlmProvider::Openai => "https://api.openai.com/v1",
            LlmProvider::Openrouter => "https://openrouter.ai/api/v1",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Only messages from this chat are turned into posts.
    pub chat_id: String,
    pub fetch_limit: u8,
}

#[derive(Debug, Clone)]
pub struct WordPressConfig {
    /// Site root without trailing slash.
    pub base_url: String,
    pub username: String,
    pub application_password: String,
    pub post_status: String,
}

#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub cron: String,
}

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub listen: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub llm: LlmConfig,
    pub wordpress: WordPressConfig,
    pub schedule: ScheduleConfig,
    pub webhook: WebhookConfig,
}

// ── Raw TOML parse structs: every field optional, env fills the gaps ──

#[derive(Deserialize, Default, Debug)]
struct RawConfig {
    #[serde(default)]
    telegram: RawTelegram,
    #[serde(default)]
    llm: RawLlm,
    #[serde(default)]
    wordpress: RawWordPress,
    #[serde(default)]
    schedule: RawSchedule,
    #[serde(default)]
    webhook: RawWebhook,
}

#[derive(Deserialize, Default, Debug)]
struct RawTelegram {
    bot_token: Option<String>,
    chat_id: Option<toml::Value>,
    fetch_limit: Option<i64>,
}

#[derive(Deserialize, Default, Debug)]
struct RawLlm {
    provider: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    max_tokens: Option<u32>,
    system_prompt: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
struct RawWordPress {
    base_url: Option<String>,
    username: Option<String>,
    application_password: Option<String>,
    post_status: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
struct RawSchedule {
    cron: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
struct RawWebhook {
    listen: Option<String>,
}

const DEFAULT_FETCH_LIMIT: i64 = 50;

fn default_model() -> String {
    "deepseek-chat".to_string()
}

fn default_system_prompt() -> String {
    "You are a helpful assistant that rewrites Telegram group discussions into publishable blog posts."
        .to_string()
}

fn default_post_status() -> String {
    "draft".to_string()
}

fn default_cron() -> String {
    "0 */5 * * * *".to_string()
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => anyhow::bail!("Configuration value {} is required", name),
    }
}

fn or_default(value: Option<String>, default: fn() -> String) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(default)
}

fn validate_fetch_limit(limit: i64) -> Result<u8> {
    if !(1..=100).contains(&limit) {
        anyhow::bail!("TELEGRAM_FETCH_LIMIT must be between 1 and 100 (got {})", limit);
    }
    Ok(limit as u8)
}

impl RawConfig {
    /// Environment variables win over values from the file.
    fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |slot: &mut Option<String>, key: &str| {
            if let Some(v) = lookup(key) {
                *slot = Some(v);
            }
        };

        set(&mut self.telegram.bot_token, "TELEGRAM_BOT_TOKEN");
        if let Some(v) = lookup("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = Some(toml::Value::String(v));
        }
        if let Some(v) = lookup("TELEGRAM_FETCH_LIMIT") {
            let limit = v
                .trim()
                .parse::<i64>()
                .context("TELEGRAM_FETCH_LIMIT must be a valid integer")?;
            self.telegram.fetch_limit = Some(limit);
        }

        set(&mut self.llm.provider, "LLM_PROVIDER");
        set(&mut self.llm.api_key, "LLM_API_KEY");
        set(&mut self.llm.model, "LLM_MODEL");
        set(&mut self.llm.system_prompt, "LLM_SYSTEM_PROMPT");
        set(&mut self.llm.base_url, "LLM_BASE_URL");

        set(&mut self.wordpress.base_url, "WORDPRESS_BASE_URL");
        set(&mut self.wordpress.username, "WORDPRESS_USERNAME");
        set(
            &mut self.wordpress.application_password,
            "WORDPRESS_APPLICATION_PASSWORD",
        );
        set(&mut self.wordpress.post_status, "WORDPRESS_POST_STATUS");

        set(&mut self.schedule.cron, "SCHEDULE_CRON");
        set(&mut self.webhook.listen, "WEBHOOK_LISTEN");

        Ok(())
    }

    fn validate(self) -> Result<Config> {
        // TOML allows the chat id as a bare integer or a quoted string.
        let chat_id = match self.telegram.chat_id {
            Some(toml::Value::Integer(id)) => Some(id.to_string()),
            Some(toml::Value::String(id)) => Some(id),
            Some(other) => anyhow::bail!("telegram.chat_id must be a string or integer, got {}", other),
            None => None,
        };

        let provider = match self.llm.provider {
            Some(p) if !p.trim().is_empty() => p.parse()?,
            _ => LlmProvider::default(),
        };

        let base_url = required(self.wordpress.base_url, "WORDPRESS_BASE_URL")?
            .trim_end_matches('/')
            .to_string();

        Ok(Config {
            telegram: TelegramConfig {
                bot_token: required(self.telegram.bot_token, "TELEGRAM_BOT_TOKEN")?,
                chat_id: required(chat_id, "TELEGRAM_CHAT_ID")?,
                fetch_limit: validate_fetch_limit(
                    self.telegram.fetch_limit.unwrap_or(DEFAULT_FETCH_LIMIT),
                )?,
            },
            llm: LlmConfig {
                provider,
                api_key: required(self.llm.api_key, "LLM_API_KEY")?,
                model: or_default(self.llm.model, default_model),
                base_url: self.llm.base_url.unwrap_or_default().trim().to_string(),
                max_tokens: self.llm.max_tokens,
                system_prompt: or_default(self.llm.system_prompt, default_system_prompt),
            },
            wordpress: WordPressConfig {
                base_url,
                username: required(self.wordpress.username, "WORDPRESS_USERNAME")?,
                application_password: required(
                    self.wordpress.application_password,
                    "WORDPRESS_APPLICATION_PASSWORD",
                )?,
                post_status: or_default(self.wordpress.post_status, default_post_status),
            },
            schedule: ScheduleConfig {
                cron: or_default(self.schedule.cron, default_cron),
            },
            webhook: WebhookConfig {
                listen: or_default(self.webhook.listen, default_listen),
            },
        })
    }
}

impl Config {
    /// Load `path` if it exists, overlay the process environment and validate.
    pub fn load(path: &Path) -> Result<Self> {
        let content = if path.exists() {
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?
        } else {
            String::new()
        };

        Self::from_sources(&content, |key| std::env::var(key).ok())
            .with_context(|| format!("Invalid configuration ({})", path.display()))
    }

    fn from_sources<F>(toml_content: &str, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut raw: RawConfig =
            toml::from_str(toml_content).context("Failed to parse config file")?;
        raw.apply_env(env)?;
        raw.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const FULL: &str = r#"
[telegram]
bot_token = "123:ABC"
chat_id = -100123456
fetch_limit = 20

[llm]
provider = "openai"
api_key = "sk-test"
model = "gpt-4o-mini"

[wordpress]
base_url = "https://blog.example.com/"
username = "tester"
application_password = "app-password"
"#;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn full_env() -> Vec<(&'static str, &'static str)> {
        vec![
            ("TELEGRAM_BOT_TOKEN", "123:ABC"),
            ("TELEGRAM_CHAT_ID", "-100123456"),
            ("LLM_API_KEY", "test-key"),
            ("WORDPRESS_BASE_URL", "https://example.com"),
            ("WORDPRESS_USERNAME", "tester"),
            ("WORDPRESS_APPLICATION_PASSWORD", "app-password"),
        ]
    }

    #[test]
    fn test_load_from_toml() {
        let config = Config::from_sources(FULL, no_env).unwrap();
        assert_eq!(config.telegram.chat_id, "-100123456");
        assert_eq!(config.telegram.fetch_limit, 20);
        assert_eq!(config.llm.provider, LlmProvider::Openai);
        assert_eq!(config.llm.effective_base_url(), "https://api.openai.com/v1");
        assert_eq!(config.wordpress.base_url, "https://blog.example.com");
        assert_eq!(config.wordpress.post_status, "draft");
        assert_eq!(config.schedule.cron, "0 */5 * * * *");
    }

    #[test]
    fn test_env_only_uses_defaults() {
        let config = Config::from_sources("", env_of(&full_env())).unwrap();
        assert_eq!(config.telegram.fetch_limit, 50);
        assert_eq!(config.llm.provider, LlmProvider::Deepseek);
        assert_eq!(config.llm.model, "deepseek-chat");
        assert_eq!(config.llm.effective_base_url(), "https://api.deepseek.com/v1");
        assert!(config.llm.system_prompt.contains("blog posts"));
        assert_eq!(config.webhook.listen, "0.0.0.0:8080");
    }

    #[test]
    fn test_env_overrides_file() {
        let config = Config::from_sources(
            FULL,
            env_of(&[
                ("TELEGRAM_CHAT_ID", "@channel"),
                ("WORDPRESS_POST_STATUS", "publish"),
                ("TELEGRAM_FETCH_LIMIT", "100"),
            ]),
        )
        .unwrap();
        assert_eq!(config.telegram.chat_id, "@channel");
        assert_eq!(config.wordpress.post_status, "publish");
        assert_eq!(config.telegram.fetch_limit, 100);
    }

    #[test]
    fn test_missing_required_value() {
        let mut env = full_env();
        env.retain(|(k, _)| *k != "WORDPRESS_USERNAME");
        let err = Config::from_sources("", env_of(&env)).unwrap_err();
        assert!(format!("{:#}", err).contains("WORDPRESS_USERNAME is required"));
    }

    #[test]
    fn test_blank_required_value() {
        let env: Vec<_> = full_env()
            .into_iter()
            .map(|(k, v)| if k == "LLM_API_KEY" { (k, "   ") } else { (k, v) })
            .collect();
        let err = Config::from_sources("", env_of(&env)).unwrap_err();
        assert!(format!("{:#}", err).contains("LLM_API_KEY is required"));
    }

    #[test]
    fn test_fetch_limit_not_integer() {
        let mut env = full_env();
        env.push(("TELEGRAM_FETCH_LIMIT", "fifty"));
        let err = Config::from_sources("", env_of(&env)).unwrap_err();
        assert!(format!("{:#}", err).contains("must be a valid integer"));
    }

    #[test]
    fn test_fetch_limit_out_of_range() {
        for bad in ["0", "101", "-5"] {
            let mut env = full_env();
            env.push(("TELEGRAM_FETCH_LIMIT", bad));
            let err = Config::from_sources("", env_of(&env)).unwrap_err();
            assert!(format!("{:#}", err).contains("between 1 and 100"));
        }
    }

    #[test]
    fn test_unknown_provider() {
        let mut env = full_env();
        env.push(("LLM_PROVIDER", "anthropic"));
        let err = Config::from_sources("", env_of(&env)).unwrap_err();
        assert!(format!("{:#}", err).contains("Unknown LLM provider"));
    }

    #[test]
    fn test_provider_name_is_case_insensitive() {
        let mut env = full_env();
        env.push(("LLM_PROVIDER", " OpenAI "));
        let config = Config::from_sources("", env_of(&env)).unwrap();
        assert_eq!(config.llm.provider, LlmProvider::Openai);
        assert_eq!(config.llm.effective_base_url(), "https://api.openai.com/v1");
    }

    #[test]
    fn test_custom_base_url_wins() {
        let mut env = full_env();
        env.push(("LLM_BASE_URL", "http://localhost:11434/v1/"));
        let config = Config::from_sources("", env_of(&env)).unwrap();
        assert_eq!(config.llm.effective_base_url(), "http://localhost:11434/v1");
    }
}
