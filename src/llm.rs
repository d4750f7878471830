use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LlmConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ChatMessage {
    fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChatMessage>,
}

/// Chat-completions client that rewrites a chat message into an article.
pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub async fn generate_post(&self, prompt: &str) -> Result<String> {
        let provider = &self.config.provider;
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage::new("system", &self.config.system_prompt),
                ChatMessage::new("user", prompt),
            ],
            max_tokens: self.config.max_tokens,
        };

        let url = format!("{}/chat/completions", self.config.effective_base_url());

        debug!("Sending request to {}: {}", provider, url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", provider))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("{} request failed with status {}: {}", provider, status, error_body);
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", provider))?;

        first_content(chat_response)
            .with_context(|| format!("{} response did not include any content", provider))
    }
}

fn first_content(response: ChatResponse) -> Option<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> ChatResponse {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn test_first_content_trims() {
        let response = parse(
            r#"{"choices":[{"message":{"role":"assistant","content":"  <p>Post</p>\n"}}]}"#,
        );
        assert_eq!(first_content(response).as_deref(), Some("<p>Post</p>"));
    }

    #[test]
    fn test_first_content_empty_is_none() {
        assert!(first_content(parse(r#"{"choices":[]}"#)).is_none());
        assert!(first_content(parse(r#"{}"#)).is_none());
        assert!(first_content(parse(r#"{"choices":[{}]}"#)).is_none());
        assert!(first_content(parse(
            r#"{"choices":[{"message":{"role":"assistant","content":"   "}}]}"#
        ))
        .is_none());
    }

    #[test]
    fn test_request_omits_unset_max_tokens() {
        let request = ChatRequest {
            model: "deepseek-chat".to_string(),
            messages: vec![ChatMessage::new("user", "hi")],
            max_tokens: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("max_tokens").is_none());
        assert_eq!(value["messages"][0]["content"], "hi");
    }
}
