//! HTTP oracle for OpenAI-compatible chat-completion endpoints (Groq by default).

use std::time::Duration;

use async_trait::async_trait;
use gapcheck_core::Tier;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::oracle::{GenerateRequest, Generation, Oracle, OracleError};

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_FAST_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_REASONING_MODEL: &str = "llama-3.3-70b-versatile";

/// Connection settings and the model served at each tier.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Endpoint root, e.g. `https://api.groq.com/openai/v1`.
    pub base_url: String,
    pub api_key: Option<String>,
    pub fast_model: String,
    pub reasoning_model: String,
    pub timeout: Duration,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            fast_model: DEFAULT_FAST_MODEL.to_string(),
            reasoning_model: DEFAULT_REASONING_MODEL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl OracleConfig {
    pub fn model_for(&self, tier: Tier) -> &str {
        match tier {
            Tier::Fast => &self.fast_model,
            Tier::Reasoning => &self.reasoning_model,
        }
    }
}

/// Oracle backed by a `/chat/completions` endpoint.
pub struct HttpOracle {
    client: reqwest::Client,
    config: OracleConfig,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    total_tokens: u32,
}

impl HttpOracle {
    /// Create an oracle client. A trailing slash on `base_url` is ignored.
    pub fn new(mut config: OracleConfig) -> Result<Self, OracleError> {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    fn chat_request<'a>(&'a self, tier: Tier, request: &'a GenerateRequest) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.user_prompt,
        });
        ChatRequest {
            model: self.config.model_for(tier),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

#[async_trait]
impl Oracle for HttpOracle {
    async fn generate(
        &self,
        tier: Tier,
        request: &GenerateRequest,
    ) -> Result<Generation, OracleError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let body = self.chat_request(tier, request);

        debug!(url = %url, model = body.model, tier = tier.as_str(), "oracle request");
        let mut req = self.client.post(&url).json(&body);
        if let Some(key) = &self.config.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OracleError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = resp.json().await?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or(OracleError::EmptyResponse)?;
        let tokens_used = parsed.usage.map(|u| u.total_tokens).unwrap_or(0);

        info!(tier = tier.as_str(), tokens_used, "oracle response received");
        Ok(Generation { text, tokens_used })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slash() {
        let oracle = HttpOracle::new(OracleConfig {
            base_url: "http://localhost:8080/v1/".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(oracle.config().base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn tiers_map_to_models() {
        let config = OracleConfig::default();
        assert_eq!(config.model_for(Tier::Fast), DEFAULT_FAST_MODEL);
        assert_eq!(config.model_for(Tier::Reasoning), DEFAULT_REASONING_MODEL);
    }

    #[test]
    fn chat_request_shape() {
        let oracle = HttpOracle::new(OracleConfig::default()).unwrap();
        let request = GenerateRequest::new("Compare these.").with_system_prompt("Be strict.");
        let body = serde_json::to_value(oracle.chat_request(Tier::Reasoning, &request)).unwrap();
        assert_eq!(body["model"], DEFAULT_REASONING_MODEL);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Compare these.");
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["max_tokens"], 2048);
    }

    #[test]
    fn response_without_usage_parses() {
        let json = r#"{"choices": [{"message": {"role": "assistant", "content": "[]"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.usage.is_none());
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("[]"));
    }
}
