use super::{ExtractionError, Extractor};
use crate::core::config::ExtractionSettings;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const SYSTEM_PROMPT: &str =
    "You are a helpful transformer of messy user data into clean structured values.";

/// Chat-completions client for the `llm` step.
#[derive(Clone)]
pub struct OpenAiExtractor {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f32,
}

impl OpenAiExtractor {
    pub fn new(settings: &ExtractionSettings, api_key: String) -> Result<Self, ExtractionError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()?;
        Ok(OpenAiExtractor {
            http,
            endpoint: format!(
                "{}/chat/completions",
                settings.base_url.trim_end_matches('/')
            ),
            model: settings.model.clone(),
            api_key,
            temperature: settings.temperature,
        })
    }

    fn user_prompt(field: &str, raw: &Value) -> String {
        let raw = match raw {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        format!(
            "Extract and format the following \"{field}\" appropriately from the input: \"{raw}\".\nOnly return the transformed value."
        )
    }
}

#[async_trait]
impl Extractor for OpenAiExtractor {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn extract(&self, field: &str, raw: &Value) -> Result<Value, ExtractionError> {
        let user_prompt = Self::user_prompt(field, raw);
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user_prompt,
                },
            ],
            temperature: self.temperature,
        };

        tracing::debug!(field, model = %self.model, "requesting extraction");
        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_else(|_| "".to_string());
            return Err(ExtractionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: ChatResponse = resp.json().await?;
        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or(ExtractionError::EmptyResponse)?;
        let content = choice.message.content.unwrap_or_default();
        Ok(Value::String(content.trim().to_string()))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}
