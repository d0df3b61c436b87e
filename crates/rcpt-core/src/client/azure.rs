//! Azure OpenAI chat-completions client with schema-constrained output.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::ReceiptExtractor;
use crate::error::{Result, ServiceError};
use crate::models::config::{AzureSettings, RcptConfig};
use crate::models::receipt::{
    DEFAULT_SYSTEM_PROMPT, ExtractionRequest, ExtractionResult, RESULT_SCHEMA_NAME,
};

/// Client for a vision deployment on Azure OpenAI.
pub struct AzureOpenAiClient {
    http: reqwest::Client,
    settings: AzureSettings,
    system_prompt: String,
    max_tokens: u32,
    temperature: f64,
}

impl AzureOpenAiClient {
    /// Create a client around an existing HTTP client.
    pub fn new(settings: AzureSettings, http: reqwest::Client) -> Self {
        Self {
            http,
            settings,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: 2000,
            temperature: 0.7,
        }
    }

    /// Create a client with timeouts and request parameters from `config`.
    pub fn from_config(settings: AzureSettings, config: &RcptConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.service.timeout_secs))
            .connect_timeout(Duration::from_secs(config.service.connect_timeout_secs))
            .build()
            .map_err(ServiceError::from)?;

        Ok(Self::new(settings, http)
            .with_system_prompt(config.extraction.system_prompt.clone())
            .with_max_tokens(config.extraction.max_tokens)
            .with_temperature(config.extraction.temperature))
    }

    /// Set the system message.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Set the completion token ceiling.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    fn build_body<'a>(&'a self, request: &'a ExtractionRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.settings.deployment,
            messages: vec![
                ChatMessage::System {
                    content: &self.system_prompt,
                },
                ChatMessage::User {
                    content: vec![
                        ContentPart::Text {
                            text: &request.prompt_text,
                        },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl {
                                url: request.data_url(),
                            },
                        },
                    ],
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            response_format: ResponseFormat {
                kind: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: RESULT_SCHEMA_NAME,
                    strict: true,
                    schema: ExtractionResult::json_schema(),
                },
            },
        }
    }
}

#[async_trait]
impl ReceiptExtractor for AzureOpenAiClient {
    async fn extract(
        &self,
        request: &ExtractionRequest,
    ) -> std::result::Result<ExtractionResult, ServiceError> {
        let url = self.settings.chat_completions_url();
        info!("Requesting extraction from deployment {}", self.settings.deployment);

        let response = self
            .http
            .post(&url)
            .header("api-key", &self.settings.api_key)
            .json(&self.build_body(request))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(ServiceError::InvalidContent)?;
        parse_completion(parsed)
    }
}

/// Pull the structured result out of the first choice.
fn parse_completion(response: ChatResponse) -> std::result::Result<ExtractionResult, ServiceError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or(ServiceError::EmptyResponse)?;

    if let Some(refusal) = choice.message.refusal {
        return Err(ServiceError::Refusal(refusal));
    }
    if choice.finish_reason.as_deref() == Some("length") {
        return Err(ServiceError::Truncated);
    }

    let content = choice
        .message
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or(ServiceError::EmptyResponse)?;

    debug!("Received {} bytes of structured content", content.len());

    serde_json::from_str(&content).map_err(ServiceError::InvalidContent)
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
enum ChatMessage<'a> {
    System { content: &'a str },
    User { content: Vec<ContentPart<'a>> },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: JsonSchemaFormat,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat {
    name: &'static str,
    strict: bool,
    schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::ServiceConfig;
    use pretty_assertions::assert_eq;

    fn settings() -> AzureSettings {
        AzureSettings::resolve(&ServiceConfig::default(), |key| match key {
            "AOAI_ENDPOINT" => Some("https://example.openai.azure.com".to_string()),
            "AOAI_API_KEY" => Some("key".to_string()),
            "AOAI_DEPLOYMENT" => Some("gpt-4o".to_string()),
            _ => None,
        })
        .unwrap()
    }

    fn completion(message: serde_json::Value, finish_reason: &str) -> ChatResponse {
        serde_json::from_value(serde_json::json!({
            "choices": [{ "index": 0, "message": message, "finish_reason": finish_reason }]
        }))
        .unwrap()
    }

    #[test]
    fn test_request_body_shape() {
        let client = AzureOpenAiClient::new(settings(), reqwest::Client::new());
        let request = ExtractionRequest::new("Who sold this?", b"abc".to_vec(), "image/png");

        let body = serde_json::to_value(client.build_body(&request)).unwrap();

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 2000);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], DEFAULT_SYSTEM_PROMPT);
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(
            body["messages"][1]["content"],
            serde_json::json!([
                { "type": "text", "text": "Who sold this?" },
                { "type": "image_url", "image_url": { "url": "data:image/png;base64,YWJj" } }
            ])
        );
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["name"], "ExtractedAnswers");
        assert_eq!(body["response_format"]["json_schema"]["strict"], true);
        assert_eq!(
            body["response_format"]["json_schema"]["schema"],
            ExtractionResult::json_schema()
        );
    }

    #[test]
    fn test_request_parameters_are_configurable() {
        let client = AzureOpenAiClient::new(settings(), reqwest::Client::new())
            .with_max_tokens(500)
            .with_temperature(0.0)
            .with_system_prompt("Read receipts.");
        let request = ExtractionRequest::new("p", Vec::new(), "image/gif");

        let body = serde_json::to_value(client.build_body(&request)).unwrap();

        assert_eq!(body["max_tokens"], 500);
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["messages"][0]["content"], "Read receipts.");
    }

    #[test]
    fn test_parse_completion_success() {
        let content = r#"{"businessName":"Kiosk","businessAddress":"Main St 1","transactionDate":"2024-01-02","totalCharge":"3.50 USD"}"#;
        let response = completion(
            serde_json::json!({ "role": "assistant", "content": content, "refusal": null }),
            "stop",
        );

        let result = parse_completion(response).unwrap();
        assert_eq!(result.business_name, "Kiosk");
        assert_eq!(result.total_charge, "3.50 USD");
    }

    #[test]
    fn test_parse_completion_refusal() {
        let response = completion(
            serde_json::json!({ "role": "assistant", "content": null, "refusal": "I can't help." }),
            "stop",
        );
        assert!(matches!(
            parse_completion(response),
            Err(ServiceError::Refusal(msg)) if msg == "I can't help."
        ));
    }

    #[test]
    fn test_parse_completion_truncated() {
        let response = completion(
            serde_json::json!({ "role": "assistant", "content": "{\"businessName\":\"K" }),
            "length",
        );
        assert!(matches!(parse_completion(response), Err(ServiceError::Truncated)));
    }

    #[test]
    fn test_parse_completion_empty() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(parse_completion(response), Err(ServiceError::EmptyResponse)));
    }

    #[test]
    fn test_parse_completion_schema_mismatch() {
        let response = completion(
            serde_json::json!({ "role": "assistant", "content": "{\"businessName\": 42}" }),
            "stop",
        );
        assert!(matches!(
            parse_completion(response),
            Err(ServiceError::InvalidContent(_))
        ));
    }
}
