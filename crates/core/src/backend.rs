use crate::error::GenerationError;
use crate::models::SamplingParams;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub system_instruction: String,
    pub user_message: String,
    pub sampling: SamplingParams,
}

/// A synchronous text-generation service: one request, one completion.
pub trait GenerationBackend {
    fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

impl<B: GenerationBackend + ?Sized> GenerationBackend for &B {
    fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        (**self).complete(request)
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChatEndpointConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for ChatEndpointConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Chat-completions client for OpenAI-compatible endpoints.
pub struct OpenAiChatBackend {
    endpoint: Url,
    api_key: Option<String>,
    client: Client,
}

impl OpenAiChatBackend {
    pub fn new(config: ChatEndpointConfig) -> Result<Self, GenerationError> {
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let endpoint = Url::parse(&base)?.join("chat/completions")?;

        let api_key = config
            .api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            endpoint,
            api_key,
            client,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl GenerationBackend for OpenAiChatBackend {
    fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let payload = chat_payload(request);

        let mut http_request = self
            .client
            .post(self.endpoint.clone())
            .header("content-type", "application/json")
            .json(&payload);

        if let Some(api_key) = &self.api_key {
            http_request = http_request.bearer_auth(api_key);
        }

        let response = http_request.send()?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(GenerationError::BackendResponse {
                backend: self.endpoint.to_string(),
                details: format!("{status}: {}", body.chars().take(200).collect::<String>()),
            });
        }

        let body = response.text()?;
        parse_completion(&body)
    }
}

fn chat_payload(request: &GenerationRequest) -> ChatCompletionRequest<'_> {
    ChatCompletionRequest {
        model: &request.model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: &request.system_instruction,
            },
            ChatMessage {
                role: "user",
                content: &request.user_message,
            },
        ],
        temperature: request.sampling.temperature,
        top_p: request.sampling.top_p,
        frequency_penalty: request.sampling.frequency_penalty,
        presence_penalty: request.sampling.presence_penalty,
    }
}

fn parse_completion(body: &str) -> Result<String, GenerationError> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body)?;
    completion_text(parsed)
}

fn completion_text(response: ChatCompletionResponse) -> Result<String, GenerationError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .ok_or_else(|| {
            GenerationError::MalformedResponse("response has no choices[0].message.content".to_string())
        })
}
