/*!
 * Ollama client.
 *
 * Talks to a local Ollama server through its non-streaming chat endpoint
 * and asks for JSON output, which keeps small local models on the id-tagged
 * reply format.
 */

use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::ProviderError;
use crate::providers::CompletionClient;

/// Ollama client for interacting with Ollama API
#[derive(Debug)]
pub struct Ollama {
    /// Base URL of the Ollama API
    base_url: Url,
    /// HTTP client for making requests
    client: Client,
    /// Model name to use for generation
    model: String,
    /// Sampling temperature
    temperature: Option<f32>,
}

/// Chat message object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user or assistant)
    pub role: String,
    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Generation options for the Ollama API
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Chat request for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model name to use for generation
    model: String,
    /// Messages of the conversation
    messages: Vec<ChatMessage>,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Format to return a response in
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    /// Whether to stream the response
    stream: bool,
}

/// Chat response from the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Model name
    pub model: String,
    /// Response message
    pub message: ChatMessage,
    /// Whether the generation is complete
    #[serde(default)]
    pub done: bool,
    /// Number of prompt tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,
    /// Number of generated tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
}

impl ChatRequest {
    /// Create a new non-streaming chat request
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            options: None,
            format: None,
            stream: false,
        }
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options.get_or_insert_with(GenerationOptions::default).temperature = Some(temperature);
        self
    }

    /// Set the response format (e.g. "json")
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}

impl Ollama {
    /// Create a client from a complete base URL such as `http://localhost:11434`
    pub fn from_url(url: &str, model: impl Into<String>) -> Result<Self, url::ParseError> {
        let base_url = Url::parse(url)?;
        Ok(Self {
            base_url,
            client: Client::builder()
                // Ollama uses HTTP/1.1
                .http1_only()
                .build()
                .unwrap_or_default(),
            model: model.into(),
            temperature: None,
        })
    }

    /// Set the sampling temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Base URL of the server
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        self.base_url
            .join(path)
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid Ollama URL: {}", e)))
    }

    /// Send a chat request
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let url = self.endpoint("api/chat")?;
        let response = self.client.post(url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Ollama API error ({}): {}", status, error_text);
            return Err(ProviderError::from_status(status.as_u16(), error_text));
        }

        let chat_response = response
            .json::<ChatResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse Ollama API response: {}", e)))?;

        debug!(
            "Ollama {}: {} prompt tokens, {} generated",
            chat_response.model,
            chat_response.prompt_eval_count.unwrap_or(0),
            chat_response.eval_count.unwrap_or(0)
        );

        Ok(chat_response)
    }
}

#[async_trait]
impl CompletionClient for Ollama {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ProviderError> {
        let mut request = ChatRequest::new(
            self.model.clone(),
            vec![
                ChatMessage::new("system", system_prompt),
                ChatMessage::new("user", user_prompt),
            ],
        )
        .format("json");
        if let Some(temperature) = self.temperature {
            request = request.temperature(temperature);
        }

        let response = self.chat(&request).await?;
        Ok(response.message.content)
    }
}
