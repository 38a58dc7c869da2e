/*!
 * Translation backends.
 *
 * Every backend is exposed through the single [`Translator`] capability:
 * an ordered list of id-tagged texts goes in, a list of id-tagged
 * translations comes out. Backends are unreliable by contract and may omit,
 * invent or reorder ids; reconciliation deals with that.
 *
 * - `ollama`: Local Ollama server
 * - `openai`: OpenAI API and OpenAI-compatible local servers (LM Studio)
 * - `anthropic`: Anthropic API
 * - `mock`: Scripted translator for tests and dry runs
 */

use std::fmt::Debug;
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::app_config::{TranslationConfig, TranslationProvider};
use crate::errors::ProviderError;
use crate::language_utils;
use crate::translation::prompts::{self, PromptTemplate};

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;

/// One text sent to the translator, tagged with its segment id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationItem {
    pub id: usize,
    pub text: String,
}

impl TranslationItem {
    pub fn new(id: usize, text: impl Into<String>) -> Self {
        Self { id, text: text.into() }
    }
}

/// One translation returned by the translator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslatedItem {
    pub id: usize,
    pub translation: String,
}

impl TranslatedItem {
    pub fn new(id: usize, translation: impl Into<String>) -> Self {
        Self {
            id,
            translation: translation.into(),
        }
    }
}

/// Common capability of all translation backends
#[async_trait]
pub trait Translator: Send + Sync + Debug {
    /// Translate a batch of id-tagged texts into `target_language`.
    ///
    /// # Returns
    /// * `Ok(items)` - whatever the backend produced, in any order and possibly incomplete
    /// * `Err(ProviderError)` - a transport, auth or quota failure
    async fn translate_batch(
        &self,
        items: &[TranslationItem],
        target_language: &str,
    ) -> Result<Vec<TranslatedItem>, ProviderError>;

    /// Short backend name for logs
    fn name(&self) -> &str;
}

/// Raw text completion used by the LLM-backed translators
#[async_trait]
pub trait CompletionClient: Send + Sync + Debug {
    /// Complete a system + user prompt pair and return the generated text
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ProviderError>;
}

/// Adapts a [`CompletionClient`] to the id-tagged [`Translator`] protocol.
///
/// The request is rendered as a JSON array of `{id, text}` objects and the
/// reply is parsed leniently; an unparseable reply yields no items rather
/// than an error so the missing ids get retried.
#[derive(Debug)]
pub struct PromptTranslator<C> {
    client: C,
    template: PromptTemplate,
    timeout: Duration,
    name: String,
}

impl<C: CompletionClient> PromptTranslator<C> {
    pub fn new(name: impl Into<String>, client: C, timeout: Duration) -> Self {
        Self {
            client,
            template: PromptTemplate::default(),
            timeout,
            name: name.into(),
        }
    }

    /// Replace the system prompt template
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }
}

#[async_trait]
impl<C: CompletionClient> Translator for PromptTranslator<C> {
    async fn translate_batch(
        &self,
        items: &[TranslationItem],
        target_language: &str,
    ) -> Result<Vec<TranslatedItem>, ProviderError> {
        let language_name =
            language_utils::get_language_name(target_language).unwrap_or_else(|_| target_language.to_string());
        let system_prompt = self.template.render(&language_name, target_language);
        let user_prompt = prompts::build_user_prompt(items);

        let raw = tokio::time::timeout(self.timeout, self.client.complete(&system_prompt, &user_prompt))
            .await
            .map_err(|_| ProviderError::Timeout(Some(self.timeout.as_millis() as u64)))??;

        let parsed = prompts::parse_translation_response(&raw);
        debug!(
            "{}: requested {} items, parsed {} ({} skipped)",
            self.name,
            items.len(),
            parsed.items.len(),
            parsed.skipped
        );

        Ok(parsed.items)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Build the translator selected by the configuration
pub fn from_config(config: &TranslationConfig) -> Result<Box<dyn Translator>> {
    let timeout = Duration::from_secs(config.get_timeout_secs());
    let model = config.get_model();
    let endpoint = config.get_endpoint();
    let api_key = config.get_api_key();
    let temperature = config.temperature;
    let template = config
        .system_prompt
        .as_deref()
        .map(PromptTemplate::new)
        .unwrap_or_default();

    let translator: Box<dyn Translator> = match config.provider {
        TranslationProvider::Ollama => {
            let client = ollama::Ollama::from_url(&endpoint, model)
                .map_err(|e| anyhow!("Invalid Ollama endpoint '{}': {}", endpoint, e))?
                .temperature(temperature);
            Box::new(PromptTranslator::new("ollama", client, timeout).with_template(template))
        }
        TranslationProvider::OpenAI => {
            let client = openai::OpenAI::new(api_key, endpoint, model).temperature(temperature);
            Box::new(PromptTranslator::new("openai", client, timeout).with_template(template))
        }
        TranslationProvider::LMStudio => {
            let client = openai::OpenAI::new(String::new(), endpoint, model).temperature(temperature);
            Box::new(PromptTranslator::new("lmstudio", client, timeout).with_template(template))
        }
        TranslationProvider::Anthropic => {
            let client = anthropic::Anthropic::new(api_key, endpoint, model).temperature(temperature);
            Box::new(PromptTranslator::new("anthropic", client, timeout).with_template(template))
        }
        TranslationProvider::Mock => Box::new(mock::MockTranslator::working()),
    };

    Ok(translator)
}
