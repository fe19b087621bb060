use adaptive_tamil_core::Translator;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;

pub struct OllamaTranslator {
    base_url: String,
    model: String,
    target_language: String,
    temperature: f32,
    top_p: f32,
    client: Client,
}

impl OllamaTranslator {
    pub fn new(config: ModelConfig) -> Result<Self> {
        if config.ollama_model.trim().is_empty() {
            return Err(anyhow!(
                "model.backend is ollama but model.ollama_model is empty"
            ));
        }
        if config.ollama_host.trim().is_empty() {
            return Err(anyhow!(
                "model.backend is ollama but model.ollama_host is empty"
            ));
        }

        Ok(Self {
            base_url: config.ollama_host.trim_end_matches('/').to_string(),
            model: config.ollama_model,
            target_language: config.target_language,
            temperature: config.temperature,
            top_p: config.top_p,
            client: Client::builder()
                .build()
                .context("failed to build HTTP client")?,
        })
    }

    fn build_prompt(&self, text: &str) -> String {
        format!(
            "Translate the following text into {}. Output only the translation.\n\n{}",
            self.target_language, text
        )
    }

    async fn run_ollama(&self, text: &str) -> Result<String> {
        let endpoint = format!("{}/api/chat", self.base_url);
        let payload = OllamaChatRequest {
            model: self.model.clone(),
            stream: false,
            messages: vec![
                OllamaMessage {
                    role: "system".to_string(),
                    content: format!(
                        "You are a professional {} translator. Reply with the translated text only, without notes or quotes.",
                        self.target_language
                    ),
                },
                OllamaMessage {
                    role: "user".to_string(),
                    content: self.build_prompt(text),
                },
            ],
            options: OllamaOptions {
                temperature: self.temperature,
                top_p: self.top_p,
            },
        };

        let response = self
            .client
            .post(endpoint)
            .json(&payload)
            .send()
            .await
            .context("failed to call ollama API")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("failed to read ollama response body")?;

        if !status.is_success() {
            return Err(anyhow!("ollama API failed ({status}): {body}"));
        }

        let parsed: OllamaChatResponse =
            serde_json::from_str(&body).context("invalid ollama response format")?;
        Ok(parsed.message.content)
    }
}

fn sanitize_output(raw: &str) -> String {
    let mut text = raw.trim();
    for prefix in ["Translation:", "translation:"] {
        if let Some(rest) = text.strip_prefix(prefix) {
            text = rest.trim_start();
        }
    }
    text.trim_matches('`')
        .trim_matches('"')
        .trim_matches('\u{201c}')
        .trim_matches('\u{201d}')
        .trim()
        .to_string()
}

#[async_trait]
impl Translator for OllamaTranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        let raw = self.run_ollama(text).await?;
        let translated = sanitize_output(&raw);
        if translated.is_empty() {
            return Err(anyhow!("ollama returned an empty translation"));
        }
        Ok(translated)
    }
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    stream: bool,
    messages: Vec<OllamaMessage>,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessageResponse,
}

#[derive(Debug, Deserialize)]
struct OllamaMessageResponse {
    content: String,
}
