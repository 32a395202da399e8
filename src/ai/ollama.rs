use anyhow::Context;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::media;
use super::{AIContext, AIResponse};
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct OllamaMessage {
    role: String,
    content: String,
    /// Raw base64, without the `data:` prefix.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: Option<OllamaMessageResponse>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessageResponse {
    content: String,
}

pub async fn generate_with_system(
    config: &AppConfig,
    system_prompt: &str,
    question: &str,
    context: &AIContext,
) -> anyhow::Result<AIResponse> {
    let client = Client::new();

    let images = context
        .images
        .iter()
        .filter_map(|uri| media::base64_payload(uri).map(str::to_string))
        .collect();

    let request = OllamaRequest {
        model: config.ollama_model.clone(),
        messages: vec![
            OllamaMessage {
                role: "system".to_string(),
                content: system_prompt.to_string(),
                images: Vec::new(),
            },
            OllamaMessage {
                role: "user".to_string(),
                content: question.to_string(),
                images,
            },
        ],
        stream: false,
        format: context.json_output.then_some("json"),
    };

    let url = format!("{}/api/chat", config.ollama_url.trim_end_matches('/'));

    let response = client
        .post(&url)
        .json(&request)
        .send()
        .await
        .context("Ollama request failed. Is Ollama running?")?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Ollama API error ({}): {}", status, body);
    }

    let body: OllamaResponse = response
        .json()
        .await
        .context("Failed to parse Ollama response")?;

    let content = body.message.map(|m| m.content).unwrap_or_default();

    Ok(AIResponse {
        content,
        provider: "Ollama",
        model: config.ollama_model.clone(),
    })
}
