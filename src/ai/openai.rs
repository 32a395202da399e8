use anyhow::Context;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{AIContext, AIResponse};
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessageResponse,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessageResponse {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
    response_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    b64_json: Option<String>,
    url: Option<String>,
}

fn endpoint(config: &AppConfig, path: &str) -> String {
    format!("{}/{}", config.openai_url.trim_end_matches('/'), path)
}

fn ensure_key(config: &AppConfig) -> anyhow::Result<()> {
    if config.openai_api_key.is_empty() {
        anyhow::bail!(
            "OpenAI API key not configured. Set OPENAI_API_KEY or add it to config.json."
        );
    }
    Ok(())
}

/// User message content: plain text, or text plus image parts when the
/// context carries images.
fn user_content(question: &str, images: &[String]) -> serde_json::Value {
    if images.is_empty() {
        return serde_json::Value::String(question.to_string());
    }

    let mut parts = vec![serde_json::json!({
        "type": "text",
        "text": question
    })];
    parts.extend(images.iter().map(|uri| {
        serde_json::json!({
            "type": "image_url",
            "image_url": {
                "url": uri,
                "detail": "low"
            }
        })
    }));
    serde_json::Value::Array(parts)
}

pub async fn generate_with_system(
    config: &AppConfig,
    system_prompt: &str,
    question: &str,
    context: &AIContext,
) -> anyhow::Result<AIResponse> {
    ensure_key(config)?;

    let client = Client::new();

    let request = OpenAIRequest {
        model: config.openai_model.clone(),
        messages: vec![
            OpenAIMessage {
                role: "system".to_string(),
                content: serde_json::Value::String(system_prompt.to_string()),
            },
            OpenAIMessage {
                role: "user".to_string(),
                content: user_content(question, &context.images),
            },
        ],
        max_tokens: 1024,
        temperature: 0.9,
        response_format: context
            .json_output
            .then(|| serde_json::json!({ "type": "json_object" })),
    };

    let response = client
        .post(endpoint(config, "chat/completions"))
        .header("Authorization", format!("Bearer {}", config.openai_api_key))
        .header("Content-Type", "application/json")
        .json(&request)
        .send()
        .await
        .context("OpenAI request failed")?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("OpenAI API error ({}): {}", status, body);
    }

    let body: OpenAIResponse = response
        .json()
        .await
        .context("Failed to parse OpenAI response")?;

    let content = body
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default();

    Ok(AIResponse {
        content,
        provider: "OpenAI",
        model: config.openai_model.clone(),
    })
}

/// Generates `count` images, one request each, returned as `data:` URIs
/// (or remote URLs when the API does not inline the bytes).
pub async fn generate_images(
    config: &AppConfig,
    prompt: &str,
    count: usize,
) -> anyhow::Result<Vec<String>> {
    ensure_key(config)?;

    let client = Client::new();
    let mut images = Vec::with_capacity(count);

    for _ in 0..count {
        let request = ImageRequest {
            model: &config.openai_image_model,
            prompt,
            n: 1,
            size: "1024x1024",
            response_format: "b64_json",
        };

        let response = client
            .post(endpoint(config, "images/generations"))
            .header("Authorization", format!("Bearer {}", config.openai_api_key))
            .json(&request)
            .send()
            .await
            .context("OpenAI image request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI image API error ({}): {}", status, body);
        }

        let body: ImageResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI image response")?;

        images.extend(body.data.into_iter().filter_map(|d| match d.b64_json {
            Some(b64) => Some(format!("data:image/png;base64,{}", b64)),
            None => d.url,
        }));
    }

    log::debug!("Generated {} image(s) with {}", images.len(), config.openai_image_model);
    Ok(images)
}
