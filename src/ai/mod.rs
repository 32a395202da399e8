pub mod flows;
pub mod media;
pub mod ollama;
pub mod openai;

use crate::config::{AppConfig, LLMProvider};

/// Extra inputs sent alongside the prompt text.
#[derive(Debug, Clone, Default)]
pub struct AIContext {
    /// Images as `data:` URIs.
    pub images: Vec<String>,
    /// Ask the model to answer with a single JSON object.
    pub json_output: bool,
}

#[derive(Debug, Clone)]
pub struct AIResponse {
    pub content: String,
    pub model: String,
    pub provider: &'static str,
}

/// Sends one system + user exchange to the configured provider.
pub async fn generate(
    config: &AppConfig,
    system_prompt: &str,
    question: &str,
    context: &AIContext,
) -> anyhow::Result<AIResponse> {
    let response = match config.llm_provider {
        LLMProvider::OpenAI => {
            openai::generate_with_system(config, system_prompt, question, context).await?
        }
        LLMProvider::Ollama => {
            ollama::generate_with_system(config, system_prompt, question, context).await?
        }
    };

    log::debug!(
        "{} ({}) replied with {} chars",
        response.provider,
        response.model,
        response.content.len()
    );
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_generate_dispatches_to_configured_provider() {
        let config = AppConfig::default();
        assert_eq!(config.llm_provider, LLMProvider::OpenAI);

        let err = generate(&config, "s", "q", &AIContext::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("OpenAI API key"));
    }
}
