//! The three generation flows. Each turns user input into a content payload
//! ready to be saved into a project.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::media::MediaFile;
use super::{generate, openai, AIContext};
use crate::config::{AppConfig, LLMProvider};
use crate::project::{IdeaSpark, MoodBoard, WebInsight};

static URL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^(ftp|http|https)://[^ "]+$"#).unwrap());

static LIST_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:\d+[.)]|[-*•])\s+(.+?)\s*$").unwrap());

const MOOD_BOARD_IMAGES: usize = 3;

const DEFAULT_EXPLANATION: &str =
    "The AI model generated a visual mood board based on your input.";

const IDEA_SPARK_SYSTEM: &str = "You are a creative AI assistant that helps filmmakers \
    find novel story ideas. You look at mixed media (stock footage stills, inspirational \
    images, written notes) and propose unexpected, inspiring story ideas or thematic \
    concepts that bridge them. Answer with a JSON object of the form \
    {\"storyIdeas\": [\"...\", \"...\"]}.";

const WEB_INSIGHT_SYSTEM: &str = "You are an expert film researcher. Summarize the key \
    information relevant to filmmaking from the pages you are given and highlight the \
    connections between them. Answer with a JSON object of the form {\"summary\": \"...\"}.";

const MOOD_BOARD_SYSTEM: &str = "You are an art director assembling visual mood boards \
    for film projects.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoryIdeasOutput {
    story_ideas: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SummaryOutput {
    summary: String,
}

pub async fn idea_spark(
    config: &AppConfig,
    media: &[MediaFile],
    notes: &str,
) -> anyhow::Result<IdeaSpark> {
    if media.is_empty() && notes.trim().is_empty() {
        anyhow::bail!("Please provide some media or notes to spark ideas.");
    }

    let question = idea_spark_prompt(media, notes);
    let context = AIContext {
        images: image_uris(media),
        json_output: true,
    };

    let response = generate(config, IDEA_SPARK_SYSTEM, &question, &context).await?;
    let story_ideas = parse_story_ideas(&response.content);
    if story_ideas.is_empty() {
        anyhow::bail!("The model did not return any story ideas.");
    }

    log::info!("Generated {} story idea(s) with {}", story_ideas.len(), response.model);
    Ok(IdeaSpark {
        input_notes: notes.to_string(),
        input_media_names: media.iter().map(|m| m.name.clone()).collect(),
        story_ideas,
    })
}

pub async fn web_insight(config: &AppConfig, urls: &[String]) -> anyhow::Result<WebInsight> {
    let urls = valid_urls(urls);
    if urls.is_empty() {
        anyhow::bail!("Please enter at least one valid URL.");
    }

    let question = web_insight_prompt(&urls);
    let context = AIContext {
        images: Vec::new(),
        json_output: true,
    };

    let response = generate(config, WEB_INSIGHT_SYSTEM, &question, &context).await?;
    let summary = parse_summary(&response.content);
    if summary.is_empty() {
        anyhow::bail!("The model did not return a summary.");
    }

    Ok(WebInsight { urls, summary })
}

pub async fn mood_board(
    config: &AppConfig,
    media: &[MediaFile],
    keywords: &str,
) -> anyhow::Result<MoodBoard> {
    let keywords = keywords.trim();
    if keywords.is_empty() {
        anyhow::bail!("Please enter keywords or a theme for the mood board.");
    }
    if config.llm_provider != LLMProvider::OpenAI {
        anyhow::bail!("Mood boards need image generation, which requires the OpenAI provider.");
    }

    let generated_images =
        openai::generate_images(config, &mood_board_image_prompt(keywords), MOOD_BOARD_IMAGES)
            .await?;

    let context = AIContext {
        images: image_uris(media),
        json_output: false,
    };
    let explanation =
        match generate(config, MOOD_BOARD_SYSTEM, &mood_board_explanation_prompt(keywords), &context)
            .await
        {
            Ok(response) => explanation_or_default(&response.content),
            Err(e) => {
                log::warn!("Mood board explanation failed: {:#}", e);
                DEFAULT_EXPLANATION.to_string()
            }
        };

    Ok(MoodBoard {
        input_media_names: media.iter().map(|m| m.name.clone()).collect(),
        keywords: keywords.to_string(),
        generated_images,
        explanation: Some(explanation),
    })
}

/// Trimmed URLs that look like ftp/http/https links; blanks and junk dropped.
pub fn valid_urls(urls: &[String]) -> Vec<String> {
    urls.iter()
        .map(|u| u.trim())
        .filter(|u| URL_PATTERN.is_match(u))
        .map(str::to_string)
        .collect()
}

fn image_uris(media: &[MediaFile]) -> Vec<String> {
    media
        .iter()
        .filter(|m| m.is_image())
        .map(MediaFile::data_uri)
        .collect()
}

fn idea_spark_prompt(media: &[MediaFile], notes: &str) -> String {
    let mut prompt = String::new();

    let images: Vec<&str> = media
        .iter()
        .filter(|m| m.is_image())
        .map(|m| m.name.as_str())
        .collect();
    if !images.is_empty() {
        prompt.push_str("## Attached Images\n");
        prompt.push_str(&images.join(", "));
        prompt.push_str("\n\n");
    }

    for file in media {
        if let Some(text) = file.text() {
            prompt.push_str(&format!("## Text File: {}\n{}\n\n", file.name, text.trim()));
        } else if !file.is_image() {
            prompt.push_str(&format!("## Other Media\n{} ({})\n\n", file.name, file.mime));
        }
    }

    if !notes.trim().is_empty() {
        prompt.push_str("## Notes\n");
        prompt.push_str(notes.trim());
        prompt.push_str("\n\n");
    }

    prompt.push_str("Generate a handful of story ideas.");
    prompt
}

fn web_insight_prompt(urls: &[String]) -> String {
    let mut prompt = String::from("URLs:\n");
    for url in urls {
        prompt.push_str("- ");
        prompt.push_str(url);
        prompt.push('\n');
    }
    prompt
}

fn mood_board_image_prompt(keywords: &str) -> String {
    format!(
        "A mood board image for the theme \"{}\". Capture the mood and keywords \
         visually, cinematic still, no text.",
        keywords
    )
}

fn mood_board_explanation_prompt(keywords: &str) -> String {
    format!(
        "Write a brief explanation for a visual mood board on the theme \"{}\". \
         Describe the overall feeling and the key visual elements.",
        keywords
    )
}

fn explanation_or_default(content: &str) -> String {
    let text = content.trim();
    if text.is_empty() {
        DEFAULT_EXPLANATION.to_string()
    } else {
        text.to_string()
    }
}

/// The outermost `{...}` of a reply, ignoring code fences or chatter around it.
fn json_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (start < end).then(|| &content[start..=end])
}

/// Story ideas from a JSON reply, or from a numbered/bulleted list when the
/// model ignored the requested format.
pub fn parse_story_ideas(content: &str) -> Vec<String> {
    if let Some(json) = json_object(content) {
        if let Ok(output) = serde_json::from_str::<StoryIdeasOutput>(json) {
            return output
                .story_ideas
                .into_iter()
                .map(|idea| idea.trim().to_string())
                .filter(|idea| !idea.is_empty())
                .collect();
        }
    }

    let items: Vec<String> = content
        .lines()
        .filter_map(|line| LIST_ITEM.captures(line))
        .map(|caps| caps[1].to_string())
        .collect();
    if !items.is_empty() {
        return items;
    }

    let text = content.trim();
    if text.is_empty() {
        Vec::new()
    } else {
        vec![text.to_string()]
    }
}

pub fn parse_summary(content: &str) -> String {
    json_object(content)
        .and_then(|json| serde_json::from_str::<SummaryOutput>(json).ok())
        .map(|output| output.summary)
        .unwrap_or_else(|| content.to_string())
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_json_story_ideas() {
        let reply = "```json\n{\"storyIdeas\": [\" A diver finds a door \", \"\", \"Twins swap eras\"]}\n```";
        assert_eq!(
            parse_story_ideas(reply),
            vec!["A diver finds a door".to_string(), "Twins swap eras".to_string()]
        );
    }

    #[test]
    fn test_falls_back_to_list_lines() {
        let reply = "Here you go:\n1. A diver finds a door\n2) Twins swap eras\n- A map that redraws itself\n";
        assert_eq!(
            parse_story_ideas(reply),
            vec![
                "A diver finds a door".to_string(),
                "Twins swap eras".to_string(),
                "A map that redraws itself".to_string(),
            ]
        );
    }

    #[test]
    fn test_plain_text_becomes_single_idea() {
        assert_eq!(parse_story_ideas("  One long idea.  "), vec!["One long idea.".to_string()]);
        assert!(parse_story_ideas("   ").is_empty());
    }

    #[test]
    fn test_parse_summary() {
        assert_eq!(parse_summary("{\"summary\": \" Both pages cover lenses. \"}"), "Both pages cover lenses.");
        assert_eq!(parse_summary("  plain answer "), "plain answer");
    }

    #[test]
    fn test_valid_urls() {
        let urls = vec![
            " https://example.com/a ".to_string(),
            "".to_string(),
            "ftp://files.example.com/x".to_string(),
            "example.com".to_string(),
            "https://bad url.com".to_string(),
        ];
        assert_eq!(
            valid_urls(&urls),
            vec!["https://example.com/a".to_string(), "ftp://files.example.com/x".to_string()]
        );
    }

    #[test]
    fn test_idea_prompt_inlines_text_and_lists_images() {
        let media = vec![
            MediaFile::from_bytes("harbour.png", vec![1, 2, 3]),
            MediaFile::from_bytes("treatment.txt", b"The sea keeps secrets.".to_vec()),
        ];
        let prompt = idea_spark_prompt(&media, "  noir tone ");

        assert!(prompt.contains("harbour.png"));
        assert!(prompt.contains("## Text File: treatment.txt\nThe sea keeps secrets."));
        assert!(prompt.contains("## Notes\nnoir tone"));
        assert_eq!(image_uris(&media).len(), 1);
    }

    #[test]
    fn test_explanation_default() {
        assert_eq!(explanation_or_default("  "), DEFAULT_EXPLANATION);
        assert_eq!(explanation_or_default(" Warm dusk tones "), "Warm dusk tones");
    }

    #[tokio::test]
    async fn test_idea_spark_requires_input() {
        let err = idea_spark(&AppConfig::default(), &[], "   ").await.unwrap_err();
        assert!(err.to_string().contains("media or notes"));
    }

    #[tokio::test]
    async fn test_web_insight_requires_a_valid_url() {
        let err = web_insight(&AppConfig::default(), &["nope".to_string()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("valid URL"));
    }

    #[tokio::test]
    async fn test_mood_board_needs_openai() {
        let mut config = AppConfig::default();
        config.llm_provider = LLMProvider::Ollama;
        let err = mood_board(&config, &[], "misty forest").await.unwrap_err();
        assert!(err.to_string().contains("OpenAI"));
    }
}
