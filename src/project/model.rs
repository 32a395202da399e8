use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use super::factory;

/// The three collections a project holds, one per generation flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentKind {
    IdeaSparks,
    WebInsights,
    MoodBoards,
}

impl ContentKind {
    pub const ALL: [ContentKind; 3] = [
        ContentKind::IdeaSparks,
        ContentKind::WebInsights,
        ContentKind::MoodBoards,
    ];

    /// Key used for the collection in the persisted JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::IdeaSparks => "ideaSparks",
            ContentKind::WebInsights => "webInsights",
            ContentKind::MoodBoards => "moodBoards",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ContentKind::IdeaSparks => "Idea Spark",
            ContentKind::WebInsights => "Web Insight",
            ContentKind::MoodBoards => "Mood Board",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .trim()
            .to_ascii_lowercase()
            .replace(|c: char| c == '-' || c == '_', "");
        match normalized.as_str() {
            "ideasparks" | "ideaspark" | "ideas" => Ok(ContentKind::IdeaSparks),
            "webinsights" | "webinsight" | "insights" => Ok(ContentKind::WebInsights),
            "moodboards" | "moodboard" | "boards" => Ok(ContentKind::MoodBoards),
            other => Err(format!(
                "Unknown content collection \"{}\" (expected ideaSparks, webInsights or moodBoards)",
                other
            )),
        }
    }
}

/// A saved generation result: identity and rating wrapped around the
/// flow-specific fields, which are flattened into the same JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem<T> {
    pub id: String,
    pub timestamp: i64,
    #[serde(flatten)]
    pub data: T,
    #[serde(
        default,
        deserialize_with = "rating_in_range",
        skip_serializing_if = "Option::is_none"
    )]
    pub rating: Option<u8>,
}

/// Ratings outside 1-5 (or not integers at all) load as unrated.
fn rating_in_range<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u8>, D::Error> {
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(serde_json::Value::as_u64)
        .filter(|r| (1..=5).contains(r))
        .map(|r| r as u8))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaSpark {
    pub input_notes: String,
    pub input_media_names: Vec<String>,
    pub story_ideas: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebInsight {
    pub urls: Vec<String>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodBoard {
    pub input_media_names: Vec<String>,
    pub keywords: String,
    pub generated_images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

pub type IdeaSparkResult = ContentItem<IdeaSpark>;
pub type WebInsightResult = ContentItem<WebInsight>;
pub type MoodBoardResult = ContentItem<MoodBoard>;

/// Output of a generation flow, before it has been given an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPayload {
    IdeaSpark(IdeaSpark),
    WebInsight(WebInsight),
    MoodBoard(MoodBoard),
}

impl ContentPayload {
    pub fn kind(&self) -> ContentKind {
        match self {
            ContentPayload::IdeaSpark(_) => ContentKind::IdeaSparks,
            ContentPayload::WebInsight(_) => ContentKind::WebInsights,
            ContentPayload::MoodBoard(_) => ContentKind::MoodBoards,
        }
    }
}

impl From<IdeaSpark> for ContentPayload {
    fn from(value: IdeaSpark) -> Self {
        ContentPayload::IdeaSpark(value)
    }
}

impl From<WebInsight> for ContentPayload {
    fn from(value: WebInsight) -> Self {
        ContentPayload::WebInsight(value)
    }
}

impl From<MoodBoard> for ContentPayload {
    fn from(value: MoodBoard) -> Self {
        ContentPayload::MoodBoard(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ContentCounts {
    pub idea_sparks: usize,
    pub web_insights: usize,
    pub mood_boards: usize,
}

impl fmt::Display for ContentCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Ideas, {} Insights, {} Boards",
            self.idea_sparks, self.web_insights, self.mood_boards
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub idea_sparks: Vec<IdeaSparkResult>,
    #[serde(default)]
    pub web_insights: Vec<WebInsightResult>,
    #[serde(default)]
    pub mood_boards: Vec<MoodBoardResult>,
}

impl Project {
    pub(crate) fn new(name: String, now: i64) -> Self {
        Self {
            id: factory::new_id(),
            name,
            created_at: now,
            updated_at: now,
            idea_sparks: Vec::new(),
            web_insights: Vec::new(),
            mood_boards: Vec::new(),
        }
    }

    pub fn counts(&self) -> ContentCounts {
        ContentCounts {
            idea_sparks: self.idea_sparks.len(),
            web_insights: self.web_insights.len(),
            mood_boards: self.mood_boards.len(),
        }
    }

    pub fn len(&self, kind: ContentKind) -> usize {
        match kind {
            ContentKind::IdeaSparks => self.idea_sparks.len(),
            ContentKind::WebInsights => self.web_insights.len(),
            ContentKind::MoodBoards => self.mood_boards.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        ContentKind::ALL.iter().all(|kind| self.len(*kind) == 0)
    }

    /// Rating of an item, `None` when the item is missing or unrated.
    pub fn rating_of(&self, kind: ContentKind, content_id: &str) -> Option<u8> {
        match kind {
            ContentKind::IdeaSparks => find_rating(&self.idea_sparks, content_id),
            ContentKind::WebInsights => find_rating(&self.web_insights, content_id),
            ContentKind::MoodBoards => find_rating(&self.mood_boards, content_id),
        }
    }

    pub fn contains(&self, kind: ContentKind, content_id: &str) -> bool {
        match kind {
            ContentKind::IdeaSparks => self.idea_sparks.iter().any(|i| i.id == content_id),
            ContentKind::WebInsights => self.web_insights.iter().any(|i| i.id == content_id),
            ContentKind::MoodBoards => self.mood_boards.iter().any(|i| i.id == content_id),
        }
    }

    /// Stamps the payload and puts it at the front of its collection.
    /// Returns the new item's id.
    pub(crate) fn prepend(&mut self, payload: ContentPayload) -> String {
        match payload {
            ContentPayload::IdeaSpark(data) => push_front(&mut self.idea_sparks, data),
            ContentPayload::WebInsight(data) => push_front(&mut self.web_insights, data),
            ContentPayload::MoodBoard(data) => push_front(&mut self.mood_boards, data),
        }
    }

    pub(crate) fn remove_content(&mut self, kind: ContentKind, content_id: &str) -> bool {
        match kind {
            ContentKind::IdeaSparks => remove_by_id(&mut self.idea_sparks, content_id),
            ContentKind::WebInsights => remove_by_id(&mut self.web_insights, content_id),
            ContentKind::MoodBoards => remove_by_id(&mut self.mood_boards, content_id),
        }
    }

    pub(crate) fn set_rating(&mut self, kind: ContentKind, content_id: &str, rating: u8) -> bool {
        match kind {
            ContentKind::IdeaSparks => rate_by_id(&mut self.idea_sparks, content_id, rating),
            ContentKind::WebInsights => rate_by_id(&mut self.web_insights, content_id, rating),
            ContentKind::MoodBoards => rate_by_id(&mut self.mood_boards, content_id, rating),
        }
    }

    /// Moves `updated_at` forward, strictly, even within the same millisecond.
    /// Saturates at `i64::MAX`.
    pub(crate) fn touch(&mut self, now: i64) {
        self.updated_at = now.max(self.updated_at.saturating_add(1));
    }
}

fn push_front<T>(items: &mut Vec<ContentItem<T>>, data: T) -> String {
    let item = factory::stamp(data);
    let id = item.id.clone();
    items.insert(0, item);
    id
}

fn remove_by_id<T>(items: &mut Vec<ContentItem<T>>, content_id: &str) -> bool {
    let before = items.len();
    items.retain(|item| item.id != content_id);
    items.len() != before
}

fn rate_by_id<T>(items: &mut [ContentItem<T>], content_id: &str, rating: u8) -> bool {
    match items.iter_mut().find(|item| item.id == content_id) {
        Some(item) => {
            item.rating = Some(rating);
            true
        }
        None => false,
    }
}

fn find_rating<T>(items: &[ContentItem<T>], content_id: &str) -> Option<u8> {
    items
        .iter()
        .find(|item| item.id == content_id)
        .and_then(|item| item.rating)
}
