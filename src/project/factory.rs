//! Identity for newly saved content: a random id and the creation time.

use super::model::ContentItem;

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Wraps a freshly generated payload with an id and timestamp. Always unrated.
pub fn stamp<T>(data: T) -> ContentItem<T> {
    ContentItem {
        id: new_id(),
        timestamp: now_millis(),
        data,
        rating: None,
    }
}
