pub mod factory;
pub mod model;
pub mod repository;
pub mod store;

pub use model::{
    ContentCounts, ContentItem, ContentKind, ContentPayload, IdeaSpark, IdeaSparkResult, MoodBoard,
    MoodBoardResult, Project, WebInsight, WebInsightResult,
};
pub use repository::{KvProjectRepository, ProjectRepository, PROJECTS_KEY};
pub use store::{ProjectStore, SharedProjectStore, StoreError};
