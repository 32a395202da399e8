use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

use super::factory;
use super::model::{ContentKind, ContentPayload, Project};
use super::repository::ProjectRepository;

/// Why the store refused an operation. State is untouched whenever one of
/// these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Project name cannot be empty")]
    EmptyName,

    #[error("Another project named \"{0}\" already exists")]
    DuplicateName(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),
}

pub type SharedProjectStore<R> = Arc<Mutex<ProjectStore<R>>>;

/// Owns the project list for a session and mirrors every change into its
/// repository.
pub struct ProjectStore<R> {
    projects: Vec<Project>,
    repository: R,
    changes: watch::Sender<Vec<Project>>,
}

impl<R: ProjectRepository> ProjectStore<R> {
    /// Loads whatever the repository holds and becomes ready.
    pub fn open(repository: R) -> Self {
        let projects = repository.load();
        log::info!("Loaded {} project(s) from storage", projects.len());

        let (changes, _) = watch::channel(projects.clone());
        Self {
            projects,
            repository,
            changes,
        }
    }

    pub fn into_shared(self) -> SharedProjectStore<R> {
        Arc::new(Mutex::new(self))
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    /// Receiver that always holds the latest full project list.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Project>> {
        self.changes.subscribe()
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn get_project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn create_project(&mut self, name: &str) -> Result<Project, StoreError> {
        let name = self.validate_name(name, None)?;
        let project = Project::new(name, factory::now_millis());

        self.projects.push(project.clone());
        self.commit();
        log::info!("Project \"{}\" created", project.name);
        Ok(project)
    }

    pub fn update_project_name(&mut self, id: &str, new_name: &str) -> Result<(), StoreError> {
        let index = self.index_of(id)?;
        let name = self.validate_name(new_name, Some(id))?;

        let project = &mut self.projects[index];
        project.name = name;
        project.touch(factory::now_millis());
        log::info!("Project renamed to \"{}\"", project.name);
        self.commit();
        Ok(())
    }

    /// Removes the project with all its content. Returns whether anything was
    /// deleted; a missing id is not an error.
    pub fn delete_project(&mut self, id: &str) -> bool {
        let Some(index) = self.projects.iter().position(|p| p.id == id) else {
            return false;
        };

        let removed = self.projects.remove(index);
        self.commit();
        log::info!("Project \"{}\" deleted", removed.name);
        true
    }

    /// Stamps the payload with an identity and prepends it to the collection
    /// matching its variant. Identical payloads are stored again, not merged.
    pub fn add_content(
        &mut self,
        project_id: &str,
        payload: impl Into<ContentPayload>,
    ) -> Result<String, StoreError> {
        let index = self.index_of(project_id)?;
        let payload = payload.into();
        let kind = payload.kind();

        let project = &mut self.projects[index];
        let content_id = project.prepend(payload);
        project.touch(factory::now_millis());
        log::info!("{} saved to project \"{}\"", kind.label(), project.name);
        self.commit();
        Ok(content_id)
    }

    /// Removes an item if present. `updated_at` moves even when nothing was
    /// removed. Returns whether an item was removed.
    pub fn remove_content(
        &mut self,
        project_id: &str,
        kind: ContentKind,
        content_id: &str,
    ) -> Result<bool, StoreError> {
        let index = self.index_of(project_id)?;

        let project = &mut self.projects[index];
        let removed = project.remove_content(kind, content_id);
        project.touch(factory::now_millis());
        if removed {
            log::info!("Content removed from project \"{}\"", project.name);
        } else {
            log::debug!("No {} item {} in project \"{}\"", kind, content_id, project.name);
        }
        self.commit();
        Ok(removed)
    }

    /// Sets a 1-5 rating. A missing item is accepted and leaves the state
    /// unchanged. Returns whether a rating was applied.
    pub fn rate_content(
        &mut self,
        project_id: &str,
        kind: ContentKind,
        content_id: &str,
        rating: u8,
    ) -> Result<bool, StoreError> {
        let index = self.index_of(project_id)?;
        if !(1..=5).contains(&rating) {
            return Err(StoreError::InvalidRating(rating));
        }

        let project = &mut self.projects[index];
        if !project.set_rating(kind, content_id, rating) {
            log::debug!("Ignoring rating for missing {} item {}", kind, content_id);
            return Ok(false);
        }

        project.touch(factory::now_millis());
        log::info!("Content rating updated");
        self.commit();
        Ok(true)
    }

    /// Whether `create_project(name)` would currently accept the name.
    /// Returns the trimmed name.
    pub fn check_new_name(&self, name: &str) -> Result<String, StoreError> {
        self.validate_name(name, None)
    }

    fn index_of(&self, id: &str) -> Result<usize, StoreError> {
        self.projects
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| StoreError::ProjectNotFound(id.to_string()))
    }

    /// Trims `name` and checks it against every other project's name.
    fn validate_name(&self, name: &str, renaming: Option<&str>) -> Result<String, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::EmptyName);
        }

        let taken = self
            .projects
            .iter()
            .any(|p| Some(p.id.as_str()) != renaming && p.name.trim() == name);
        if taken {
            return Err(StoreError::DuplicateName(name.to_string()));
        }

        Ok(name.to_string())
    }

    fn commit(&mut self) {
        self.repository.save(&self.projects);
        self.changes.send_replace(self.projects.clone());
    }
}
