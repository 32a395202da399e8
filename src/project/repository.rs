use super::model::Project;
use crate::storage::{DurableStore, KeyValueBackend};

/// Storage key holding the JSON array of all projects.
pub const PROJECTS_KEY: &str = "ryk-ai-mediaspark-projects";

/// Where the project list is mirrored between sessions.
///
/// Implementations never fail towards the store: `load` falls back to an
/// empty list and `save` swallows write errors after logging them.
pub trait ProjectRepository {
    fn load(&self) -> Vec<Project>;
    fn save(&mut self, projects: &[Project]);
}

impl<R: ProjectRepository + ?Sized> ProjectRepository for Box<R> {
    fn load(&self) -> Vec<Project> {
        (**self).load()
    }

    fn save(&mut self, projects: &[Project]) {
        (**self).save(projects)
    }
}

/// Keeps the whole list as one JSON record in a key/value backend.
pub struct KvProjectRepository<B> {
    store: DurableStore<B>,
}

impl<B: KeyValueBackend> KvProjectRepository<B> {
    pub fn new(backend: B) -> Self {
        Self {
            store: DurableStore::new(backend),
        }
    }

    pub fn backend(&self) -> &B {
        self.store.backend()
    }
}

impl<B: KeyValueBackend> ProjectRepository for KvProjectRepository<B> {
    fn load(&self) -> Vec<Project> {
        self.store.load(PROJECTS_KEY, Vec::new())
    }

    fn save(&mut self, projects: &[Project]) {
        self.store.save(PROJECTS_KEY, projects);
    }
}
