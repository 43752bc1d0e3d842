use std::collections::HashSet;

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::task::Task;

/// In-memory task list. Insertion order is display order.
///
/// Nothing here touches disk: after a mutation the owner is expected to
/// recount categories and persist (see [`crate::app::App`]).
#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
}

impl TaskStore {
    pub fn new(tasks: Vec<Task>) -> Self {
        let mut store = Self::default();
        store.replace_all(tasks);
        store
    }

    #[tracing::instrument(skip(self))]
    pub fn add(&mut self, title: &str, category: &str) -> Result<&Task> {
        if title.trim().is_empty() {
            return Err(Error::Validation("task title cannot be empty".to_string()));
        }

        let task = Task::new(title, category);
        info!(id = %task.id, category, "added task");
        self.tasks.push(task);
        let idx = self.tasks.len() - 1;
        Ok(&self.tasks[idx])
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn update(
        &mut self,
        id: Uuid,
        title: &str,
        category: &str,
        completed: bool,
    ) -> Result<&Task> {
        let task = self.get_mut(id)?;
        task.title = title.to_string();
        task.category = category.to_string();
        task.completed = completed;
        debug!("updated task");
        Ok(&*task)
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn toggle_completed(&mut self, id: Uuid) -> Result<bool> {
        let task = self.get_mut(id)?;
        task.completed = !task.completed;
        debug!(completed = task.completed, "toggled task");
        Ok(task.completed)
    }

    /// Removes the task with `id`. An unknown id is an error, never a no-op.
    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn delete(&mut self, id: Uuid) -> Result<Task> {
        let idx = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        let removed = self.tasks.remove(idx);
        info!(remaining = self.tasks.len(), "deleted task");
        Ok(removed)
    }

    #[tracing::instrument(skip_all, fields(incoming = tasks.len()))]
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        self.tasks.clear();
        self.merge(tasks);
    }

    /// Appends `tasks` after the existing ones. Incoming ids that collide
    /// with a stored id are replaced by fresh ones.
    #[tracing::instrument(skip_all, fields(incoming = tasks.len()))]
    pub fn merge(&mut self, tasks: Vec<Task>) {
        let mut seen: HashSet<Uuid> = self.tasks.iter().map(|t| t.id).collect();
        let mut rekeyed = 0_usize;
        for mut task in tasks {
            if !seen.insert(task.id) {
                task.id = Uuid::new_v4();
                seen.insert(task.id);
                rekeyed += 1;
            }
            self.tasks.push(task);
        }
        debug!(total = self.tasks.len(), rekeyed, "merged tasks");
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    pub fn get(&self, id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn get_mut(&mut self, id: Uuid) -> Result<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Resolves a full id or a unique prefix of it (hyphens optional, case-insensitive).
    pub fn resolve(&self, reference: &str) -> Result<Uuid> {
        let needle: String = reference
            .trim()
            .chars()
            .filter(|c| *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        if needle.is_empty() {
            return Err(Error::NotFound(reference.to_string()));
        }

        let mut matches = self
            .tasks
            .iter()
            .filter(|t| t.id.simple().to_string().starts_with(&needle));
        let first = matches
            .next()
            .ok_or_else(|| Error::NotFound(reference.to_string()))?;
        if matches.next().is_some() {
            return Err(Error::AmbiguousReference(reference.to_string()));
        }
        Ok(first.id)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
