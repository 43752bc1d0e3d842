use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use uuid::Uuid;

use crate::category::{Category, CategoryStore, HOME, default_categories};
use crate::config::Settings;
use crate::datastore::DataStore;
use crate::error::{Error, Result};
use crate::filter;
use crate::store::TaskStore;
use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ImportMode {
    /// Discard the current tasks and keep only the imported ones.
    Replace,
    /// Append the imported tasks after the current ones.
    Merge,
}

/// Application state owned by the front end.
///
/// Every task mutation goes through the same steps: mutate the in-memory
/// store, recount categories, then persist the task document. A failed save
/// is returned to the caller but the mutation stays applied in memory.
///
/// A document that could not be read and could not be copied aside is never
/// written during the session; saves to it fail with [`Error::Save`].
#[derive(Debug)]
pub struct App {
    datastore: DataStore,
    tasks: TaskStore,
    categories: CategoryStore,
    selected: String,
    settings: Settings,
    unpreserved: Vec<PathBuf>,
}

impl App {
    /// Opens the state backed by `datastore`, falling back to empty tasks and
    /// default categories when a document cannot be read. The recovered
    /// errors are returned so the caller can report them.
    pub fn open(datastore: DataStore, settings: Settings) -> (Self, Vec<Error>) {
        let mut app = Self {
            datastore,
            tasks: TaskStore::default(),
            categories: CategoryStore::with_defaults(settings.unique_categories),
            selected: HOME.to_string(),
            settings,
            unpreserved: Vec::new(),
        };
        let recovered = app.load();
        (app, recovered)
    }

    #[tracing::instrument(skip(self))]
    pub fn load(&mut self) -> Vec<Error> {
        let mut recovered = Vec::new();
        self.unpreserved.clear();

        let tasks = match self.datastore.load_tasks() {
            Ok(tasks) => tasks,
            Err(err) => {
                warn!(error = %err, "could not load tasks; starting with none");
                self.preserve(err, &mut recovered);
                Vec::new()
            }
        };
        let categories = match self.datastore.load_categories() {
            Ok(categories) => categories,
            Err(err) => {
                warn!(error = %err, "could not load categories; using defaults");
                self.preserve(err, &mut recovered);
                default_categories()
            }
        };

        self.tasks.replace_all(tasks);
        self.categories.replace_all(categories);
        self.categories.recount(self.tasks.tasks());

        info!(
            tasks = self.tasks.len(),
            categories = self.categories.len(),
            recovered = recovered.len(),
            "loaded state"
        );
        recovered
    }

    /// Adds a task; `category` defaults to the configured default category.
    #[tracing::instrument(skip(self))]
    pub fn add_task(&mut self, title: &str, category: Option<&str>) -> Result<Uuid> {
        let category = category.unwrap_or(&self.settings.default_category).to_string();
        let id = self.tasks.add(title, &category)?.id;
        self.after_task_mutation()?;
        Ok(id)
    }

    #[tracing::instrument(skip(self))]
    pub fn update_task(
        &mut self,
        id: Uuid,
        title: &str,
        category: &str,
        completed: bool,
    ) -> Result<()> {
        self.tasks.update(id, title, category, completed)?;
        self.after_task_mutation()
    }

    #[tracing::instrument(skip(self))]
    pub fn toggle_completed(&mut self, id: Uuid) -> Result<bool> {
        let completed = self.tasks.toggle_completed(id)?;
        self.after_task_mutation()?;
        Ok(completed)
    }

    #[tracing::instrument(skip(self))]
    pub fn delete_task(&mut self, id: Uuid) -> Result<Task> {
        let removed = self.tasks.delete(id)?;
        self.after_task_mutation()?;
        Ok(removed)
    }

    /// Removes every task and returns how many there were.
    #[tracing::instrument(skip(self))]
    pub fn clear_all(&mut self) -> Result<usize> {
        let removed = self.tasks.len();
        self.tasks.clear();
        info!(removed, "cleared all tasks");
        self.after_task_mutation()?;
        Ok(removed)
    }

    #[tracing::instrument(skip(self))]
    pub fn add_category(
        &mut self,
        name: &str,
        icon: Option<&str>,
        color: Option<&str>,
    ) -> Result<()> {
        let icon = icon.unwrap_or(&self.settings.default_icon).to_string();
        let color = color.unwrap_or(&self.settings.default_color).to_string();
        self.categories.add(name, &icon, &color)?;
        self.categories.recount(self.tasks.tasks());
        self.ensure_writable(&self.datastore.categories_path)?;
        self.datastore.save_categories(self.categories.categories())
    }

    /// Any name is accepted; unknown names simply show nothing.
    pub fn select_category(&mut self, name: &str) {
        self.selected = name.to_string();
    }

    pub fn selected_category(&self) -> &str {
        &self.selected
    }

    pub fn visible_tasks(&self) -> Vec<&Task> {
        filter::visible_tasks(self.tasks.tasks(), &self.selected)
    }

    #[tracing::instrument(skip(self))]
    pub fn save(&self) -> Result<()> {
        self.ensure_writable(&self.datastore.tasks_path)?;
        self.datastore.save_tasks(self.tasks.tasks())?;
        self.ensure_writable(&self.datastore.categories_path)?;
        self.datastore.save_categories(self.categories.categories())
    }

    #[tracing::instrument(skip(self))]
    pub fn export(&self, destination: &Path) -> Result<usize> {
        self.datastore
            .export_tasks(self.tasks.tasks(), destination)?;
        info!(destination = %destination.display(), count = self.tasks.len(), "exported tasks");
        Ok(self.tasks.len())
    }

    /// Reads tasks from `source` and replaces or extends the current list.
    /// Returns the number of imported tasks. A failed read changes nothing.
    #[tracing::instrument(skip(self))]
    pub fn import(&mut self, source: &Path, mode: ImportMode) -> Result<usize> {
        let imported = self.datastore.import_tasks(source)?;
        let count = imported.len();
        match mode {
            ImportMode::Replace => self.tasks.replace_all(imported),
            ImportMode::Merge => self.tasks.merge(imported),
        }
        info!(source = %source.display(), count, ?mode, "imported tasks");
        self.after_task_mutation()?;
        Ok(count)
    }

    /// Flushes both documents before exit.
    #[tracing::instrument(skip(self))]
    pub fn shutdown(&self) -> Result<()> {
        self.save()?;
        info!("state flushed");
        Ok(())
    }

    pub fn resolve(&self, reference: &str) -> Result<Uuid> {
        self.tasks.resolve(reference)
    }

    pub fn task(&self, id: Uuid) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn tasks(&self) -> &[Task] {
        self.tasks.tasks()
    }

    pub fn categories(&self) -> &[Category] {
        self.categories.categories()
    }

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.get(name)
    }

    pub fn datastore(&self) -> &DataStore {
        &self.datastore
    }

    /// Records `err` and copies its document aside. When the copy fails the
    /// document is marked unpreserved and the copy error is recorded too.
    fn preserve(&mut self, err: Error, recovered: &mut Vec<Error>) {
        if let Error::Load { path, .. } = &err
            && let Err(copy_err) = self.datastore.preserve_unreadable(path)
        {
            warn!(
                document = %path.display(),
                error = %copy_err,
                "could not copy unreadable document aside; it will not be overwritten"
            );
            self.unpreserved.push(path.clone());
            recovered.push(copy_err);
        }
        recovered.push(err);
    }

    fn ensure_writable(&self, path: &Path) -> Result<()> {
        if self.unpreserved.iter().any(|p| p == path) {
            return Err(Error::save(
                path,
                io::Error::other("unreadable document has no backup; refusing to overwrite it"),
            ));
        }
        Ok(())
    }

    fn after_task_mutation(&mut self) -> Result<()> {
        self.categories.recount(self.tasks.tasks());
        self.ensure_writable(&self.datastore.tasks_path)?;
        self.datastore.save_tasks(self.tasks.tasks())
    }
}
