use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::task::Task;

/// Virtual category matching every task.
pub const HOME: &str = "Home";
/// Virtual category matching every completed task, whatever its category.
pub const COMPLETED: &str = "Completed";

pub const DEFAULT_ICON: &str = "📋";
/// Also used as "no color" by the renderer.
pub const DEFAULT_COLOR: &str = "#FFFFFF";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default = "default_color")]
    pub color: String,
    /// Cached number of matching tasks; refreshed by [`CategoryStore::recount`].
    #[serde(default)]
    pub count: u64,
}

fn default_icon() -> String {
    DEFAULT_ICON.to_string()
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

impl Category {
    pub fn new(name: &str, icon: &str, color: &str) -> Self {
        Self {
            name: name.to_string(),
            icon: icon.to_string(),
            color: color.to_string(),
            count: 0,
        }
    }

    pub fn is_virtual(&self) -> bool {
        self.name == HOME || self.name == COMPLETED
    }

    pub fn filter(&self) -> Filter {
        Filter::for_category(&self.name)
    }
}

pub fn default_categories() -> Vec<Category> {
    vec![
        Category::new(HOME, "🏠", DEFAULT_COLOR),
        Category::new(COMPLETED, "☑", DEFAULT_COLOR),
        Category::new("Personal", "🟣", "#c586ff"),
        Category::new("Work", "🟦", "#5ac8fa"),
        Category::new("Diet", "👍", "#ffcc00"),
    ]
}

#[derive(Debug, Clone)]
pub struct CategoryStore {
    categories: Vec<Category>,
    unique_names: bool,
}

impl CategoryStore {
    pub fn new(categories: Vec<Category>, unique_names: bool) -> Self {
        Self {
            categories,
            unique_names,
        }
    }

    pub fn with_defaults(unique_names: bool) -> Self {
        Self::new(default_categories(), unique_names)
    }

    #[tracing::instrument(skip(self))]
    pub fn add(&mut self, name: &str, icon: &str, color: &str) -> Result<&Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation(
                "category name cannot be empty".to_string(),
            ));
        }
        if self.unique_names && self.get(name).is_some() {
            return Err(Error::Validation(format!(
                "category already exists: {name}"
            )));
        }

        self.categories.push(Category::new(name, icon, color));
        info!(name, total = self.categories.len(), "added category");
        let idx = self.categories.len() - 1;
        Ok(&self.categories[idx])
    }

    #[tracing::instrument(skip_all)]
    pub fn recount(&mut self, tasks: &[Task]) {
        for category in &mut self.categories {
            category.count = category.filter().count(tasks);
        }
        debug!(
            categories = self.categories.len(),
            tasks = tasks.len(),
            "recounted categories"
        );
    }

    pub fn replace_all(&mut self, categories: Vec<Category>) {
        self.categories = categories;
    }

    pub fn get(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn names(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
