use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::category::{Category, default_categories};
use crate::error::{Error, Result, StorageError};
use crate::task::Task;

pub const TASKS_FILE: &str = "tasks.json";
pub const CATEGORIES_FILE: &str = "categories.json";

/// The two JSON documents backing the task and category stores.
#[derive(Debug, Clone)]
pub struct DataStore {
    pub data_dir: PathBuf,
    pub tasks_path: PathBuf,
    pub categories_path: PathBuf,
}

impl DataStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir).map_err(|err| Error::load(&data_dir, err))?;

        let tasks_path = data_dir.join(TASKS_FILE);
        let categories_path = data_dir.join(CATEGORIES_FILE);

        info!(
            data_dir = %data_dir.display(),
            tasks = %tasks_path.display(),
            categories = %categories_path.display(),
            "opened datastore"
        );

        Ok(Self {
            data_dir,
            tasks_path,
            categories_path,
        })
    }

    /// Missing file means no tasks yet.
    #[tracing::instrument(skip(self))]
    pub fn load_tasks(&self) -> Result<Vec<Task>> {
        Ok(load_json(&self.tasks_path)?.unwrap_or_default())
    }

    /// Missing file means the built-in categories.
    #[tracing::instrument(skip(self))]
    pub fn load_categories(&self) -> Result<Vec<Category>> {
        Ok(load_json(&self.categories_path)?.unwrap_or_else(default_categories))
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn save_tasks(&self, tasks: &[Task]) -> Result<()> {
        save_json_atomic(&self.tasks_path, tasks)
    }

    #[tracing::instrument(skip(self, categories))]
    pub fn save_categories(&self, categories: &[Category]) -> Result<()> {
        save_json_atomic(&self.categories_path, categories)
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn export_tasks(&self, tasks: &[Task], destination: &Path) -> Result<()> {
        save_json_atomic(destination, tasks)
    }

    /// Unlike the store file, an import source has to exist.
    #[tracing::instrument(skip(self))]
    pub fn import_tasks(&self, source: &Path) -> Result<Vec<Task>> {
        load_json(source)?.ok_or_else(|| {
            Error::load(
                source,
                io::Error::new(io::ErrorKind::NotFound, "no such file"),
            )
        })
    }

    /// Copies an unreadable document aside so that a later save cannot
    /// destroy it. Returns the copy's path, or `None` when there is no file.
    #[tracing::instrument(skip(self))]
    pub fn preserve_unreadable(&self, path: &Path) -> Result<Option<PathBuf>> {
        if !path.exists() {
            return Ok(None);
        }
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let backup = self.data_dir.join(format!("{name}.corrupt-{timestamp}"));
        fs::copy(path, &backup).map_err(|err| Error::save(&backup, err))?;
        warn!(
            from = %path.display(),
            backup = %backup.display(),
            "kept a copy of unreadable document"
        );
        Ok(Some(backup))
    }
}

#[tracing::instrument]
fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<Vec<T>>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(file = %path.display(), "document absent");
            return Ok(None);
        }
        Err(err) => return Err(Error::load(path, err)),
    };

    let items: Vec<T> = serde_json::from_str(&text).map_err(|err| Error::load(path, err))?;
    debug!(file = %path.display(), count = items.len(), "loaded document");
    Ok(Some(items))
}

#[tracing::instrument(skip(items))]
fn save_json_atomic<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    debug!(file = %path.display(), count = items.len(), "saving json atomically");

    write_atomic(path, items).map_err(|err| Error::save(path, err))?;

    info!(file = %path.display(), count = items.len(), "saved document");
    Ok(())
}

fn write_atomic<T: Serialize>(path: &Path, items: &[T]) -> std::result::Result<(), StorageError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let json = serde_json::to_vec_pretty(items)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(&json)?;
    temp.flush()?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|err| err.error)?;
    Ok(())
}
