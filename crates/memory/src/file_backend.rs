//! File-based store: human-inspectable JSON under one root directory.
//!
//! Layout:
//!
//! ```text
//! <root>/memory/<agent>__<principal>.json   full message list per scope
//! <root>/artifacts/<principal>/<path>       artifacts as real files
//! <root>/tasks.json                         every task, creation order
//! <root>/configs.json                       persona overrides
//! <root>/history/<session>.jsonl            one message per line
//! ```
//!
//! Whole-file rewrites happen under a write lock, so concurrent writers in
//! one process never interleave. Across processes the last write wins.

use async_trait::async_trait;
use boardroom_core::error::StoreError;
use boardroom_core::message::ConversationMessage;
use boardroom_core::store::{
    ArtifactStore, ConfigOverride, ConfigStore, HistoryStore, MemoryStore, NewTask, Task,
    TaskStore, TaskUpdate,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::normalize_path;

pub struct FileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Create a store rooted at `root`. Directories are created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        debug!(root = %root.display(), "File store ready");
        Self {
            root,
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn memory_path(&self, agent_id: &str, principal_id: &str) -> PathBuf {
        self.root
            .join("memory")
            .join(format!("{}__{}.json", sanitize(agent_id), sanitize(principal_id)))
    }

    fn artifact_root(&self, principal_id: &str) -> PathBuf {
        self.root.join("artifacts").join(sanitize(principal_id))
    }

    fn history_path(&self, session_id: &str) -> PathBuf {
        self.root.join("history").join(format!("{}.jsonl", sanitize(session_id)))
    }

    async fn read_json<T: DeserializeOwned + Default>(&self, path: &Path) -> Result<T, StoreError> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                StoreError::QueryFailed(format!("Corrupted file {}: {e}", path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
            Err(e) => Err(StoreError::Storage(format!("Failed to read {}: {e}", path.display()))),
        }
    }

    async fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(value)
            .map_err(|e| StoreError::Storage(format!("Failed to serialize: {e}")))?;
        write_file(path, &content).await
    }
}

/// Keep ids filesystem-safe.
fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .collect()
}

async fn ensure_parent(path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to create {}: {e}", parent.display())))?;
    }
    Ok(())
}

async fn write_file(path: &Path, content: &str) -> Result<(), StoreError> {
    ensure_parent(path).await?;
    tokio::fs::write(path, content)
        .await
        .map_err(|e| StoreError::Storage(format!("Failed to write {}: {e}", path.display())))
}

/// Relative paths of every file under `root`, `/`-separated and sorted.
async fn walk_files(root: &Path) -> Result<Vec<String>, StoreError> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(StoreError::Storage(format!("Failed to list {}: {e}", dir.display()))),
        };
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))?
        {
            let path = entry.path();
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            if file_type.is_dir() {
                pending.push(path);
            } else if let Ok(rel) = path.strip_prefix(root) {
                let rel: Vec<String> = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                found.push(rel.join("/"));
            }
        }
    }

    found.sort();
    Ok(found)
}

#[async_trait]
impl MemoryStore for FileStore {
    async fn get(&self, agent_id: &str, principal_id: &str) -> Result<Vec<ConversationMessage>, StoreError> {
        self.read_json(&self.memory_path(agent_id, principal_id)).await
    }

    async fn put(
        &self,
        agent_id: &str,
        principal_id: &str,
        messages: &[ConversationMessage],
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.write_json(&self.memory_path(agent_id, principal_id), messages).await
    }
}

#[async_trait]
impl ArtifactStore for FileStore {
    async fn list(&self, principal_id: &str) -> Result<Vec<String>, StoreError> {
        walk_files(&self.artifact_root(principal_id)).await
    }

    async fn save(&self, path: &str, content: &str, agent_id: &str, principal_id: &str) -> Result<(), StoreError> {
        let rel = normalize_path(path)?;
        let full = self.artifact_root(principal_id).join(&rel);
        let _guard = self.write_lock.lock().await;
        write_file(&full, content).await?;
        debug!(path = %rel, agent_id, "Artifact saved");
        Ok(())
    }

    async fn load(&self, path: &str, principal_id: &str) -> Result<Option<String>, StoreError> {
        let rel = normalize_path(path)?;
        let full = self.artifact_root(principal_id).join(rel);
        match tokio::fs::read_to_string(&full).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            // Reading a directory lands here on most platforms
            Err(e) if full.is_dir() => {
                debug!(error = %e, "Artifact path is a directory");
                Ok(None)
            }
            Err(e) => Err(StoreError::Storage(format!("Failed to read {}: {e}", full.display()))),
        }
    }
}

#[async_trait]
impl TaskStore for FileStore {
    async fn create(&self, task: NewTask) -> Result<Task, StoreError> {
        let _guard = self.write_lock.lock().await;
        let path = self.root.join("tasks.json");
        let mut tasks: Vec<Task> = self.read_json(&path).await?;
        let task = Task::from_new(task);
        tasks.push(task.clone());
        self.write_json(&path, &tasks).await?;
        Ok(task)
    }

    async fn list(&self) -> Result<Vec<Task>, StoreError> {
        self.read_json(&self.root.join("tasks.json")).await
    }

    async fn update(&self, id: &str, update: TaskUpdate) -> Result<Option<Task>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let path = self.root.join("tasks.json");
        let mut tasks: Vec<Task> = self.read_json(&path).await?;
        let Some(task) = tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        task.apply(update);
        let updated = task.clone();
        self.write_json(&path, &tasks).await?;
        Ok(Some(updated))
    }
}

#[async_trait]
impl ConfigStore for FileStore {
    async fn list_overrides(&self) -> Result<Vec<ConfigOverride>, StoreError> {
        self.read_json(&self.root.join("configs.json")).await
    }

    async fn upsert_override(&self, agent_id: &str, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let path = self.root.join("configs.json");
        let mut configs: Vec<ConfigOverride> = self.read_json(&path).await?;
        configs.retain(|c| !(c.agent_id == agent_id && c.key == key));
        configs.push(ConfigOverride::new(agent_id, key, value));
        self.write_json(&path, &configs).await
    }
}

#[async_trait]
impl HistoryStore for FileStore {
    async fn load_history(&self, session_id: &str) -> Result<Vec<ConversationMessage>, StoreError> {
        let path = self.history_path(session_id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Storage(format!("Failed to read {}: {e}", path.display()))),
        };

        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(msg) => Some(msg),
                Err(e) => {
                    warn!(error = %e, session_id, "Skipping corrupted history line");
                    None
                }
            })
            .collect())
    }

    async fn append_history(&self, session_id: &str, message: &ConversationMessage) -> Result<(), StoreError> {
        let path = self.history_path(session_id);
        let mut line = serde_json::to_string(message)
            .map_err(|e| StoreError::Storage(format!("Failed to serialize message: {e}")))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        ensure_parent(&path).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open {}: {e}", path.display())))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to append history: {e}")))?;
        file.flush()
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to flush history: {e}")))
    }
}
