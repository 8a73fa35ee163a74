//! SQLite store.
//!
//! One database file holds every store:
//! - `agent_memory`: full message list per (agent, principal), JSON-encoded
//! - `agent_files`: artifacts keyed by (principal, path)
//! - `agent_tasks`: tasks, ordered by insertion
//! - `agent_configs`: persona overrides keyed by (agent, key)
//! - `session_history`: append-only shared transcripts
//!
//! Writes use `ON CONFLICT ... DO UPDATE` upserts, so the last write wins.

use async_trait::async_trait;
use boardroom_core::error::StoreError;
use boardroom_core::message::ConversationMessage;
use boardroom_core::store::{
    ArtifactStore, ConfigOverride, ConfigStore, HistoryStore, MemoryStore, NewTask, Task,
    TaskPriority, TaskStatus, TaskStore, TaskUpdate,
};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::normalize_path;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) a database and run migrations.
    ///
    /// Pass `"sqlite::memory:"` for an ephemeral database. In-memory databases
    /// are per-connection, so the pool is pinned to a single long-lived one.
    pub async fn new(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let in_memory = url.contains(":memory:");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None::<std::time::Duration>)
                .max_lifetime(None::<std::time::Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(4)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite store initialized at {url}");
        Ok(store)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        let statements = [
            (
                "agent_memory",
                r#"
                CREATE TABLE IF NOT EXISTS agent_memory (
                    agent_id     TEXT NOT NULL,
                    principal_id TEXT NOT NULL,
                    history      TEXT NOT NULL DEFAULT '[]',
                    updated_at   TEXT NOT NULL,
                    PRIMARY KEY (agent_id, principal_id)
                )
                "#,
            ),
            (
                "agent_files",
                r#"
                CREATE TABLE IF NOT EXISTS agent_files (
                    principal_id TEXT NOT NULL,
                    path         TEXT NOT NULL,
                    content      TEXT NOT NULL,
                    agent_id     TEXT NOT NULL,
                    updated_at   TEXT NOT NULL,
                    PRIMARY KEY (principal_id, path)
                )
                "#,
            ),
            (
                "agent_tasks",
                r#"
                CREATE TABLE IF NOT EXISTS agent_tasks (
                    iid          INTEGER PRIMARY KEY AUTOINCREMENT,
                    id           TEXT UNIQUE NOT NULL,
                    title        TEXT NOT NULL,
                    description  TEXT NOT NULL DEFAULT '',
                    assigned_to  TEXT,
                    priority     TEXT NOT NULL,
                    status       TEXT NOT NULL,
                    created_at   TEXT NOT NULL
                )
                "#,
            ),
            (
                "agent_configs",
                r#"
                CREATE TABLE IF NOT EXISTS agent_configs (
                    agent_id   TEXT NOT NULL,
                    key        TEXT NOT NULL,
                    value      TEXT NOT NULL,
                    seq        INTEGER NOT NULL,
                    PRIMARY KEY (agent_id, key)
                )
                "#,
            ),
            (
                "session_history",
                r#"
                CREATE TABLE IF NOT EXISTS session_history (
                    iid        INTEGER PRIMARY KEY AUTOINCREMENT,
                    session_id TEXT NOT NULL,
                    message    TEXT NOT NULL
                )
                "#,
            ),
            (
                "session index",
                "CREATE INDEX IF NOT EXISTS idx_session_history ON session_history(session_id, iid)",
            ),
        ];

        for (name, sql) in statements {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::MigrationFailed(format!("{name}: {e}")))?;
        }

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn row_to_task(row: &sqlx::sqlite::SqliteRow) -> Result<Task, StoreError> {
        let get = |col: &str| -> Result<String, StoreError> {
            row.try_get(col)
                .map_err(|e| StoreError::QueryFailed(format!("{col} column: {e}")))
        };

        let created_at = chrono::DateTime::parse_from_rfc3339(&get("created_at")?)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        let assigned_to: Option<String> = row
            .try_get("assigned_to")
            .map_err(|e| StoreError::QueryFailed(format!("assigned_to column: {e}")))?;
        let status_raw = get("status")?;
        let status = TaskStatus::parse(&status_raw).unwrap_or_else(|| {
            warn!(status = %status_raw, "Unknown task status, treating as open");
            TaskStatus::Open
        });

        Ok(Task {
            id: get("id")?,
            title: get("title")?,
            description: get("description")?,
            assigned_to,
            priority: TaskPriority::parse_lenient(&get("priority")?),
            status,
            created_at,
        })
    }

    async fn fetch_task(&self, id: &str) -> Result<Option<Task>, StoreError> {
        let row = sqlx::query("SELECT * FROM agent_tasks WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("SELECT task: {e}")))?;
        row.as_ref().map(Self::row_to_task).transpose()
    }
}

fn decode_messages(json: &str) -> Result<Vec<ConversationMessage>, StoreError> {
    serde_json::from_str(json).map_err(|e| StoreError::QueryFailed(format!("Corrupted history: {e}")))
}

#[async_trait]
impl MemoryStore for SqliteStore {
    async fn get(&self, agent_id: &str, principal_id: &str) -> Result<Vec<ConversationMessage>, StoreError> {
        let row = sqlx::query("SELECT history FROM agent_memory WHERE agent_id = ?1 AND principal_id = ?2")
            .bind(agent_id)
            .bind(principal_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("SELECT memory: {e}")))?;

        match row {
            Some(row) => {
                let history: String = row
                    .try_get("history")
                    .map_err(|e| StoreError::QueryFailed(format!("history column: {e}")))?;
                decode_messages(&history)
            }
            None => Ok(Vec::new()),
        }
    }

    async fn put(
        &self,
        agent_id: &str,
        principal_id: &str,
        messages: &[ConversationMessage],
    ) -> Result<(), StoreError> {
        let history = serde_json::to_string(messages)
            .map_err(|e| StoreError::Storage(format!("History serialization: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO agent_memory (agent_id, principal_id, history, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(agent_id, principal_id) DO UPDATE SET
                history = excluded.history,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(agent_id)
        .bind(principal_id)
        .bind(&history)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("UPSERT memory failed: {e}")))?;

        debug!(agent_id, principal_id, count = messages.len(), "Memory saved");
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for SqliteStore {
    async fn list(&self, principal_id: &str) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query("SELECT path FROM agent_files WHERE principal_id = ?1 ORDER BY path")
            .bind(principal_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("SELECT files: {e}")))?;

        rows.iter()
            .map(|r| {
                r.try_get("path")
                    .map_err(|e| StoreError::QueryFailed(format!("path column: {e}")))
            })
            .collect()
    }

    async fn save(&self, path: &str, content: &str, agent_id: &str, principal_id: &str) -> Result<(), StoreError> {
        let path = normalize_path(path)?;
        sqlx::query(
            r#"
            INSERT INTO agent_files (principal_id, path, content, agent_id, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(principal_id, path) DO UPDATE SET
                content = excluded.content,
                agent_id = excluded.agent_id,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(principal_id)
        .bind(&path)
        .bind(content)
        .bind(agent_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("UPSERT file failed: {e}")))?;
        Ok(())
    }

    async fn load(&self, path: &str, principal_id: &str) -> Result<Option<String>, StoreError> {
        let path = normalize_path(path)?;
        let row = sqlx::query("SELECT content FROM agent_files WHERE principal_id = ?1 AND path = ?2")
            .bind(principal_id)
            .bind(&path)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("SELECT file: {e}")))?;

        row.map(|r| {
            r.try_get("content")
                .map_err(|e| StoreError::QueryFailed(format!("content column: {e}")))
        })
        .transpose()
    }
}

#[async_trait]
impl TaskStore for SqliteStore {
    async fn create(&self, task: NewTask) -> Result<Task, StoreError> {
        let task = Task::from_new(task);
        sqlx::query(
            r#"
            INSERT INTO agent_tasks (id, title, description, assigned_to, priority, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.assigned_to)
        .bind(task.priority.as_str())
        .bind(task.status.as_str())
        .bind(task.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT task failed: {e}")))?;
        Ok(task)
    }

    async fn list(&self) -> Result<Vec<Task>, StoreError> {
        let rows = sqlx::query("SELECT * FROM agent_tasks ORDER BY iid")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("SELECT tasks: {e}")))?;
        rows.iter().map(Self::row_to_task).collect()
    }

    async fn update(&self, id: &str, update: TaskUpdate) -> Result<Option<Task>, StoreError> {
        let Some(mut task) = self.fetch_task(id).await? else {
            return Ok(None);
        };
        task.apply(update);

        sqlx::query("UPDATE agent_tasks SET assigned_to = ?1, priority = ?2, status = ?3 WHERE id = ?4")
            .bind(&task.assigned_to)
            .bind(task.priority.as_str())
            .bind(task.status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("UPDATE task failed: {e}")))?;
        Ok(Some(task))
    }
}

#[async_trait]
impl ConfigStore for SqliteStore {
    async fn list_overrides(&self) -> Result<Vec<ConfigOverride>, StoreError> {
        let rows = sqlx::query("SELECT agent_id, key, value FROM agent_configs ORDER BY seq")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("SELECT configs: {e}")))?;

        rows.iter()
            .map(|r| {
                let col = |name: &str| -> Result<String, StoreError> {
                    r.try_get(name)
                        .map_err(|e| StoreError::QueryFailed(format!("{name} column: {e}")))
                };
                Ok(ConfigOverride::new(col("agent_id")?, col("key")?, col("value")?))
            })
            .collect()
    }

    async fn upsert_override(&self, agent_id: &str, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO agent_configs (agent_id, key, value, seq)
            VALUES (?1, ?2, ?3, (SELECT COALESCE(MAX(seq), 0) + 1 FROM agent_configs))
            ON CONFLICT(agent_id, key) DO UPDATE SET
                value = excluded.value,
                seq = excluded.seq
            "#,
        )
        .bind(agent_id)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("UPSERT config failed: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for SqliteStore {
    async fn load_history(&self, session_id: &str) -> Result<Vec<ConversationMessage>, StoreError> {
        let rows = sqlx::query("SELECT message FROM session_history WHERE session_id = ?1 ORDER BY iid")
            .bind(session_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("SELECT history: {e}")))?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            let raw: String = row
                .try_get("message")
                .map_err(|e| StoreError::QueryFailed(format!("message column: {e}")))?;
            match serde_json::from_str(&raw) {
                Ok(msg) => messages.push(msg),
                Err(e) => warn!(error = %e, session_id, "Skipping corrupted history row"),
            }
        }
        Ok(messages)
    }

    async fn append_history(&self, session_id: &str, message: &ConversationMessage) -> Result<(), StoreError> {
        let raw = serde_json::to_string(message)
            .map_err(|e| StoreError::Storage(format!("Message serialization: {e}")))?;
        sqlx::query("INSERT INTO session_history (session_id, message) VALUES (?1, ?2)")
            .bind(session_id)
            .bind(&raw)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("INSERT history failed: {e}")))?;
        Ok(())
    }
}
