use chrono::{DateTime, Utc};
use sqlx::FromRow;
use taskflow_shared::{normalize_title, Priority, Task};
use uuid::Uuid;

use crate::db::Database;
use crate::error::{RepositoryError, RepositoryResult};

const COLUMNS: &str = "id, title, completed, priority, created_at";

#[derive(Debug, FromRow)]
struct TaskRow {
    id: Uuid,
    title: String,
    completed: bool,
    priority: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = RepositoryError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let priority = row
            .priority
            .parse::<Priority>()
            .map_err(|err| RepositoryError::CorruptRow(err.to_string()))?;
        Ok(Task {
            id: row.id,
            title: row.title,
            completed: row.completed,
            priority,
            created_at: row.created_at,
        })
    }
}

fn validated_title(raw: &str) -> RepositoryResult<&str> {
    normalize_title(raw).ok_or_else(|| RepositoryError::Validation("Title is required".to_string()))
}

/// Row-level access to the `tasks` table.
#[derive(Debug, Clone)]
pub struct TaskRepository {
    db: Database,
}

impl TaskRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// All tasks, newest first. Storage failures are logged and yield an
    /// empty list so a reader is never blocked.
    pub async fn list(&self) -> Vec<Task> {
        match self.try_list().await {
            Ok(tasks) => tasks,
            Err(err) => {
                log::error!("failed to fetch tasks: {err}");
                Vec::new()
            }
        }
    }

    async fn try_list(&self) -> RepositoryResult<Vec<Task>> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {COLUMNS} FROM tasks ORDER BY created_at DESC, rowid DESC"
        ))
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter().map(Task::try_from).collect()
    }

    pub async fn create(&self, title: &str, priority: Priority) -> RepositoryResult<Task> {
        let title = validated_title(title)?;

        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "INSERT INTO tasks (id, title, completed, priority, created_at) \
             VALUES (?, ?, FALSE, ?, ?) RETURNING {COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(priority.as_str())
        .bind(Utc::now())
        .fetch_one(self.db.pool())
        .await?;

        let task = Task::try_from(row)?;
        log::info!("created task {} ({})", task.id, task.priority);
        Ok(task)
    }

    pub async fn set_completed(&self, id: Uuid, completed: bool) -> RepositoryResult<Task> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "UPDATE tasks SET completed = ? WHERE id = ? RETURNING {COLUMNS}"
        ))
        .bind(completed)
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or(RepositoryError::NotFound(id))?;

        Task::try_from(row)
    }

    pub async fn rename(&self, id: Uuid, title: &str) -> RepositoryResult<Task> {
        let title = validated_title(title)?;

        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "UPDATE tasks SET title = ? WHERE id = ? RETURNING {COLUMNS}"
        ))
        .bind(title)
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or(RepositoryError::NotFound(id))?;

        Task::try_from(row)
    }

    pub async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id));
        }
        log::info!("deleted task {id}");
        Ok(())
    }
}
