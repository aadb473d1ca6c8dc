//! Room tasks

use facegate_common::Result;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::models::{Task, TaskStatus};

#[derive(Clone)]
pub struct TasksRepository {
    pool: SqlitePool,
}

impl TasksRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_room_tasks(&self, room_id: i64, status: TaskStatus) -> Result<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, room_id, manager_id, body, status FROM room_tasks
            WHERE room_id = ? AND status = ?
            ORDER BY id
            "#,
        )
        .bind(room_id)
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }

    pub async fn get_task(&self, id: i64) -> Result<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(
            "SELECT id, room_id, manager_id, body, status FROM room_tasks WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    /// Set the status of every listed task in one statement
    pub async fn update_task_status(&self, new_status: TaskStatus, task_ids: &[i64]) -> Result<()> {
        if task_ids.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE room_tasks SET status = ");
        builder.push_bind(new_status.as_str());
        builder.push(" WHERE id IN (");
        let mut ids = builder.separated(", ");
        for id in task_ids {
            ids.push_bind(*id);
        }
        ids.push_unseparated(")");

        let mut tx = self.pool.begin().await?;
        builder.build().execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn create_task(&self, room_id: i64, manager_id: i64, body: &str) -> Result<Task> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO room_tasks (room_id, manager_id, body, status)
            VALUES (?, ?, ?, ?)
            RETURNING id, room_id, manager_id, body, status
            "#,
        )
        .bind(room_id)
        .bind(manager_id)
        .bind(body)
        .bind(TaskStatus::Undone.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(task)
    }

    pub async fn check_manager_exist(&self, id: i64) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM managers WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    pub async fn check_room_exist(&self, id: i64) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM rooms WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }
}
