//! Room tasks assigned by managers

use async_trait::async_trait;
use facegate_common::{Outcome, Result};
use tracing::debug;

use super::Service;
use crate::db::TasksRepository;
use crate::models::{Task, TaskList, TaskStatus};

pub const NO_SUCH_TASK: &str = "No task with provided id.";
pub const TASK_OF_OTHER_ROOM: &str = "Room hasn't task with provided id.";
pub const UNKNOWN_MANAGER: &str = "Unknown manager.";
pub const UNKNOWN_ROOM: &str = "Unknown room.";

fn unknown_status_cause() -> String {
    let statuses: Vec<&str> = TaskStatus::ALL.iter().map(TaskStatus::as_str).collect();
    format!("Unknown status. Possible statuses: {}.", statuses.join(", "))
}

pub struct TasksService {
    repo: TasksRepository,
}

impl TasksService {
    pub fn new(repo: TasksRepository) -> Self {
        Self { repo }
    }

    pub async fn get_undone_tasks(&self, room_id: i64) -> Result<Outcome<TaskList>> {
        let tasks = self.repo.get_room_tasks(room_id, TaskStatus::Undone).await?;
        Ok(Outcome::ok(TaskList { tasks }))
    }

    pub async fn report_task_performed(
        &self,
        room_id: i64,
        task_id: i64,
        new_status: &str,
    ) -> Result<Outcome<()>> {
        let Some(task) = self.repo.get_task(task_id).await? else {
            return Ok(Outcome::error(NO_SUCH_TASK));
        };

        if task.room_id != room_id {
            return Ok(Outcome::error(TASK_OF_OTHER_ROOM));
        }

        let Ok(status) = new_status.parse::<TaskStatus>() else {
            return Ok(Outcome::error(unknown_status_cause()));
        };

        self.repo.update_task_status(status, &[task.id]).await?;
        debug!("Room {} set task {} to {}", room_id, task.id, status);
        Ok(Outcome::ok(()))
    }

    pub async fn add_task(&self, manager_id: i64, room_id: i64, body: &str) -> Result<Outcome<Task>> {
        if !self.repo.check_manager_exist(manager_id).await? {
            return Ok(Outcome::error(UNKNOWN_MANAGER));
        }
        if !self.repo.check_room_exist(room_id).await? {
            return Ok(Outcome::error(UNKNOWN_ROOM));
        }

        let task = self.repo.create_task(room_id, manager_id, body).await?;
        debug!("Manager {} added task {} for room {}", manager_id, task.id, room_id);
        Ok(Outcome::ok(task))
    }
}

#[async_trait]
impl Service for TasksService {
    fn name(&self) -> &'static str {
        "tasks"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facegate_common::db::init_in_memory_database;

    async fn setup() -> TasksService {
        let pool = init_in_memory_database().await.unwrap();
        sqlx::query("INSERT INTO rooms (id, name) VALUES (7, 'Lab'), (8, 'Hall')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO managers (id, name) VALUES (1, 'Grace')")
            .execute(&pool)
            .await
            .unwrap();
        TasksService::new(TasksRepository::new(pool))
    }

    #[test]
    fn test_unknown_status_cause_lists_all() {
        assert_eq!(
            unknown_status_cause(),
            "Unknown status. Possible statuses: UNDONE, DONE, CANCELLED, ERROR."
        );
    }

    #[tokio::test]
    async fn test_add_task_validates_references() {
        let service = setup().await;

        let outcome = service.add_task(2, 7, "x").await.unwrap();
        assert_eq!(outcome.cause(), Some(UNKNOWN_MANAGER));

        let outcome = service.add_task(1, 70, "x").await.unwrap();
        assert_eq!(outcome.cause(), Some(UNKNOWN_ROOM));

        let task = service.add_task(1, 7, "Close windows").await.unwrap().into_result().unwrap();
        assert_eq!(task.status, "UNDONE");
    }

    #[tokio::test]
    async fn test_report_moves_task_out_of_undone() {
        let service = setup().await;
        let task = service.add_task(1, 7, "Close windows").await.unwrap().into_result().unwrap();

        let listed = service.get_undone_tasks(7).await.unwrap().into_result().unwrap();
        assert_eq!(listed.tasks, vec![task.clone()]);

        let outcome = service.report_task_performed(7, task.id, "DONE").await.unwrap();
        assert!(outcome.is_success());

        let listed = service.get_undone_tasks(7).await.unwrap().into_result().unwrap();
        assert!(listed.tasks.is_empty());
    }

    #[tokio::test]
    async fn test_report_failures() {
        let service = setup().await;
        let task = service.add_task(1, 7, "Close windows").await.unwrap().into_result().unwrap();

        let outcome = service.report_task_performed(7, 999, "DONE").await.unwrap();
        assert_eq!(outcome.cause(), Some(NO_SUCH_TASK));

        let outcome = service.report_task_performed(8, task.id, "DONE").await.unwrap();
        assert_eq!(outcome.cause(), Some(TASK_OF_OTHER_ROOM));

        let outcome = service.report_task_performed(7, task.id, "BOGUS").await.unwrap();
        assert_eq!(
            outcome.cause(),
            Some("Unknown status. Possible statuses: UNDONE, DONE, CANCELLED, ERROR.")
        );
    }
}
