use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Task lifecycle. ARCHIVED is terminal, the task-side soft-delete sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Active,
    InProgress,
    Completed,
    Archived,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub status: TaskStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

const TASK_COLUMNS: &str = "id, project_id, name, status, created_at";

/// Tasks of one project that have not been archived, newest first.
pub async fn list_by_project(db: &PgPool, project_id: Uuid) -> anyhow::Result<Vec<Task>> {
    let rows = sqlx::query_as::<_, Task>(&format!(
        r#"
        SELECT {TASK_COLUMNS}
        FROM tasks
        WHERE project_id = $1 AND status <> 'ARCHIVED'
        ORDER BY created_at DESC
        "#
    ))
    .bind(project_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// All non-archived tasks across projects, newest first.
pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<Task>> {
    let rows = sqlx::query_as::<_, Task>(&format!(
        r#"
        SELECT {TASK_COLUMNS}
        FROM tasks
        WHERE status <> 'ARCHIVED'
        ORDER BY created_at DESC
        "#
    ))
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn create(
    db: &PgPool,
    project_id: Uuid,
    name: &str,
    status: TaskStatus,
) -> anyhow::Result<Task> {
    let row = sqlx::query_as::<_, Task>(&format!(
        r#"
        INSERT INTO tasks (project_id, name, status)
        VALUES ($1, $2, $3)
        RETURNING {TASK_COLUMNS}
        "#
    ))
    .bind(project_id)
    .bind(name)
    .bind(status)
    .fetch_one(db)
    .await?;
    Ok(row)
}

/// Partial update, scoped to the parent: the WHERE clause enforces the
/// task/project linkage, so a mismatched parent reads as absent.
pub async fn update_in_project(
    db: &PgPool,
    task_id: Uuid,
    project_id: Uuid,
    name: Option<&str>,
    status: Option<TaskStatus>,
) -> anyhow::Result<Option<Task>> {
    let row = sqlx::query_as::<_, Task>(&format!(
        r#"
        UPDATE tasks
        SET name = COALESCE($3, name), status = COALESCE($4, status)
        WHERE id = $1 AND project_id = $2
        RETURNING {TASK_COLUMNS}
        "#
    ))
    .bind(task_id)
    .bind(project_id)
    .bind(name)
    .bind(status)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

/// Idempotent soft delete, same linkage scoping as update.
pub async fn soft_delete_in_project(
    db: &PgPool,
    task_id: Uuid,
    project_id: Uuid,
) -> anyhow::Result<Option<Task>> {
    let row = sqlx::query_as::<_, Task>(&format!(
        r#"
        UPDATE tasks
        SET status = 'ARCHIVED'
        WHERE id = $1 AND project_id = $2
        RETURNING {TASK_COLUMNS}
        "#
    ))
    .bind(task_id)
    .bind(project_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_uses_screaming_wire_names() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::Completed).unwrap(),
            r#""COMPLETED""#
        );
        let status: TaskStatus = serde_json::from_str(r#""ARCHIVED""#).unwrap();
        assert_eq!(status, TaskStatus::Archived);
    }

    #[test]
    fn task_json_roundtrips_through_the_cache_format() {
        let task = Task {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            name: "write report".into(),
            status: TaskStatus::Pending,
            created_at: OffsetDateTime::now_utc(),
        };
        let raw = serde_json::to_string(&vec![task.clone()]).unwrap();
        let back: Vec<Task> = serde_json::from_str(&raw).unwrap();
        assert_eq!(back[0].id, task.id);
        assert_eq!(back[0].project_id, task.project_id);
    }
}
