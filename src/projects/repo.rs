use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Project lifecycle. INACTIVE is terminal: delete means status mutation,
/// never row removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Pending,
    Active,
    InProgress,
    Completed,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub deadline: Option<OffsetDateTime>,
    pub priority: Option<String>,
    pub client_name: Option<String>,
    pub status: ProjectStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

const PROJECT_COLUMNS: &str =
    "id, user_id, name, description, deadline, priority, client_name, status, created_at";

/// All projects that have not been soft-deleted, newest first.
pub async fn list_active(db: &PgPool) -> anyhow::Result<Vec<Project>> {
    let rows = sqlx::query_as::<_, Project>(&format!(
        r#"
        SELECT {PROJECT_COLUMNS}
        FROM projects
        WHERE status <> 'INACTIVE'
        ORDER BY created_at DESC
        "#
    ))
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Project>> {
    let row = sqlx::query_as::<_, Project>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

#[allow(clippy::too_many_arguments)]
pub async fn create(
    db: &PgPool,
    user_id: Uuid,
    name: &str,
    description: Option<&str>,
    deadline: Option<OffsetDateTime>,
    priority: Option<&str>,
    client_name: Option<&str>,
    status: ProjectStatus,
) -> anyhow::Result<Project> {
    let row = sqlx::query_as::<_, Project>(&format!(
        r#"
        INSERT INTO projects (user_id, name, description, deadline, priority, client_name, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {PROJECT_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(name)
    .bind(description)
    .bind(deadline)
    .bind(priority)
    .bind(client_name)
    .bind(status)
    .fetch_one(db)
    .await?;
    Ok(row)
}

/// Partial update; absent fields keep their stored value. Returns None when
/// the project does not exist.
#[allow(clippy::too_many_arguments)]
pub async fn update(
    db: &PgPool,
    id: Uuid,
    name: Option<&str>,
    description: Option<&str>,
    deadline: Option<OffsetDateTime>,
    priority: Option<&str>,
    client_name: Option<&str>,
    status: Option<ProjectStatus>,
) -> anyhow::Result<Option<Project>> {
    let row = sqlx::query_as::<_, Project>(&format!(
        r#"
        UPDATE projects
        SET name = COALESCE($2, name),
            description = COALESCE($3, description),
            deadline = COALESCE($4, deadline),
            priority = COALESCE($5, priority),
            client_name = COALESCE($6, client_name),
            status = COALESCE($7, status)
        WHERE id = $1
        RETURNING {PROJECT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(name)
    .bind(description)
    .bind(deadline)
    .bind(priority)
    .bind(client_name)
    .bind(status)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

/// Idempotent soft delete: re-applies INACTIVE when already deleted.
pub async fn soft_delete(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Project>> {
    let row = sqlx::query_as::<_, Project>(&format!(
        r#"
        UPDATE projects
        SET status = 'INACTIVE'
        WHERE id = $1
        RETURNING {PROJECT_COLUMNS}
        "#
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}
