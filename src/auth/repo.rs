use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Account role, gating access per route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

/// Account lifecycle. Accounts are never hard-deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum UserStatus {
    Active,
    Deleted,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: Option<String>,
    pub role: Role,
    pub status: UserStatus,
    pub created_at: OffsetDateTime,
}

const USER_COLUMNS: &str = "id, email, password_hash, name, role, status, created_at";

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn create(
        db: &PgPool,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, role)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Partial profile update; absent fields keep their stored value.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        name: Option<&str>,
        email: Option<&str>,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name), email = COALESCE($3, email)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Soft delete: the row stays, status flips to DELETED.
    pub async fn soft_delete(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET status = 'DELETED'
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@b.com".into(),
            password_hash: "secret-hash".into(),
            name: None,
            role: Role::User,
            status: UserStatus::Active,
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("password_hash"));
        assert!(json.contains("a@b.com"));
    }

    #[test]
    fn role_and_status_use_screaming_wire_names() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), r#""ADMIN""#);
        assert_eq!(
            serde_json::to_string(&UserStatus::Deleted).unwrap(),
            r#""DELETED""#
        );
        let role: Role = serde_json::from_str(r#""USER""#).unwrap();
        assert_eq!(role, Role::User);
    }
}
