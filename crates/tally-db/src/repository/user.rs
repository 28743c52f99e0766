//! # User Repository
//!
//! The users collection: who may act on the register and in which role.
//! Session handling itself lives outside this crate; the command layer hands
//! over a user id and gets back a [`RequestContext`].

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::{Actor, CoreError, RequestContext, User, UserRole, ValidationError};

const USER_COLUMNS: &str = "id, display_name, role, is_active, created_at";

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Registers a user.
    pub async fn create(&self, display_name: &str, role: UserRole) -> DbResult<User> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(ValidationError::Required {
                field: "display_name".to_string(),
            }
            .into());
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            display_name: display_name.to_string(),
            role,
            is_active: true,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO users (id, display_name, role, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&user.id)
        .bind(&user.display_name)
        .bind(user.role)
        .bind(user.is_active)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        info!(id = %user.id, role = ?user.role, "User created");
        Ok(user)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Active users ordered by name.
    pub async fn list_active(&self) -> DbResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE is_active = 1 ORDER BY display_name COLLATE NOCASE"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE users SET is_active = 0 WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }
        Ok(())
    }

    /// Builds a request context for an authenticated user id.
    ///
    /// Unknown and deactivated users fail with `Authentication`.
    pub async fn resolve_context(&self, user_id: &str) -> DbResult<RequestContext> {
        debug!(user_id = %user_id, "Resolving request context");

        match self.get_by_id(user_id).await? {
            Some(user) if user.is_active => Ok(RequestContext::for_actor(Actor::from(&user))),
            Some(_) => {
                warn!(user_id = %user_id, "Session for deactivated user");
                Err(CoreError::authentication("user is deactivated").into())
            }
            None => {
                warn!(user_id = %user_id, "Session for unknown user");
                Err(CoreError::authentication("unknown user").into())
            }
        }
    }
}
