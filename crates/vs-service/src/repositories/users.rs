//! User repository.
//!
//! Read-only access to `user_table` for the login flow. Registration is
//! handled elsewhere; `create_user` exists for provisioning and tests.

use crate::errors::VsError;
use sqlx::PgPool;

/// User model (maps to `user_table`).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub uuid: String,
    pub name: String,
    pub mail: Option<String>,
    pub phone: Option<String>,
    /// bcrypt hash
    pub password: String,
}

/// Get user by mail address.
pub async fn get_by_mail(pool: &PgPool, mail: &str) -> Result<Option<User>, VsError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT uuid, name, mail, phone, password
        FROM user_table
        WHERE mail = $1
        LIMIT 1
        "#,
    )
    .bind(mail)
    .fetch_optional(pool)
    .await
    .map_err(|e| VsError::Database(format!("Failed to fetch user by mail: {}", e)))?;

    Ok(user)
}

/// Get user by phone number.
pub async fn get_by_phone(pool: &PgPool, phone: &str) -> Result<Option<User>, VsError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT uuid, name, mail, phone, password
        FROM user_table
        WHERE phone = $1
        LIMIT 1
        "#,
    )
    .bind(phone)
    .fetch_optional(pool)
    .await
    .map_err(|e| VsError::Database(format!("Failed to fetch user by phone: {}", e)))?;

    Ok(user)
}

/// Get user by uid.
pub async fn get_by_uid(pool: &PgPool, uid: &str) -> Result<Option<User>, VsError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT uuid, name, mail, phone, password
        FROM user_table
        WHERE uuid = $1
        "#,
    )
    .bind(uid)
    .fetch_optional(pool)
    .await
    .map_err(|e| VsError::Database(format!("Failed to fetch user by uid: {}", e)))?;

    Ok(user)
}

/// Insert a user. `password_hash` must already be a bcrypt hash.
pub async fn create_user(
    pool: &PgPool,
    uid: &str,
    name: &str,
    mail: Option<&str>,
    phone: Option<&str>,
    password_hash: &str,
) -> Result<User, VsError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO user_table (uuid, name, mail, phone, password)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING uuid, name, mail, phone, password
        "#,
    )
    .bind(uid)
    .bind(name)
    .bind(mail)
    .bind(phone)
    .bind(password_hash)
    .fetch_one(pool)
    .await
    .map_err(|e| VsError::Database(format!("Failed to create user: {}", e)))?;

    Ok(user)
}
