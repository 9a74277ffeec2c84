use chrono::Utc;
use sqlx::{Pool, Sqlite};

use crate::userdb::{errors::UserError, types::User};

pub(super) async fn create_tables_sqlite(pool: &Pool<Sqlite>, table: &str) -> Result<(), UserError> {
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id TEXT PRIMARY KEY NOT NULL,
            email TEXT NOT NULL,
            name TEXT NOT NULL,
            password_hash TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
        "#
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS idx_{}_email ON {table}(email COLLATE NOCASE)",
        table.replace('.', "_")
    ))
    .execute(pool)
    .await?;

    Ok(())
}

pub(super) async fn get_user_sqlite(
    pool: &Pool<Sqlite>,
    table: &str,
    id: &str,
) -> Result<Option<User>, UserError> {
    Ok(
        sqlx::query_as::<_, User>(&format!("SELECT * FROM {table} WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await?,
    )
}

pub(super) async fn get_user_by_email_sqlite(
    pool: &Pool<Sqlite>,
    table: &str,
    email: &str,
) -> Result<Option<User>, UserError> {
    Ok(sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT * FROM {table}
        WHERE email = ? COLLATE NOCASE
        ORDER BY created_at ASC
        LIMIT 1
        "#
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?)
}

pub(super) async fn insert_user_sqlite(
    pool: &Pool<Sqlite>,
    table: &str,
    user: User,
) -> Result<User, UserError> {
    sqlx::query(&format!(
        r#"
        INSERT INTO {table} (id, email, name, password_hash, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#
    ))
    .bind(&user.id)
    .bind(&user.email)
    .bind(&user.name)
    .bind(&user.password_hash)
    .bind(user.status.as_str())
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(pool)
    .await?;

    Ok(user)
}

pub(super) async fn update_user_sqlite(
    pool: &Pool<Sqlite>,
    table: &str,
    mut user: User,
) -> Result<User, UserError> {
    user.updated_at = Utc::now();

    let result = sqlx::query(&format!(
        r#"
        UPDATE {table} SET
            email = ?,
            name = ?,
            password_hash = ?,
            status = ?,
            updated_at = ?
        WHERE id = ?
        "#
    ))
    .bind(&user.email)
    .bind(&user.name)
    .bind(&user.password_hash)
    .bind(user.status.as_str())
    .bind(user.updated_at)
    .bind(&user.id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(UserError::NotFound);
    }
    Ok(user)
}

pub(super) async fn delete_user_sqlite(
    pool: &Pool<Sqlite>,
    table: &str,
    id: &str,
) -> Result<(), UserError> {
    sqlx::query(&format!("DELETE FROM {table} WHERE id = ?"))
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}
