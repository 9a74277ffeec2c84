use sqlx::{Pool, Sqlite, types::Json};

use crate::identity::{
    errors::IdentityError,
    types::{Identity, RemoveOutcome},
};

pub(super) async fn create_tables_sqlite(
    pool: &Pool<Sqlite>,
    table: &str,
) -> Result<(), IdentityError> {
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id TEXT PRIMARY KEY NOT NULL,
            user_id TEXT NOT NULL,
            provider TEXT NOT NULL,
            provider_user_id TEXT NOT NULL,
            email TEXT,
            name TEXT,
            avatar_url TEXT,
            access_token TEXT NOT NULL,
            refresh_token TEXT,
            token_expires_at TIMESTAMP,
            raw_profile TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL,
            UNIQUE(provider, provider_user_id)
        )
        "#
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS idx_{}_user_id ON {table}(user_id)",
        table.replace('.', "_")
    ))
    .execute(pool)
    .await?;

    Ok(())
}

pub(super) async fn get_by_provider_sqlite(
    pool: &Pool<Sqlite>,
    table: &str,
    provider: &str,
    provider_user_id: &str,
) -> Result<Option<Identity>, IdentityError> {
    Ok(sqlx::query_as::<_, Identity>(&format!(
        "SELECT * FROM {table} WHERE provider = ? AND provider_user_id = ?"
    ))
    .bind(provider)
    .bind(provider_user_id)
    .fetch_optional(pool)
    .await?)
}

pub(super) async fn get_for_user_sqlite(
    pool: &Pool<Sqlite>,
    table: &str,
    user_id: &str,
    provider: &str,
) -> Result<Option<Identity>, IdentityError> {
    Ok(sqlx::query_as::<_, Identity>(&format!(
        "SELECT * FROM {table} WHERE user_id = ? AND provider = ? ORDER BY created_at ASC LIMIT 1"
    ))
    .bind(user_id)
    .bind(provider)
    .fetch_optional(pool)
    .await?)
}

pub(super) async fn list_for_user_sqlite(
    pool: &Pool<Sqlite>,
    table: &str,
    user_id: &str,
) -> Result<Vec<Identity>, IdentityError> {
    Ok(sqlx::query_as::<_, Identity>(&format!(
        "SELECT * FROM {table} WHERE user_id = ? ORDER BY created_at ASC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}

pub(super) async fn insert_identity_sqlite(
    pool: &Pool<Sqlite>,
    table: &str,
    identity: Identity,
) -> Result<Identity, IdentityError> {
    sqlx::query(&format!(
        r#"
        INSERT INTO {table}
        (id, user_id, provider, provider_user_id, email, name, avatar_url,
         access_token, refresh_token, token_expires_at, raw_profile, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#
    ))
    .bind(&identity.id)
    .bind(&identity.user_id)
    .bind(&identity.provider)
    .bind(&identity.provider_user_id)
    .bind(&identity.email)
    .bind(&identity.name)
    .bind(&identity.avatar_url)
    .bind(&identity.access_token)
    .bind(&identity.refresh_token)
    .bind(identity.token_expires_at)
    .bind(Json(&identity.raw_profile))
    .bind(identity.created_at)
    .bind(identity.updated_at)
    .execute(pool)
    .await?;

    Ok(identity)
}

pub(super) async fn update_login_sqlite(
    pool: &Pool<Sqlite>,
    table: &str,
    identity: Identity,
) -> Result<Identity, IdentityError> {
    let result = sqlx::query(&format!(
        r#"
        UPDATE {table} SET
            email = ?,
            name = ?,
            avatar_url = ?,
            access_token = ?,
            refresh_token = ?,
            token_expires_at = ?,
            raw_profile = ?,
            updated_at = ?
        WHERE id = ?
        "#
    ))
    .bind(&identity.email)
    .bind(&identity.name)
    .bind(&identity.avatar_url)
    .bind(&identity.access_token)
    .bind(&identity.refresh_token)
    .bind(identity.token_expires_at)
    .bind(Json(&identity.raw_profile))
    .bind(identity.updated_at)
    .bind(&identity.id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(IdentityError::NotFound);
    }
    Ok(identity)
}

/// SQLite serializes writers, so a single conditional DELETE both counts and
/// removes atomically.
pub(super) async fn remove_for_user_sqlite(
    pool: &Pool<Sqlite>,
    table: &str,
    user_id: &str,
    provider: &str,
    keep_last: bool,
) -> Result<RemoveOutcome, IdentityError> {
    let result = sqlx::query(&format!(
        r#"
        DELETE FROM {table}
        WHERE user_id = ? AND provider = ?
          AND (? = 0 OR EXISTS (
                SELECT 1 FROM {table} WHERE user_id = ? AND provider <> ?
          ))
        "#
    ))
    .bind(user_id)
    .bind(provider)
    .bind(keep_last)
    .bind(user_id)
    .bind(provider)
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        return Ok(RemoveOutcome::Removed(result.rows_affected()));
    }

    let (remaining,): (i64,) = sqlx::query_as(&format!(
        "SELECT COUNT(*) FROM {table} WHERE user_id = ? AND provider = ?"
    ))
    .bind(user_id)
    .bind(provider)
    .fetch_one(pool)
    .await?;

    Ok(if remaining == 0 {
        RemoveOutcome::NotFound
    } else {
        RemoveOutcome::WouldOrphan
    })
}
