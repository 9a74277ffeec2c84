use sqlx::{Pool, Postgres, types::Json};

use crate::identity::{
    errors::IdentityError,
    types::{Identity, RemoveOutcome},
};

pub(super) async fn create_tables_postgres(
    pool: &Pool<Postgres>,
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
            token_expires_at TIMESTAMPTZ,
            raw_profile JSONB NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL,
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

pub(super) async fn get_by_provider_postgres(
    pool: &Pool<Postgres>,
    table: &str,
    provider: &str,
    provider_user_id: &str,
) -> Result<Option<Identity>, IdentityError> {
    Ok(sqlx::query_as::<_, Identity>(&format!(
        "SELECT * FROM {table} WHERE provider = $1 AND provider_user_id = $2"
    ))
    .bind(provider)
    .bind(provider_user_id)
    .fetch_optional(pool)
    .await?)
}

pub(super) async fn get_for_user_postgres(
    pool: &Pool<Postgres>,
    table: &str,
    user_id: &str,
    provider: &str,
) -> Result<Option<Identity>, IdentityError> {
    Ok(sqlx::query_as::<_, Identity>(&format!(
        "SELECT * FROM {table} WHERE user_id = $1 AND provider = $2 ORDER BY created_at ASC LIMIT 1"
    ))
    .bind(user_id)
    .bind(provider)
    .fetch_optional(pool)
    .await?)
}

pub(super) async fn list_for_user_postgres(
    pool: &Pool<Postgres>,
    table: &str,
    user_id: &str,
) -> Result<Vec<Identity>, IdentityError> {
    Ok(sqlx::query_as::<_, Identity>(&format!(
        "SELECT * FROM {table} WHERE user_id = $1 ORDER BY created_at ASC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}

pub(super) async fn insert_identity_postgres(
    pool: &Pool<Postgres>,
    table: &str,
    identity: Identity,
) -> Result<Identity, IdentityError> {
    sqlx::query(&format!(
        r#"
        INSERT INTO {table}
        (id, user_id, provider, provider_user_id, email, name, avatar_url,
         access_token, refresh_token, token_expires_at, raw_profile, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
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

pub(super) async fn update_login_postgres(
    pool: &Pool<Postgres>,
    table: &str,
    identity: Identity,
) -> Result<Identity, IdentityError> {
    let result = sqlx::query(&format!(
        r#"
        UPDATE {table} SET
            email = $1,
            name = $2,
            avatar_url = $3,
            access_token = $4,
            refresh_token = $5,
            token_expires_at = $6,
            raw_profile = $7,
            updated_at = $8
        WHERE id = $9
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

/// Locks every identity row of the user before counting, so concurrent
/// removals for the same user are serialized.
pub(super) async fn remove_for_user_postgres(
    pool: &Pool<Postgres>,
    table: &str,
    user_id: &str,
    provider: &str,
    keep_last: bool,
) -> Result<RemoveOutcome, IdentityError> {
    let mut tx = pool.begin().await?;

    let providers: Vec<(String,)> = sqlx::query_as(&format!(
        "SELECT provider FROM {table} WHERE user_id = $1 FOR UPDATE"
    ))
    .bind(user_id)
    .fetch_all(&mut *tx)
    .await?;

    let matching = providers.iter().filter(|(p,)| p == provider).count();
    let outcome = if matching == 0 {
        RemoveOutcome::NotFound
    } else if keep_last && matching == providers.len() {
        RemoveOutcome::WouldOrphan
    } else {
        let result = sqlx::query(&format!(
            "DELETE FROM {table} WHERE user_id = $1 AND provider = $2"
        ))
        .bind(user_id)
        .bind(provider)
        .execute(&mut *tx)
        .await?;
        RemoveOutcome::Removed(result.rows_affected())
    };

    tx.commit().await?;
    Ok(outcome)
}
