//! First-run admin key bootstrap.
//!
//! A fresh deployment has no API keys, which would lock operators out of
//! event creation entirely. On startup, if the `api_keys` table is empty,
//! one admin key is generated, stored hashed, and printed to the log once.
//! Idempotent: any existing key (active or not) disables it.

use rand::{Rng, distributions::Alphanumeric};

use crate::{db::DbPool, error::AppError, middleware::auth::hash_api_key};

/// Length of the generated plaintext key.
const KEY_LEN: usize = 48;

/// Create the initial admin API key when none exists.
///
/// Should be called after migrations on startup. The plaintext key is only
/// ever available in this one log line; the database holds the SHA-256 hash.
pub async fn bootstrap_admin_key(pool: &DbPool) -> Result<(), AppError> {
    let key_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM api_keys")
        .fetch_one(pool)
        .await?;

    if key_count > 0 {
        return Ok(());
    }

    let api_key = generate_api_key();
    let key_hash = hash_api_key(&api_key);

    sqlx::query(
        "INSERT INTO api_keys (key_hash, label, role) VALUES ($1, 'bootstrap admin', 'admin')",
    )
    .bind(&key_hash)
    .execute(pool)
    .await?;

    tracing::warn!(
        "no API keys found; generated bootstrap admin key: {api_key} (shown once, store it now)"
    );

    Ok(())
}

fn generate_api_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(KEY_LEN)
        .map(char::from)
        .collect()
}
