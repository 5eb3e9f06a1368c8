//! Shared application state.
//!
//! Everything handlers need is constructed once at startup and passed in
//! explicitly through Axum's `State` extractor: the database pool, the field
//! cipher, the duplicate-guard policy flag, and the live notification
//! channel. No globals.

use crate::{config::Config, db::DbPool, notify::CheckinNotifier, services::crypto::FieldCipher};

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: DbPool,

    /// AES-256-GCM cipher for at-rest name/phone encryption
    pub cipher: FieldCipher,

    /// When true, loopback/private addresses bypass the duplicate guard
    pub relaxed_guard: bool,

    /// Broadcast channel feeding live dashboard streams
    pub notifier: CheckinNotifier,
}

impl AppState {
    pub fn new(pool: DbPool, config: &Config) -> Self {
        Self {
            pool,
            cipher: FieldCipher::from_passphrase(&config.encryption_key),
            relaxed_guard: config.relaxed_duplicate_guard,
            notifier: CheckinNotifier::new(),
        }
    }
}
