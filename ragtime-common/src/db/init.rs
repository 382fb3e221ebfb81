//! Database initialization
//!
//! Creates the SQLite database (with default schema) on first run, enables
//! the pragmas every connection relies on, seeds the fixed role set, and
//! applies versioned migrations. Safe to call multiple times.

use crate::db::models::permission;
use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Fixed guid of the Fan role (default for new registrations)
pub const FAN_ROLE_GUID: &str = "00000000-0000-0000-0000-000000000001";
/// Fixed guid of the Moderator role
pub const MODERATOR_ROLE_GUID: &str = "00000000-0000-0000-0000-000000000002";
/// Fixed guid of the Administrator role
pub const ADMIN_ROLE_GUID: &str = "00000000-0000-0000-0000-000000000003";

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Use sqlite options to create database if it doesn't exist
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // Enable WAL mode for better write concurrency
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    // Set busy timeout
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Initialize an in-memory database (testing profile)
///
/// A single connection keeps the shared in-memory database alive for the
/// lifetime of the pool.
pub async fn init_database_in_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables, seed roles, run migrations, ensure default settings
///
/// Idempotent - safe to call multiple times.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_roles_table(pool).await?;
    create_users_table(pool).await?;
    create_compositions_table(pool).await?;
    create_follows_table(pool).await?;
    create_comments_table(pool).await?;
    create_sessions_table(pool).await?;
    create_settings_table(pool).await?;

    // Manual migrations (complex transformations, constraint additions)
    crate::db::migrations::run_migrations(pool).await?;

    // Initialize default settings
    init_default_settings(pool).await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_roles_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS roles (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            permissions INTEGER NOT NULL DEFAULT 0,
            is_default INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Seed the fixed role set if not present
    let fan = permission::FOLLOW | permission::COMMENT | permission::WRITE;
    let moderator = fan | permission::MODERATE;
    let administrator = moderator | permission::ADMIN;

    let roles = [
        (FAN_ROLE_GUID, "Fan", fan, 1_i64),
        (MODERATOR_ROLE_GUID, "Moderator", moderator, 0),
        (ADMIN_ROLE_GUID, "Administrator", administrator, 0),
    ];

    for (guid, name, permissions, is_default) in roles {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO roles (guid, name, permissions, is_default)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(guid)
        .bind(name)
        .bind(permissions)
        .bind(is_default)
        .execute(pool)
        .await?;
    }

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            guid TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role_id TEXT NOT NULL REFERENCES roles(guid),
            name TEXT,
            location TEXT,
            bio TEXT,
            last_seen TIMESTAMP,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_username ON users(username)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_compositions_table(pool: &SqlitePool) -> Result<()> {
    // The UNIQUE index on slug is added by migration v1
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS compositions (
            guid TEXT PRIMARY KEY,
            release_type INTEGER NOT NULL DEFAULT 1 CHECK (release_type IN (1, 2, 3)),
            title TEXT NOT NULL,
            description TEXT,
            slug TEXT NOT NULL,
            artist_id TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (length(title) > 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_compositions_artist ON compositions(artist_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_follows_table(pool: &SqlitePool) -> Result<()> {
    // Primary key enforces at most one follow per directed pair
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS follows (
            follower_id TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            followed_id TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (follower_id, followed_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_follows_followed ON follows(followed_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_comments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comments (
            guid TEXT PRIMARY KEY,
            body TEXT NOT NULL,
            artist_id TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            composition_id TEXT NOT NULL REFERENCES compositions(guid) ON DELETE CASCADE,
            disabled INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (length(body) > 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_comments_composition ON comments(composition_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token_hash TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            remember INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            expires_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores application configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize or update default settings
///
/// Ensures all required settings exist with default values. NULL values are
/// reset to defaults.
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    // Session settings
    ensure_setting(pool, "session_timeout_seconds", "86400").await?; // 1 day
    ensure_setting(pool, "remember_session_timeout_seconds", "31536000").await?; // 1 year

    // Pagination settings
    ensure_setting(pool, "compositions_per_page", "20").await?;
    ensure_setting(pool, "followers_per_page", "50").await?;
    ensure_setting(pool, "comments_per_page", "30").await?;

    info!("Default settings initialized");
    Ok(())
}

/// Ensure a setting exists with the specified default value
///
/// If the setting doesn't exist, it will be created with the default.
/// If the setting exists but has a NULL value, it will be reset to the default.
async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE key = ?)")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if !exists {
        // Use INSERT OR IGNORE to handle concurrent initialization race conditions
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(default_value)
            .execute(pool)
            .await?;

        info!("Initialized setting '{}' with default value: {}", key, default_value);
        return Ok(());
    }

    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if value.is_none() {
        sqlx::query("UPDATE settings SET value = ? WHERE key = ?")
            .bind(default_value)
            .bind(key)
            .execute(pool)
            .await?;

        tracing::warn!("Setting '{}' was NULL, reset to default: {}", key, default_value);
    }

    Ok(())
}

/// Read an integer setting, falling back to a default when missing or invalid
pub async fn get_setting_i64(pool: &SqlitePool, key: &str, default: i64) -> Result<i64> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?
        .flatten();

    Ok(value.and_then(|v| v.parse::<i64>().ok()).unwrap_or(default))
}
