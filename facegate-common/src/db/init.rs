//! Database initialization
//!
//! Opens the shared session and creates every table the node needs. All
//! statements are idempotent, so running them against an existing database
//! is safe.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open (or create) the database file and bootstrap the schema
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = open_session(&db_url).await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    init_schema(&pool).await?;
    Ok(pool)
}

/// Private in-memory database with the full schema (tests, demos)
pub async fn init_in_memory_database() -> Result<SqlitePool> {
    let pool = open_session("sqlite::memory:").await?;
    init_schema(&pool).await?;
    Ok(pool)
}

/// One long-lived connection: the pool never opens a second one and never
/// recycles the first, which also keeps in-memory databases alive.
async fn open_session(db_url: &str) -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect(db_url)
        .await?;

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    Ok(pool)
}

/// Create all tables if missing
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    create_users_table(pool).await?;
    create_rooms_table(pool).await?;
    create_admins_table(pool).await?;
    create_managers_table(pool).await?;
    create_user_face_descriptors_table(pool).await?;
    create_access_permissions_table(pool).await?;
    create_visit_reports_table(pool).await?;
    create_room_login_tokens_table(pool).await?;
    create_room_temp_tokens_table(pool).await?;
    create_admin_tokens_table(pool).await?;
    create_room_tasks_table(pool).await?;

    info!("Database schema ready");
    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            surname TEXT NOT NULL,
            extra_info TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_rooms_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rooms (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_admins_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS admins (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_managers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS managers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// `user_id` is nullable: a descriptor may exist before it is bound to a user
async fn create_user_face_descriptors_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_face_descriptors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER REFERENCES users(id) ON DELETE CASCADE,
            features TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_access_permissions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_room_access_permissions (
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            room_id INTEGER NOT NULL REFERENCES rooms(id) ON DELETE CASCADE,
            PRIMARY KEY (user_id, room_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_visit_reports_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS room_visit_reports (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            room_id INTEGER NOT NULL REFERENCES rooms(id),
            user_id INTEGER NOT NULL REFERENCES users(id),
            datetime TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_room_login_tokens_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS room_login_tokens (
            token TEXT PRIMARY KEY,
            room_id INTEGER NOT NULL UNIQUE REFERENCES rooms(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_room_temp_tokens_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS room_temp_tokens (
            token TEXT PRIMARY KEY,
            room_id INTEGER NOT NULL REFERENCES rooms(id) ON DELETE CASCADE,
            valid_before TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_room_temp_tokens_room_id ON room_temp_tokens(room_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_admin_tokens_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS admin_tokens (
            token TEXT PRIMARY KEY,
            admin_id INTEGER NOT NULL UNIQUE REFERENCES admins(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_room_tasks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS room_tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            room_id INTEGER NOT NULL REFERENCES rooms(id) ON DELETE CASCADE,
            manager_id INTEGER NOT NULL REFERENCES managers(id),
            body TEXT NOT NULL,
            status TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database_has_schema() {
        let pool = init_in_memory_database().await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();

        for expected in [
            "admin_tokens",
            "room_login_tokens",
            "room_tasks",
            "room_temp_tokens",
            "room_visit_reports",
            "user_face_descriptors",
            "user_room_access_permissions",
            "users",
        ] {
            assert!(names.contains(&expected), "missing table {}", expected);
        }
    }

    #[tokio::test]
    async fn test_schema_init_is_idempotent() {
        let pool = init_in_memory_database().await.unwrap();
        init_schema(&pool).await.unwrap();
        init_schema(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_foreign_keys_enforced() {
        let pool = init_in_memory_database().await.unwrap();

        let result = sqlx::query(
            "INSERT INTO room_temp_tokens (token, room_id, valid_before) VALUES ('t', 999, '2030-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await;

        assert!(result.is_err(), "temp token for missing room must be rejected");
    }

    #[tokio::test]
    async fn test_file_database_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("facegate.db");

        let pool = init_database(&path).await.unwrap();
        assert!(path.exists());
        pool.close().await;
    }
}
