use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(16)
        .connect(database_url)
        .await
}

pub async fn migrate(db_pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS rooms (
            code TEXT PRIMARY KEY NOT NULL,
            host TEXT NOT NULL,
            created_at TEXT NOT NULL,
            cake_cut BOOLEAN NOT NULL DEFAULT 0,
            video_call_active BOOLEAN NOT NULL DEFAULT 0
        )",
    )
    .execute(db_pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            room_code TEXT NOT NULL REFERENCES rooms(code) ON DELETE CASCADE,
            user TEXT NOT NULL,
            text TEXT NOT NULL,
            timestamp TEXT NOT NULL
        )",
    )
    .execute(db_pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS messages_by_room ON messages (room_code, id)")
        .execute(db_pool)
        .await?;

    Ok(())
}

#[derive(Debug, sqlx::FromRow)]
pub struct Room {
    pub code: String,
    pub host: String,
    pub created_at: String,
    pub cake_cut: bool,
    pub video_call_active: bool,
}

#[derive(Debug, sqlx::FromRow, serde::Serialize)]
pub struct Message {
    pub user: String,
    pub text: String,
    pub timestamp: String,
}
