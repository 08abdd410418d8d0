use axum::{Json, debug_handler, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tower_sessions::Session;

use crate::{AppError, AppResult, session};

use super::RoomCode;

const MAX_CODE_ATTEMPTS: usize = 10;
const LIST_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub(crate) struct NewRoomQuery {
    #[serde(default)]
    host: Option<String>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RoomSummary {
    code: String,
    host: String,
    created_at: String,
    message_count: i64,
    cake_cut: bool,
}

#[debug_handler]
pub(crate) async fn new_room(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(NewRoomQuery { host }): Json<NewRoomQuery>,
) -> AppResult<Json<Value>> {
    let host = host.as_deref().map(str::trim).unwrap_or_default();
    if host.is_empty() {
        return Err(AppError::bad_request("Host name is required"));
    }

    let created_at = OffsetDateTime::now_utc().format(&Rfc3339)?;
    let code = insert_with_fresh_code(&db_pool, host, &created_at, RoomCode::generate).await?;
    session::record_hosted_room(&session, code.as_str()).await?;

    tracing::info!(code = code.as_str(), host, "room created");
    Ok(Json(json!({ "success": true, "roomCode": code.as_str() })))
}

/// Draws random codes until one inserts cleanly. The primary key does the
/// uniqueness check, so two creators racing cannot get the same code.
async fn insert_with_fresh_code(
    db_pool: &SqlitePool,
    host: &str,
    created_at: &str,
    mut generate: impl FnMut() -> RoomCode,
) -> AppResult<RoomCode> {
    for attempt in 1..=MAX_CODE_ATTEMPTS {
        let code = generate();
        let inserted = sqlx::query("INSERT INTO rooms (code, host, created_at) VALUES (?, ?, ?)")
            .bind(code.as_str())
            .bind(host)
            .bind(created_at)
            .execute(db_pool)
            .await;

        match inserted {
            Ok(_) => return Ok(code),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                tracing::debug!(code = code.as_str(), attempt, "room code taken");
            }
            Err(err) => return Err(err.into()),
        }
    }

    tracing::warn!(attempts = MAX_CODE_ATTEMPTS, "no free room code found");
    Err(AppError::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Unable to generate unique room code. Please try again.",
    ))
}

#[debug_handler]
pub(crate) async fn list_rooms(State(db_pool): State<SqlitePool>) -> AppResult<Json<Value>> {
    let rooms: Vec<RoomSummary> = sqlx::query_as(
        "SELECT r.code, r.host, r.created_at, COUNT(m.id) AS message_count, r.cake_cut
         FROM rooms r LEFT JOIN messages m ON m.room_code = r.code
         GROUP BY r.code
         ORDER BY r.created_at DESC, r.rowid DESC
         LIMIT ?",
    )
    .bind(LIST_LIMIT)
    .fetch_all(&db_pool)
    .await?;

    Ok(Json(json!({ "success": true, "rooms": rooms })))
}
