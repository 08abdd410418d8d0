use axum::{
    Json, debug_handler,
    extract::{Path, State},
};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{AppError, AppResult, db};

use super::{RoomCode, room::ensure_exists};

pub(crate) const MAX_MESSAGE_LEN: usize = 1000;

#[derive(Debug, Deserialize)]
pub(crate) struct SendMessageQuery {
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

/// Returns the trimmed `(user, text)` pair ready to store. Length is counted
/// in UTF-16 code units, the way browsers count it.
pub(crate) fn validate(query: SendMessageQuery) -> AppResult<(String, String)> {
    let SendMessageQuery { user, text } = query;
    let (Some(user), Some(text)) = (user, text) else {
        return Err(AppError::bad_request("User name and message text are required"));
    };
    if user.is_empty() || text.is_empty() {
        return Err(AppError::bad_request("User name and message text are required"));
    }
    if user.trim().is_empty() || text.trim().is_empty() {
        return Err(AppError::bad_request("User name and message text cannot be empty"));
    }
    if text.encode_utf16().count() > MAX_MESSAGE_LEN {
        return Err(AppError::bad_request(format!(
            "Message text is too long (max {MAX_MESSAGE_LEN} characters)"
        )));
    }

    Ok((user.trim().to_owned(), text.trim().to_owned()))
}

#[debug_handler]
pub(crate) async fn messages(
    State(db_pool): State<SqlitePool>,
    Path(code): Path<String>,
) -> AppResult<Json<Value>> {
    let code = RoomCode::from_path(&code)?;
    ensure_exists(&db_pool, &code).await?;

    let messages: Vec<db::Message> =
        sqlx::query_as("SELECT user, text, timestamp FROM messages WHERE room_code = ? ORDER BY id")
            .bind(code.as_str())
            .fetch_all(&db_pool)
            .await?;

    Ok(Json(json!({ "success": true, "messages": messages })))
}

#[debug_handler]
pub(crate) async fn send_msg(
    State(db_pool): State<SqlitePool>,
    Path(code): Path<String>,
    Json(query): Json<SendMessageQuery>,
) -> AppResult<Json<Value>> {
    let code = RoomCode::from_path(&code)?;
    let (user, text) = validate(query)?;
    ensure_exists(&db_pool, &code).await?;

    let timestamp = OffsetDateTime::now_utc().format(&Rfc3339)?;

    // the insert holds the write lock, so the count below sees exactly the
    // rows up to and including this one
    let mut tx = db_pool.begin().await?;
    sqlx::query("INSERT INTO messages (room_code, user, text, timestamp) VALUES (?, ?, ?, ?)")
        .bind(code.as_str())
        .bind(&user)
        .bind(&text)
        .bind(&timestamp)
        .execute(&mut *tx)
        .await?;

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE room_code = ?")
        .bind(code.as_str())
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(Json(json!({
        "success": true,
        "message": {
            "id": format!("msg_{}", count - 1),
            "user": user,
            "text": text,
            "timestamp": timestamp,
        }
    })))
}
