use axum::{
    Json, debug_handler,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::SqlitePool;

use crate::{
    AppError, AppResult, AppState, db,
    relay::{Relay, RoomId},
};

use super::RoomCode;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PartyState {
    cake_cut: bool,
    video_call_active: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PartyStatePatch {
    cake_cut: Option<bool>,
    video_call_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateRoomQuery {
    #[serde(default)]
    party_state: Option<PartyStatePatch>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RoomView {
    code: String,
    host: String,
    created_at: String,
    message_count: i64,
    party_state: PartyState,
    /// Sockets currently joined to the live room.
    online: usize,
}

pub(crate) async fn ensure_exists(db_pool: &SqlitePool, code: &RoomCode) -> AppResult<()> {
    sqlx::query_as::<_, (i64,)>("SELECT 1 FROM rooms WHERE code = ?")
        .bind(code.as_str())
        .fetch_optional(db_pool)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::not_found("Room not found"))
}

async fn load(db_pool: &SqlitePool, relay: &Relay, code: &RoomCode) -> AppResult<RoomView> {
    let Some(room): Option<db::Room> = sqlx::query_as(
        "SELECT code, host, created_at, cake_cut, video_call_active FROM rooms WHERE code = ?",
    )
    .bind(code.as_str())
    .fetch_optional(db_pool)
    .await?
    else {
        return Err(AppError::not_found("Room not found"));
    };

    let (message_count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM messages WHERE room_code = ?")
            .bind(code.as_str())
            .fetch_one(db_pool)
            .await?;

    let online = RoomId::new(&room.code).map_or(0, |live| relay.member_count(&live));

    Ok(RoomView {
        code: room.code,
        host: room.host,
        created_at: room.created_at,
        message_count,
        party_state: PartyState {
            cake_cut: room.cake_cut,
            video_call_active: room.video_call_active,
        },
        online,
    })
}

#[debug_handler(state = AppState)]
pub(crate) async fn room(
    State(db_pool): State<SqlitePool>,
    State(relay): State<Relay>,
    Path(code): Path<String>,
) -> AppResult<Json<Value>> {
    let code = RoomCode::from_path(&code)?;
    let room = load(&db_pool, &relay, &code).await?;

    Ok(Json(json!({ "success": true, "room": room })))
}

#[debug_handler(state = AppState)]
pub(crate) async fn update_room(
    State(db_pool): State<SqlitePool>,
    State(relay): State<Relay>,
    Path(code): Path<String>,

    Json(UpdateRoomQuery { party_state }): Json<UpdateRoomQuery>,
) -> AppResult<Json<Value>> {
    let code = RoomCode::from_path(&code)?;

    if let Some(PartyStatePatch { cake_cut, video_call_active }) = party_state {
        sqlx::query(
            "UPDATE rooms
             SET cake_cut = COALESCE(?, cake_cut),
                 video_call_active = COALESCE(?, video_call_active)
             WHERE code = ?",
        )
        .bind(cake_cut)
        .bind(video_call_active)
        .bind(code.as_str())
        .execute(&db_pool)
        .await?;
    }

    let room = load(&db_pool, &relay, &code).await?;
    tracing::debug!(code = code.as_str(), "party state updated");

    Ok(Json(json!({ "success": true, "room": room })))
}

#[debug_handler]
pub(crate) async fn delete_room(
    State(db_pool): State<SqlitePool>,
    Path(code): Path<String>,
) -> AppResult<Json<Value>> {
    let code = RoomCode::from_path(&code)?;

    let mut tx = db_pool.begin().await?;
    sqlx::query("DELETE FROM messages WHERE room_code = ?")
        .bind(code.as_str())
        .execute(&mut *tx)
        .await?;
    let deleted = sqlx::query("DELETE FROM rooms WHERE code = ?")
        .bind(code.as_str())
        .execute(&mut *tx)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(AppError::not_found("Room not found"));
    }
    tx.commit().await?;

    tracing::info!(code = code.as_str(), "room deleted");
    Ok(Json(json!({ "success": true, "message": "Room deleted successfully" })))
}
