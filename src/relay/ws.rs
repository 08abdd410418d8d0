use std::collections::HashSet;

use axum::{
    debug_handler,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tower_sessions::Session;

use crate::{AppResult, session};

use super::{ClientEvent, ConnectionId, OUTBOX_CAPACITY, Relay, RoomId};

#[debug_handler(state = crate::AppState)]
pub async fn relay_ws(
    State(relay): State<Relay>,
    session: Session,
    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let hosted: HashSet<RoomId> = session::hosted_rooms(&session)
        .await?
        .iter()
        .filter_map(|code| RoomId::new(code))
        .collect();

    Ok(ws.on_upgrade(move |socket| serve(socket, relay, hosted)))
}

async fn serve(socket: WebSocket, relay: Relay, hosted: HashSet<RoomId>) {
    let (tx, mut rx) = mpsc::channel(OUTBOX_CAPACITY);
    let conn_id = relay.connect(tx, hosted);
    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!(conn_id = %conn_id, error = %err, "failed to encode event");
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let inbound = relay.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(frame) = receiver.next().await {
            match frame {
                Ok(Message::Text(text)) => dispatch(&inbound, conn_id, text.as_str()),
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(err) => {
                    tracing::debug!(conn_id = %conn_id, error = %err, "websocket receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    };

    relay.disconnect(conn_id);
}

fn dispatch(relay: &Relay, conn_id: ConnectionId, frame: &str) {
    let event = match ClientEvent::parse(frame) {
        Ok(event) => event,
        Err(err) => {
            tracing::warn!(conn_id = %conn_id, error = %err, "dropping malformed frame");
            return;
        }
    };

    if let Err(err) = relay.handle(conn_id, event) {
        tracing::debug!(conn_id = %conn_id, error = %err, "dropping event");
    }
}
