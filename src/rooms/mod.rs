mod code;
mod msg;
mod new;
mod room;

use axum::{Router, routing::get};

use crate::AppState;

pub use code::RoomCode;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(new::list_rooms).post(new::new_room))
        .route("/{code}", get(room::room).put(room::update_room).delete(room::delete_room))
        .route("/{code}/messages", get(msg::messages).post(msg::send_msg))
}
