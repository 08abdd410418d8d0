use tower_sessions::{Session, session};

/// Room codes this browser created through `POST /api/rooms`.
pub const HOSTED_ROOMS: &str = "hosted_rooms";

pub async fn hosted_rooms(session: &Session) -> Result<Vec<String>, session::Error> {
    Ok(session.get::<Vec<String>>(HOSTED_ROOMS).await?.unwrap_or_default())
}

pub async fn record_hosted_room(session: &Session, code: &str) -> Result<(), session::Error> {
    let mut rooms = hosted_rooms(session).await?;
    rooms.push(code.to_owned());
    session.insert(HOSTED_ROOMS, rooms).await
}
