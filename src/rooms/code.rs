use rand::Rng;

use crate::{AppError, AppResult};

pub const CODE_LEN: usize = 6;
const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Six uppercase letters or digits. Lowercase input is accepted and
/// upper-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomCode(String);

impl RoomCode {
    pub fn parse(raw: &str) -> Option<RoomCode> {
        let code = raw.to_uppercase();
        let valid = code.len() == CODE_LEN && code.bytes().all(|b| ALPHABET.contains(&b));
        valid.then_some(RoomCode(code))
    }

    pub fn generate() -> RoomCode {
        let mut rng = rand::rng();
        RoomCode(
            (0..CODE_LEN)
                .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
                .collect(),
        )
    }

    pub(crate) fn from_path(raw: &str) -> AppResult<RoomCode> {
        RoomCode::parse(raw).ok_or_else(|| AppError::bad_request("Invalid room code format"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
