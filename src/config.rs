use std::net::SocketAddr;

use anyhow::{Context, ensure};
use axum::http::HeaderValue;

const DEFAULT_DATABASE_URL: &str = "sqlite://cakeroom.db?mode=rwc";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_SESSION_IDLE_MINUTES: i64 = 24 * 60;
// one year
const MAX_SESSION_IDLE_MINUTES: i64 = 365 * 24 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Single cross-origin caller allowed to use the API; `None` keeps it
    /// same-origin.
    pub cors_origin: Option<HeaderValue>,
    pub session_idle_minutes: i64,
}

impl Config {
    /// Reads `DATABASE_URL`, `BIND_ADDR`, `CORS_ORIGIN` and
    /// `SESSION_IDLE_MINUTES` from the environment or `.env`.
    pub fn from_env() -> anyhow::Result<Config> {
        let database_url =
            dotenv::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_owned());

        let bind_addr = dotenv::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_owned());
        let bind_addr: SocketAddr = bind_addr
            .parse()
            .with_context(|| format!("BIND_ADDR {bind_addr:?} is not a socket address"))?;

        let cors_origin = match dotenv::var("CORS_ORIGIN") {
            Ok(origin) if !origin.trim().is_empty() => {
                let value = origin
                    .trim()
                    .parse::<HeaderValue>()
                    .with_context(|| format!("CORS_ORIGIN {origin:?} is not a header value"))?;
                Some(value)
            }
            _ => None,
        };

        let session_idle_minutes = match dotenv::var("SESSION_IDLE_MINUTES") {
            Ok(minutes) => parse_idle_minutes(&minutes)?,
            Err(_) => DEFAULT_SESSION_IDLE_MINUTES,
        };

        Ok(Config {
            database_url,
            bind_addr,
            cors_origin,
            session_idle_minutes,
        })
    }
}

fn parse_idle_minutes(raw: &str) -> anyhow::Result<i64> {
    let minutes = raw
        .trim()
        .parse::<i64>()
        .with_context(|| format!("SESSION_IDLE_MINUTES {raw:?} is not a number"))?;
    ensure!(
        (1..=MAX_SESSION_IDLE_MINUTES).contains(&minutes),
        "SESSION_IDLE_MINUTES must be between 1 and {MAX_SESSION_IDLE_MINUTES}, got {minutes}"
    );
    Ok(minutes)
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: DEFAULT_DATABASE_URL.to_owned(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            cors_origin: None,
            session_idle_minutes: DEFAULT_SESSION_IDLE_MINUTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_minutes_within_range() {
        assert_eq!(parse_idle_minutes("30").unwrap(), 30);
        assert_eq!(parse_idle_minutes(" 1440 ").unwrap(), 1440);
        assert_eq!(
            parse_idle_minutes(&MAX_SESSION_IDLE_MINUTES.to_string()).unwrap(),
            MAX_SESSION_IDLE_MINUTES
        );
    }

    #[test]
    fn idle_minutes_out_of_range_or_garbage() {
        for raw in ["0", "-5", "9223372036854775807", "525601", "soon", ""] {
            assert!(parse_idle_minutes(raw).is_err(), "{raw:?} accepted");
        }
    }

    #[test]
    fn default_idle_minutes_is_accepted() {
        let minutes = Config::default().session_idle_minutes;
        assert_eq!(parse_idle_minutes(&minutes.to_string()).unwrap(), minutes);
    }
}
