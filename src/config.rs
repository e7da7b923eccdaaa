//! Proxy configuration, read from a JSON file.
//!
//! ```json
//! {
//!   "listen": "0.0.0.0:8081",
//!   "upstream": "127.0.0.1:9000",
//!   "max_connections": 1000,
//!   "max_age": "1h 30m",
//!   "log_path": "/var/log/ws.log",
//!   "log_format": { "default": "$time_local $ws_opcode $ws_payload_size" }
//! }
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::{Result, StatError};
use crate::monitor::Limits;
use crate::template::LogFormats;
use crate::ws::decoder::DEFAULT_CAPTURE_LIMIT;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:8081";
pub const DEFAULT_STAT_PATH: &str = "/ws_stat";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub listen: SocketAddr,
    /// `host:port` of the websocket server being proxied.
    pub upstream: Option<String>,
    pub stat_path: String,
    pub max_connections: Option<u64>,
    /// Seconds as a number, or a duration such as `"90s"` or `"1h 30m"`.
    #[serde(deserialize_with = "deserialize_max_age")]
    pub max_age: Option<Duration>,
    pub log_path: Option<PathBuf>,
    pub log_format: LogFormats,
    pub payload_capture_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen: SocketAddr::from(([127, 0, 0, 1], 8081)),
            upstream: None,
            stat_path: DEFAULT_STAT_PATH.to_string(),
            max_connections: None,
            max_age: None,
            log_path: None,
            log_format: LogFormats::default(),
            payload_capture_limit: DEFAULT_CAPTURE_LIMIT,
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn validate(&self) -> Result<()> {
        match self.upstream.as_deref() {
            None | Some("") => {
                return Err(StatError::InvalidConfig(
                    "an upstream address is required".to_string(),
                ))
            }
            Some(_) => {}
        }
        if !self.stat_path.starts_with('/') {
            return Err(StatError::InvalidConfig(format!(
                "stat_path must start with '/': {}",
                self.stat_path
            )));
        }
        if self.max_connections == Some(0) {
            return Err(StatError::InvalidConfig(
                "max_connections must be positive".to_string(),
            ));
        }
        if self.max_age == Some(Duration::ZERO) {
            return Err(StatError::InvalidConfig(
                "max_age must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn limits(&self) -> Limits {
        Limits {
            max_connections: self.max_connections,
            max_age: self.max_age,
            payload_capture_limit: self.payload_capture_limit,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Seconds(u64),
    Text(String),
}

fn deserialize_max_age<'de, D>(deserializer: D) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawDuration>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawDuration::Seconds(seconds)) => Ok(Some(Duration::from_secs(seconds))),
        Some(RawDuration::Text(text)) => parse_duration(&text)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Parse `"30"`, `"30s"`, `"500ms"`, `"1h 30m"`, `"2d"`. A bare number is
/// seconds.
pub fn parse_duration(text: &str) -> std::result::Result<Duration, String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("empty duration".to_string());
    }
    let mut total = Duration::ZERO;
    let mut rest = text;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return Err(format!("invalid duration: {}", text));
        }
        let value: u64 = rest[..digits]
            .parse()
            .map_err(|_| format!("invalid duration: {}", text))?;
        rest = &rest[digits..];
        let unit_len = rest.find(|c: char| !c.is_ascii_alphabetic()).unwrap_or(rest.len());
        let out_of_range = || format!("duration out of range: {}", text);
        let seconds = |multiplier: u64| {
            value
                .checked_mul(multiplier)
                .map(Duration::from_secs)
                .ok_or_else(out_of_range)
        };
        let part = match &rest[..unit_len] {
            "" | "s" => seconds(1)?,
            "ms" => Duration::from_millis(value),
            "m" => seconds(60)?,
            "h" => seconds(60 * 60)?,
            "d" => seconds(24 * 60 * 60)?,
            unit => return Err(format!("unknown duration unit '{}' in {}", unit, text)),
        };
        total = total.checked_add(part).ok_or_else(out_of_range)?;
        rest = rest[unit_len..].trim_start();
    }
    Ok(total)
}
