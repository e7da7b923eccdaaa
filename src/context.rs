//! Per-connection metadata and the per-call context handed to template
//! variable resolvers.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::ws::{Direction, FrameEvent};

/// Request-line data captured when the upgrade request arrived.
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    /// `GET /chat HTTP/1.1`
    pub request: Option<String>,
    pub uri: Option<String>,
    pub remote_user: Option<String>,
    pub remote_addr: Option<SocketAddr>,
    pub server_addr: Option<SocketAddr>,
    pub upstream_addr: Option<String>,
}

/// Identity and timing of one websocket connection.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub id: String,
    pub opened_at: Instant,
    pub request: RequestInfo,
}
impl ConnectionInfo {
    pub fn new(request: RequestInfo, opened_at: Instant) -> Self {
        ConnectionInfo {
            id: Uuid::new_v4().simple().to_string(),
            opened_at,
            request,
        }
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.opened_at)
    }
}

/// Everything a resolver may look at while one log line is rendered.
#[derive(Debug, Clone, Copy)]
pub struct EventContext<'a> {
    pub connection: &'a ConnectionInfo,
    /// Unset for lifecycle events.
    pub direction: Option<Direction>,
    /// Unset for lifecycle events.
    pub frame: Option<&'a FrameEvent>,
    pub now: Instant,
    pub wall_clock: DateTime<Utc>,
}
impl<'a> EventContext<'a> {
    pub fn lifecycle(connection: &'a ConnectionInfo, now: Instant) -> Self {
        EventContext {
            connection,
            direction: None,
            frame: None,
            now,
            wall_clock: Utc::now(),
        }
    }

    pub fn frame(
        connection: &'a ConnectionInfo,
        direction: Direction,
        frame: &'a FrameEvent,
        now: Instant,
    ) -> Self {
        EventContext {
            connection,
            direction: Some(direction),
            frame: Some(frame),
            now,
            wall_clock: Utc::now(),
        }
    }
}
