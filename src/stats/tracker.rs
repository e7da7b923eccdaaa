use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Upgrade accepted, upstream not yet connected.
    Opening,
    Active,
    /// A close was forced; waiting for the transport to finish.
    Closing,
    Closed,
}

/// Lifecycle of one websocket connection, including the age limit.
#[derive(Debug)]
pub struct ConnectionTracker {
    state: ConnectionState,
    opened_at: Instant,
    max_age: Option<Duration>,
}

impl ConnectionTracker {
    pub fn new(opened_at: Instant, max_age: Option<Duration>) -> Self {
        ConnectionTracker {
            state: ConnectionState::Opening,
            opened_at,
            max_age,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// `Opening -> Active`. Returns false from any other state.
    pub fn activate(&mut self) -> bool {
        if self.state != ConnectionState::Opening {
            return false;
        }
        self.state = ConnectionState::Active;
        true
    }

    /// Called on every byte delivery. Moves an active connection that has
    /// reached `max_age` to `Closing` and reports true, once.
    pub fn check_age(&mut self, now: Instant) -> bool {
        let max_age = match self.max_age {
            Some(max_age) => max_age,
            None => return false,
        };
        if self.state != ConnectionState::Active {
            return false;
        }
        if now.saturating_duration_since(self.opened_at) < max_age {
            return false;
        }
        self.state = ConnectionState::Closing;
        true
    }

    /// Moves to `Closed` and returns the state it left, or `None` when the
    /// connection was already closed.
    pub fn close(&mut self) -> Option<ConnectionState> {
        if self.state == ConnectionState::Closed {
            return None;
        }
        Some(std::mem::replace(&mut self.state, ConnectionState::Closed))
    }
}
