use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::ws::Direction;

/// One counter per 128 byte slot, so writers on different directions never
/// share a cache line.
#[derive(Debug, Default)]
#[repr(align(128))]
struct Slot(AtomicU64);
impl Slot {
    fn add(&self, value: u64) {
        self.0.fetch_add(value, Ordering::Relaxed);
    }
    fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Monotonic counters for one direction.
#[derive(Debug, Default)]
pub struct DirectionCounters {
    frames: Slot,
    total_payload_size: Slot,
    total_size: Slot,
}
impl DirectionCounters {
    /// Raw bytes seen on the wire, headers included.
    pub fn record_bytes(&self, bytes: u64) {
        self.total_size.add(bytes);
    }
    pub fn record_frame(&self, payload_size: u64) {
        self.frames.add(1);
        self.total_payload_size.add(payload_size);
    }
    pub fn snapshot(&self) -> DirectionSnapshot {
        DirectionSnapshot {
            frames: self.frames.get(),
            payload_bytes: self.total_payload_size.get(),
            raw_bytes: self.total_size.get(),
        }
    }
}

/// Process-wide traffic statistics.
///
/// Every field is updated with a single atomic add, so one instance can be
/// shared by all connections behind an `Arc` with no locking.
#[derive(Debug, Default)]
pub struct TrafficCounters {
    active: Slot,
    inbound: DirectionCounters,
    outbound: DirectionCounters,
}

impl TrafficCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn direction(&self, direction: Direction) -> &DirectionCounters {
        match direction {
            Direction::Inbound => &self.inbound,
            Direction::Outbound => &self.outbound,
        }
    }

    /// Take a slot in the active gauge unless it already holds `max`
    /// connections. Check and increment are one atomic step, so concurrent
    /// openers cannot overshoot the limit.
    pub fn try_connection_opened(&self, max: Option<u64>) -> bool {
        self.active
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |active| match max {
                Some(max) if active >= max => None,
                _ => Some(active + 1),
            })
            .is_ok()
    }

    /// Never takes the active gauge below zero.
    pub fn connection_closed(&self) {
        let _ = self
            .active
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |active| {
                active.checked_sub(1)
            });
    }

    pub fn active_connections(&self) -> u64 {
        self.active.get()
    }

    /// Each value is read on its own; values from different counters may
    /// come from slightly different instants.
    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            active_connections: self.active_connections(),
            inbound: self.inbound.snapshot(),
            outbound: self.outbound.snapshot(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DirectionSnapshot {
    pub frames: u64,
    pub payload_bytes: u64,
    pub raw_bytes: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CountersSnapshot {
    pub active_connections: u64,
    #[serde(rename = "in")]
    pub inbound: DirectionSnapshot,
    #[serde(rename = "out")]
    pub outbound: DirectionSnapshot,
}

/// Plain-text status report: active count, then the client triple, then the
/// upstream triple.
impl fmt::Display for CountersSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "WebSocket connections: {}", self.active_connections)?;
        writeln!(
            f,
            "client websocket frames  | client websocket payload | client tcp data"
        )?;
        writeln!(
            f,
            "{} {} {}",
            self.inbound.frames, self.inbound.payload_bytes, self.inbound.raw_bytes
        )?;
        writeln!(
            f,
            "upstream websocket frames  | upstream websocket payload | upstream tcp data"
        )?;
        writeln!(
            f,
            "{} {} {}",
            self.outbound.frames, self.outbound.payload_bytes, self.outbound.raw_bytes
        )
    }
}
