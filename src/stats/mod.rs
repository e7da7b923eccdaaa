mod counters;
mod tracker;

pub use counters::{CountersSnapshot, DirectionCounters, DirectionSnapshot, TrafficCounters};
pub use tracker::{ConnectionState, ConnectionTracker};
